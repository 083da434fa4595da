//! ANSI color helpers for terminal output

use chatvault_core::{Direction, Source};
use colored::Colorize;

/// Get colored direction indicator
pub fn colored_direction(direction: Direction) -> String {
    match direction {
        Direction::Sent => "sent".cyan().to_string(),
        Direction::Received => "received".green().to_string(),
        Direction::System => "system".yellow().to_string(),
    }
}

/// Get colored export kind
pub fn colored_source(source: Source) -> String {
    match source {
        Source::Transcript => "transcript".blue().to_string(),
        Source::Thread => "thread".magenta().to_string(),
        Source::Markup => "markup".yellow().to_string(),
    }
}

/// Get colored timestamp
pub fn colored_time(time: &str) -> String {
    time.white().dimmed().to_string()
}

/// Get colored sender name
pub fn colored_sender(name: &str) -> String {
    name.bold().to_string()
}

/// Get colored conversation name
pub fn colored_conversation(name: &str) -> String {
    name.cyan().bold().to_string()
}

/// Get colored score
pub fn colored_score(score: u32) -> String {
    format!("{:>4}", score).yellow().to_string()
}

/// Get colored header
pub fn header(text: &str) -> String {
    text.bold().underline().to_string()
}

/// Get colored label
pub fn label(text: &str) -> String {
    text.white().dimmed().to_string()
}

/// Get colored value
pub fn value(text: &str) -> String {
    text.white().to_string()
}

/// Get colored success message
pub fn success(text: &str) -> String {
    format!("{} {}", "✓".green(), text)
}

/// Get colored warning message
pub fn warning(text: &str) -> String {
    format!("{} {}", "⚠".yellow(), text)
}

/// Get colored error message
pub fn error(text: &str) -> String {
    format!("{} {}", "✗".red(), text)
}

/// Format size in human-readable form
pub fn format_size(bytes: u64) -> String {
    let bytes = bytes as f64;
    if bytes < 1024.0 {
        format!("{:.0} B", bytes)
    } else if bytes < 1024.0 * 1024.0 {
        format!("{:.1} KB", bytes / 1024.0)
    } else if bytes < 1024.0 * 1024.0 * 1024.0 {
        format!("{:.1} MB", bytes / (1024.0 * 1024.0))
    } else {
        format!("{:.1} GB", bytes / (1024.0 * 1024.0 * 1024.0))
    }
}

/// Format count with comma separators
pub fn format_count(n: i64) -> String {
    let s = n.unsigned_abs().to_string();
    let mut result = String::new();
    if n < 0 {
        result.push('-');
    }
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_count() {
        assert_eq!(format_count(0), "0");
        assert_eq!(format_count(999), "999");
        assert_eq!(format_count(1234567), "1,234,567");
        assert_eq!(format_count(-4500), "-4,500");
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 B");
        assert_eq!(format_size(2048), "2.0 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
    }
}
