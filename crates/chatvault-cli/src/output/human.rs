//! Human-readable output formatting

use super::colors::*;
use chatvault_core::{ConversationSummary, CorpusEntry, CorpusStats, Record, SearchHit};

/// Format a record for human-readable output
pub fn format_record(record: &Record, show_content: bool) -> String {
    let header = format!(
        "{} {} [{}]",
        colored_time(&record.format_timestamp()),
        colored_sender(&record.sender),
        colored_direction(record.direction)
    );

    if show_content {
        let indent = "  ";
        let formatted_content = record
            .content()
            .lines()
            .map(|l| format!("{}{}", indent, l))
            .collect::<Vec<_>>()
            .join("\n");
        format!("{}\n{}", header, formatted_content)
    } else {
        format!("{} {}", header, record.preview(60))
    }
}

fn format_millis(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Format a summary for list output
pub fn format_summary(summary: &ConversationSummary) -> String {
    format!(
        "{} {} messages  {}  {}",
        colored_conversation(&summary.title),
        format_count(summary.message_count),
        colored_source(summary.source),
        colored_time(&format_millis(summary.last_message_timestamp))
    )
}

/// Format summary detail view
pub fn format_summary_info(summary: &ConversationSummary) -> String {
    let mut lines = Vec::new();

    lines.push(format!("{}: {}", label("Conversation"), value(&summary.id)));
    lines.push(format!(
        "{}: {}",
        label("Title"),
        colored_conversation(&summary.title)
    ));
    lines.push(format!("{}: {}", label("Kind"), colored_source(summary.source)));
    lines.push(format!(
        "{}: {}",
        label("Messages"),
        value(&format_count(summary.message_count))
    ));
    lines.push(format!(
        "{}: {}",
        label("Last message"),
        value(&format_millis(summary.last_message_timestamp))
    ));
    if !summary.participants.is_empty() {
        lines.push(format!(
            "{}: {}",
            label("Participants"),
            value(&summary.participants.join(", "))
        ));
    }

    lines.join("\n")
}

/// Format a ranked search hit with a content preview
pub fn format_hit(hit: &SearchHit, entry: Option<&CorpusEntry>) -> String {
    let preview = entry
        .and_then(|e| {
            ["content", "message", "text", "definition", "background"]
                .iter()
                .find_map(|key| e.fields.get(*key).and_then(|v| v.as_str()))
        })
        .map(|text| {
            let first = text.lines().next().unwrap_or("").trim();
            let truncated: String = first.chars().take(70).collect();
            if truncated.len() < first.len() {
                format!("{}...", truncated)
            } else {
                truncated
            }
        })
        .unwrap_or_default();

    format!(
        "{} {} {} {}",
        colored_score(hit.score),
        colored_sender(&hit.subject),
        label(&format!("({})", hit.origin)),
        preview
    )
}

/// Format corpus statistics
pub fn format_stats(stats: &CorpusStats) -> String {
    let mut lines = Vec::new();

    lines.push(format!(
        "  {}: {}",
        label("Messages"),
        value(&format_count(stats.total_messages as i64))
    ));
    lines.push(format!(
        "  {}: {}",
        label("Words"),
        value(&format_count(stats.total_words as i64))
    ));
    lines.push(format!(
        "  {}: {}",
        label("Questions"),
        value(&format_count(stats.questions as i64))
    ));
    lines.push(format!(
        "  {}: {}",
        label("Exclamations"),
        value(&format_count(stats.exclamations as i64))
    ));

    if !stats.per_sender.is_empty() {
        lines.push(String::new());
        lines.push(header("Senders"));
        for c in &stats.per_sender {
            lines.push(format!("  {:>8}  {}", format_count(c.count as i64), colored_sender(&c.label)));
        }
    }

    if !stats.top_words.is_empty() {
        lines.push(String::new());
        lines.push(header("Top words"));
        for c in &stats.top_words {
            lines.push(format!("  {:>8}  {}", format_count(c.count as i64), c.label));
        }
    }

    if let (Some(first), Some(last)) = (stats.per_day.first(), stats.per_day.last()) {
        let busiest = stats.per_day.iter().max_by_key(|c| c.count);
        lines.push(String::new());
        lines.push(format!(
            "  {}: {} to {}",
            label("Active"),
            value(&first.label),
            value(&last.label)
        ));
        if let Some(day) = busiest {
            lines.push(format!(
                "  {}: {} ({})",
                label("Busiest day"),
                value(&day.label),
                format_count(day.count as i64)
            ));
        }
    }

    lines.join("\n")
}
