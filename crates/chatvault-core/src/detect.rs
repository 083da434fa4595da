//! Export format detection

use std::path::Path;

use crate::types::Source;

/// Decide which kind of export a resource is, from its name and first bytes
///
/// The extension wins when it is one of the known ones; otherwise the first
/// non-whitespace character of `head` is sniffed.
pub fn detect_source(file_name: &str, head: &[u8]) -> Source {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("html") | Some("htm") => return Source::Markup,
        Some("json") => return Source::Thread,
        Some("txt") => return Source::Transcript,
        _ => {}
    }

    let text = String::from_utf8_lossy(head);
    match text.trim_start_matches('\u{FEFF}').trim_start().chars().next() {
        Some('{') | Some('[') => Source::Thread,
        Some('<') => Source::Markup,
        _ => Source::Transcript,
    }
}

/// Whether a file name carries one of the importable extensions
pub fn is_export_file(file_name: &str) -> bool {
    Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "txt" | "json" | "html" | "htm"))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_wins() {
        assert_eq!(detect_source("chat.HTML", b"hello"), Source::Markup);
        assert_eq!(detect_source("a.json", b"01/01/2024"), Source::Thread);
        assert_eq!(detect_source("a.txt", b"<html>"), Source::Transcript);
    }

    #[test]
    fn test_sniff_without_extension() {
        assert_eq!(detect_source("export", b"  \n{\"messages\":[]}"), Source::Thread);
        assert_eq!(detect_source("export.dat", b"[1]"), Source::Thread);
        assert_eq!(detect_source("export", b"\xEF\xBB\xBF<!DOCTYPE html>"), Source::Markup);
        assert_eq!(detect_source("export", b"01/01/2024, 10:00 - A: b"), Source::Transcript);
        assert_eq!(detect_source("export", b""), Source::Transcript);
    }

    #[test]
    fn test_is_export_file() {
        assert!(is_export_file("a.txt"));
        assert!(is_export_file("b.HTM"));
        assert!(!is_export_file("c.png"));
        assert!(!is_export_file("noext"));
    }
}
