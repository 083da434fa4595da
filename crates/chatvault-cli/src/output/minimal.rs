//! Minimal text output formatting

use chatvault_core::{ConversationSummary, Record};

/// Format a record as minimal text (content only)
pub fn format_record(record: &Record) -> String {
    record.content().to_string()
}

/// Format a summary as minimal text
pub fn format_summary(summary: &ConversationSummary) -> String {
    summary.id.clone()
}
