//! JSON output formatting

use chatvault_core::{ConversationSummary, CorpusEntry, Record, SearchHit};
use serde_json::Value;

/// A record as JSON, including its derived metrics
pub fn record_to_json(record: &Record) -> Value {
    serde_json::to_value(record).unwrap_or(Value::Null)
}

/// A summary as JSON (camelCase keys)
pub fn summary_to_json(summary: &ConversationSummary) -> Value {
    serde_json::to_value(summary).unwrap_or(Value::Null)
}

/// A search hit with the matched entry's fields
pub fn hit_to_json(hit: &SearchHit, entry: Option<&CorpusEntry>) -> Value {
    serde_json::json!({
        "index": hit.index,
        "subject": hit.subject,
        "origin": hit.origin,
        "score": hit.score,
        "fields": entry.map(|e| Value::Object(e.fields.clone())),
    })
}
