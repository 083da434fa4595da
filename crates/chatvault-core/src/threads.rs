//! Parsers for structured JSON thread exports
//!
//! Three document shapes are recognized by structure alone: messenger-style
//! threads (`messages[].sender_name`), assistant conversation dumps (`mapping`
//! of message nodes) and generic arrays of message-like objects. Anything else
//! parses to zero records.

use serde_json::{Map, Value};

use crate::types::{Direction, Record, Source};

/// Per-file context for thread parsing
#[derive(Debug, Clone)]
pub struct ThreadContext {
    pub file_name: String,
    /// Fallback timestamp for entries without one
    pub ingested_at: i64,
}

impl ThreadContext {
    fn default_conversation_id(&self) -> String {
        format!("thread_{}", self.file_name)
    }
}

/// The shape a JSON document was recognized as
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadShape {
    Messenger,
    AssistantDump,
    Generic,
    Unrecognized,
}

/// Parse a complete JSON document into records
pub fn parse_thread_json(text: &str, ctx: &ThreadContext) -> serde_json::Result<Vec<Record>> {
    let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);
    let value: Value = serde_json::from_str(text)?;
    Ok(parse_thread_value(&value, ctx))
}

/// Classify a parsed JSON document by shape
pub fn thread_shape(value: &Value) -> ThreadShape {
    match value {
        Value::Object(obj) if obj.get("messages").is_some_and(Value::is_array) => {
            ThreadShape::Messenger
        }
        Value::Object(obj) if obj.contains_key("mapping") => ThreadShape::AssistantDump,
        Value::Array(items) => {
            let first = items.iter().find_map(Value::as_object);
            match first {
                Some(obj) if obj.contains_key("mapping") => ThreadShape::AssistantDump,
                Some(obj) if message_text(obj).is_some() => ThreadShape::Generic,
                _ => ThreadShape::Unrecognized,
            }
        }
        _ => ThreadShape::Unrecognized,
    }
}

/// Convert an already-parsed document into records
pub fn parse_thread_value(value: &Value, ctx: &ThreadContext) -> Vec<Record> {
    match thread_shape(value) {
        ThreadShape::Messenger => value
            .as_object()
            .map(|obj| parse_messenger(obj, ctx))
            .unwrap_or_default(),
        ThreadShape::AssistantDump => match value {
            Value::Array(items) => items
                .iter()
                .filter_map(Value::as_object)
                .enumerate()
                .flat_map(|(i, conv)| parse_assistant_conversation(conv, i, ctx))
                .collect(),
            Value::Object(conv) => parse_assistant_conversation(conv, 0, ctx),
            _ => Vec::new(),
        },
        ThreadShape::Generic => value
            .as_array()
            .map(|items| parse_generic(items, ctx))
            .unwrap_or_default(),
        ThreadShape::Unrecognized => Vec::new(),
    }
}

/// Repair text whose UTF-8 bytes were stored one code point per byte
///
/// Applied only when every char fits in a byte and those bytes form valid
/// UTF-8; otherwise the input is returned unchanged.
pub fn fix_mojibake(text: &str) -> String {
    if text.is_ascii() || text.chars().any(|c| (c as u32) > 0xFF) {
        return text.to_string();
    }
    let bytes: Vec<u8> = text.chars().map(|c| c as u32 as u8).collect();
    String::from_utf8(bytes).unwrap_or_else(|_| text.to_string())
}

fn str_field<'a>(obj: &'a Map<String, Value>, key: &str) -> Option<&'a str> {
    obj.get(key).and_then(Value::as_str)
}

fn parse_messenger(obj: &Map<String, Value>, ctx: &ThreadContext) -> Vec<Record> {
    let conversation_id = str_field(obj, "thread_path")
        .map(str::to_string)
        .unwrap_or_else(|| ctx.default_conversation_id());
    let title = str_field(obj, "title")
        .map(fix_mojibake)
        .unwrap_or_else(|| ctx.file_name.clone());

    let mut records: Vec<Record> = obj
        .get("messages")
        .and_then(Value::as_array)
        .map(|messages| {
            messages
                .iter()
                .filter_map(Value::as_object)
                .filter_map(|m| {
                    let content = str_field(m, "content")?;
                    let sender = str_field(m, "sender_name").map(fix_mojibake).unwrap_or_default();
                    let timestamp = m
                        .get("timestamp_ms")
                        .and_then(Value::as_i64)
                        .unwrap_or(ctx.ingested_at);
                    Some(Record::new(
                        Record::generate_id(),
                        Source::Thread,
                        &conversation_id,
                        &title,
                        timestamp,
                        sender,
                        Direction::Received,
                        fix_mojibake(content),
                    ))
                })
                .collect()
        })
        .unwrap_or_default();

    // Messenger exports list newest first
    records.sort_by_key(|r| r.timestamp);
    records
}

fn role_direction(role: &str) -> Direction {
    match role {
        "assistant" => Direction::Received,
        "user" => Direction::Sent,
        _ => Direction::System,
    }
}

fn parse_assistant_conversation(
    conv: &Map<String, Value>,
    index: usize,
    ctx: &ThreadContext,
) -> Vec<Record> {
    let conversation_id = str_field(conv, "id")
        .or_else(|| str_field(conv, "conversation_id"))
        .map(str::to_string)
        .unwrap_or_else(|| format!("{}_{}", ctx.default_conversation_id(), index));
    let title = str_field(conv, "title")
        .filter(|t| !t.trim().is_empty())
        .unwrap_or(ctx.file_name.as_str())
        .to_string();

    let Some(mapping) = conv.get("mapping").and_then(Value::as_object) else {
        return Vec::new();
    };

    let mut records: Vec<Record> = mapping
        .values()
        .filter_map(|node| node.get("message")?.as_object())
        .filter_map(|message| {
            let role = message
                .get("author")
                .and_then(|a| a.get("role"))
                .and_then(Value::as_str)
                .unwrap_or("system");
            let parts: Vec<&str> = message
                .get("content")
                .and_then(|c| c.get("parts"))
                .and_then(Value::as_array)
                .map(|parts| parts.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();
            let content = parts.join("\n");
            if content.trim().is_empty() {
                return None;
            }
            let timestamp = message
                .get("create_time")
                .and_then(Value::as_f64)
                .map(|secs| (secs * 1000.0).round() as i64)
                .unwrap_or(ctx.ingested_at);
            let id = str_field(message, "id")
                .map(str::to_string)
                .unwrap_or_else(Record::generate_id);
            Some(Record::new(
                id,
                Source::Thread,
                &conversation_id,
                &title,
                timestamp,
                role,
                role_direction(role),
                content,
            ))
        })
        .collect();

    records.sort_by_key(|r| r.timestamp);
    records
}

fn message_text(obj: &Map<String, Value>) -> Option<&str> {
    ["text", "message", "content"]
        .iter()
        .find_map(|key| str_field(obj, key))
}

fn parse_timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => chrono::DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.timestamp_millis())
            .or_else(|| s.parse::<i64>().ok()),
        _ => None,
    }
}

fn parse_generic(items: &[Value], ctx: &ThreadContext) -> Vec<Record> {
    items
        .iter()
        .filter_map(Value::as_object)
        .filter_map(|obj| {
            let content = message_text(obj)?;
            let sender = str_field(obj, "sender").unwrap_or("Unknown");
            let direction = str_field(obj, "direction")
                .and_then(Direction::parse)
                .unwrap_or_else(|| {
                    if sender.to_lowercase().contains("assistant") {
                        Direction::Received
                    } else {
                        Direction::Sent
                    }
                });
            let conversation_id = str_field(obj, "conversation_id")
                .map(str::to_string)
                .unwrap_or_else(|| ctx.default_conversation_id());
            let title = str_field(obj, "title").unwrap_or(ctx.file_name.as_str());
            let id = match obj.get("id") {
                Some(Value::String(s)) => s.clone(),
                Some(Value::Number(n)) => n.to_string(),
                _ => Record::generate_id(),
            };
            let timestamp = obj
                .get("timestamp")
                .and_then(parse_timestamp)
                .unwrap_or(ctx.ingested_at);
            Some(Record::new(
                id,
                Source::Thread,
                conversation_id,
                title,
                timestamp,
                sender,
                direction,
                content,
            ))
        })
        .collect()
}
