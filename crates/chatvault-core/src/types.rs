//! Core type definitions for normalized chat records

use serde::{Deserialize, Serialize};

/// Which kind of export a record was ingested from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Source {
    /// Line-oriented chat transcript (`date, time - Sender: body`)
    Transcript,
    /// Structured JSON thread export
    Thread,
    /// Marked-up conversation archive (HTML)
    Markup,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Transcript => "transcript",
            Source::Thread => "thread",
            Source::Markup => "markup",
        }
    }

    pub fn parse(s: &str) -> Option<Source> {
        match s {
            "transcript" => Some(Source::Transcript),
            "thread" => Some(Source::Thread),
            "markup" => Some(Source::Markup),
            _ => None,
        }
    }
}

impl std::fmt::Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Message direction relative to the export owner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Sent,
    Received,
    System,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Sent => "sent",
            Direction::Received => "received",
            Direction::System => "system",
        }
    }

    pub fn parse(s: &str) -> Option<Direction> {
        match s {
            "sent" => Some(Direction::Sent),
            "received" => Some(Direction::Received),
            "system" => Some(Direction::System),
            _ => None,
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Metrics derived from a record's content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MessageMeta {
    pub message_length: usize,
    pub word_count: usize,
    pub has_question: bool,
    pub has_exclamation: bool,
}

const QUESTION_MARKS: &[char] = &['?', '؟', '？', '\u{037E}'];
const EXCLAMATION_MARKS: &[char] = &['!', '！'];

/// Compute the derived metrics for a piece of content
pub fn analyze(content: &str) -> MessageMeta {
    MessageMeta {
        message_length: content.chars().count(),
        word_count: content.split_whitespace().count(),
        has_question: content.contains(QUESTION_MARKS),
        has_exclamation: content.contains(EXCLAMATION_MARKS),
    }
}

/// A single normalized message
///
/// `meta` is private so it can only ever be the result of [`analyze`] on the
/// current content. Deserializing recomputes it as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RecordRepr")]
pub struct Record {
    pub id: String,
    pub source: Source,
    pub conversation_id: String,
    /// Human label of the owning conversation
    pub title: String,
    /// Epoch milliseconds
    pub timestamp: i64,
    pub sender: String,
    pub direction: Direction,
    content: String,
    meta: MessageMeta,
}

#[derive(Deserialize)]
struct RecordRepr {
    id: String,
    source: Source,
    conversation_id: String,
    title: String,
    timestamp: i64,
    sender: String,
    direction: Direction,
    content: String,
}

impl From<RecordRepr> for Record {
    fn from(r: RecordRepr) -> Self {
        Record::new(
            r.id,
            r.source,
            r.conversation_id,
            r.title,
            r.timestamp,
            r.sender,
            r.direction,
            r.content,
        )
    }
}

impl Record {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: impl Into<String>,
        source: Source,
        conversation_id: impl Into<String>,
        title: impl Into<String>,
        timestamp: i64,
        sender: impl Into<String>,
        direction: Direction,
        content: impl Into<String>,
    ) -> Self {
        let content = content.into();
        let meta = analyze(&content);
        Self {
            id: id.into(),
            source,
            conversation_id: conversation_id.into(),
            title: title.into(),
            timestamp,
            sender: sender.into(),
            direction,
            content,
            meta,
        }
    }

    /// Fresh random identifier for sources without stable ids
    pub fn generate_id() -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn meta(&self) -> &MessageMeta {
        &self.meta
    }

    /// Append a continuation line, separated by a newline
    ///
    /// Every metric is additive across a newline, so only `line` is analyzed.
    pub fn append_line(&mut self, line: &str) {
        let added = analyze(line);
        self.content.push('\n');
        self.content.push_str(line);
        self.meta.message_length += 1 + added.message_length;
        self.meta.word_count += added.word_count;
        self.meta.has_question |= added.has_question;
        self.meta.has_exclamation |= added.has_exclamation;
    }

    /// Get preview text for list display
    pub fn preview(&self, max_len: usize) -> String {
        let first = self.content.lines().next().unwrap_or("").trim();
        truncate_str(first, max_len)
    }

    /// Timestamp as `YYYY-MM-DD HH:MM:SS` (UTC)
    pub fn format_timestamp(&self) -> String {
        chrono::DateTime::from_timestamp_millis(self.timestamp)
            .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| self.timestamp.to_string())
    }
}

/// Aggregate statistics for one conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    /// Same as the records' `conversation_id`
    pub id: String,
    pub title: String,
    pub source: Source,
    pub message_count: i64,
    pub last_message_timestamp: i64,
    /// Distinct senders, sorted
    pub participants: Vec<String>,
}

pub(crate) fn truncate_str(s: &str, max_len: usize) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() > max_len {
        let truncated: String = chars[..max_len.saturating_sub(3)].iter().collect();
        format!("{}...", truncated)
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_analyze_counts_chars_not_bytes() {
        let meta = analyze("مرحبا بك");
        assert_eq!(meta.message_length, 8);
        assert_eq!(meta.word_count, 2);
    }

    #[test]
    fn test_analyze_question_marks_across_scripts() {
        assert!(analyze("how are you?").has_question);
        assert!(analyze("كيف حالك؟").has_question);
        assert!(analyze("元気？").has_question);
        assert!(!analyze("fine.").has_question);
        assert!(analyze("wow!").has_exclamation);
    }

    #[test]
    fn test_analyze_empty() {
        let meta = analyze("");
        assert_eq!(meta, MessageMeta::default());
    }

    #[test]
    fn test_append_line_recomputes_meta() {
        let mut record = Record::new(
            "r1",
            Source::Transcript,
            "c1",
            "chat.txt",
            0,
            "Bob",
            Direction::Received,
            "Hi Alice",
        );
        record.append_line("How are you?");
        assert_eq!(record.content(), "Hi Alice\nHow are you?");
        assert_eq!(*record.meta(), analyze("Hi Alice\nHow are you?"));
        assert!(record.meta().has_question);
    }

    #[test]
    fn test_record_serializes_meta() {
        let record = Record::new(
            "r1",
            Source::Thread,
            "c1",
            "Thread",
            1,
            "Ann",
            Direction::Sent,
            "hello there",
        );
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["source"], "thread");
        assert_eq!(value["meta"]["word_count"], 2);
        assert_eq!(value["content"], "hello there");
    }

    #[test]
    fn test_deserialize_ignores_supplied_meta() {
        let raw = r#"{"id":"x","source":"markup","conversation_id":"c","title":"t",
            "timestamp":5,"sender":"s","direction":"system","content":"a b c?",
            "meta":{"message_length":999,"word_count":0,"has_question":false,"has_exclamation":true}}"#;
        let record: Record = serde_json::from_str(raw).unwrap();
        assert_eq!(*record.meta(), analyze("a b c?"));
    }

    #[test]
    fn test_preview_truncates() {
        let record = Record::new(
            "r1",
            Source::Transcript,
            "c1",
            "t",
            0,
            "A",
            Direction::Received,
            "abcdefghij\nsecond",
        );
        assert_eq!(record.preview(6), "abc...");
        assert_eq!(record.preview(20), "abcdefghij");
    }
}
