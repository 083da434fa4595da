//! Line classification for chat transcript exports
//!
//! A transcript is a stream of lines. Lines that match the header pattern
//! (`date, time - Sender: body`, optionally bracketed) open a new record; any
//! other line continues the open record. The state machine is a pure function
//! ([`step`]) so it can be tested without I/O; [`TranscriptClassifier`] wraps it
//! with a pending batch for the ingestion loop.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use std::sync::OnceLock;

use crate::types::{Direction, Record, Source};

/// Sender used for lines that appear before any header
pub const UNATTRIBUTED_SENDER: &str = "User";

fn header_regex() -> &'static Regex {
    static HEADER: OnceLock<Regex> = OnceLock::new();
    HEADER.get_or_init(|| {
        Regex::new(
            r"^\[?([0-9]{1,2}/[0-9]{1,2}/[0-9]{2,4},?\s[0-9]{1,2}:[0-9]{1,2}(?::[0-9]{1,2})?(?:\s(?i:[ap]m))?)\]?\s(?:-\s)?([^:]+):\s(.*)$",
        )
        .expect("header pattern is valid")
    })
}

/// Fields captured from a header line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Epoch millis, `None` when the date could not be parsed
    pub timestamp: Option<i64>,
    pub sender: String,
    pub body: String,
}

/// Match a line against the header pattern
pub fn parse_header(line: &str) -> Option<Header> {
    let caps = header_regex().captures(line)?;
    let raw_date = caps.get(1)?.as_str();
    let sender = caps.get(2)?.as_str().trim();
    let body = caps.get(3)?.as_str().trim();
    Some(Header {
        timestamp: parse_header_datetime(raw_date),
        sender: sender.to_string(),
        body: body.to_string(),
    })
}

/// Parse `d/m/y, h:m[:s] [AM|PM]`, trying month-first before day-first.
///
/// The export carries no zone, so the result is interpreted as UTC.
pub fn parse_header_datetime(raw: &str) -> Option<i64> {
    let cleaned = raw.replace(',', "");
    let mut parts = cleaned.split_whitespace();
    let date_part = parts.next()?;
    let time_part = parts.next()?;
    let meridiem = parts.next().map(|m| m.to_ascii_lowercase());

    let nums: Vec<u32> = date_part
        .split('/')
        .map(|p| p.parse::<u32>())
        .collect::<Result<_, _>>()
        .ok()?;
    if nums.len() != 3 {
        return None;
    }
    let year = if nums[2] < 100 {
        2000 + nums[2] as i32
    } else {
        nums[2] as i32
    };

    let date = NaiveDate::from_ymd_opt(year, nums[0], nums[1])
        .or_else(|| NaiveDate::from_ymd_opt(year, nums[1], nums[0]))?;

    let hms: Vec<u32> = time_part
        .split(':')
        .map(|p| p.parse::<u32>())
        .collect::<Result<_, _>>()
        .ok()?;
    let mut hour = *hms.first()?;
    let minute = *hms.get(1)?;
    let second = hms.get(2).copied().unwrap_or(0);
    match meridiem.as_deref() {
        Some("pm") if hour < 12 => hour += 12,
        Some("am") if hour == 12 => hour = 0,
        Some("am") | Some("pm") if hour > 12 => return None,
        _ => {}
    }
    let time = NaiveTime::from_hms_opt(hour, minute, second)?;

    Some(NaiveDateTime::new(date, time).and_utc().timestamp_millis())
}

/// Per-file context shared by every record the classifier produces
#[derive(Debug, Clone)]
pub struct TranscriptContext {
    pub conversation_id: String,
    pub title: String,
    /// Fallback timestamp for lines without a parseable date
    pub ingested_at: i64,
}

impl TranscriptContext {
    fn record(&self, timestamp: i64, sender: &str, direction: Direction, content: &str) -> Record {
        Record::new(
            Record::generate_id(),
            Source::Transcript,
            &self.conversation_id,
            &self.title,
            timestamp,
            sender,
            direction,
            content,
        )
    }
}

/// Parser state between lines
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ParserState {
    #[default]
    Idle,
    /// A header has been seen; continuation lines are appended here
    Accumulating(Record),
}

/// Advance the state machine by one line, returning the next state and the
/// record completed by this line, if any.
///
/// Whitespace-only lines are ignored in every state.
pub fn step(state: ParserState, line: &str, ctx: &TranscriptContext) -> (ParserState, Option<Record>) {
    if line.trim().is_empty() {
        return (state, None);
    }

    if let Some(header) = parse_header(line) {
        let open = ctx.record(
            header.timestamp.unwrap_or(ctx.ingested_at),
            &header.sender,
            Direction::Received,
            &header.body,
        );
        let flushed = match state {
            ParserState::Accumulating(prev) => Some(prev),
            ParserState::Idle => None,
        };
        return (ParserState::Accumulating(open), flushed);
    }

    match state {
        ParserState::Accumulating(mut open) => {
            open.append_line(line);
            (ParserState::Accumulating(open), None)
        }
        ParserState::Idle => {
            let standalone = ctx.record(
                ctx.ingested_at,
                UNATTRIBUTED_SENDER,
                Direction::Received,
                line.trim(),
            );
            (ParserState::Idle, Some(standalone))
        }
    }
}

/// End of stream: flush the open record, if any
pub fn finish(state: ParserState) -> Option<Record> {
    match state {
        ParserState::Accumulating(open) => Some(open),
        ParserState::Idle => None,
    }
}

/// Drives [`step`] over a line stream and collects completed records
#[derive(Debug)]
pub struct TranscriptClassifier {
    ctx: TranscriptContext,
    state: ParserState,
    pending: Vec<Record>,
}

impl TranscriptClassifier {
    pub fn new(ctx: TranscriptContext) -> Self {
        Self {
            ctx,
            state: ParserState::Idle,
            pending: Vec::new(),
        }
    }

    pub fn feed(&mut self, line: &str) {
        let state = std::mem::take(&mut self.state);
        let (next, flushed) = step(state, line, &self.ctx);
        self.state = next;
        self.pending.extend(flushed);
    }

    /// Records completed so far, leaving the open record in place
    pub fn take_batch(&mut self) -> Vec<Record> {
        std::mem::take(&mut self.pending)
    }

    /// Number of completed records waiting to be taken
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Flush the open record and return everything not yet taken
    pub fn finish(mut self) -> Vec<Record> {
        let state = std::mem::take(&mut self.state);
        self.pending.extend(finish(state));
        self.pending
    }
}

/// Classify a complete transcript in one pass
pub fn classify_lines<'a, I>(lines: I, ctx: TranscriptContext) -> Vec<Record>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut classifier = TranscriptClassifier::new(ctx);
    for line in lines {
        classifier.feed(line);
    }
    classifier.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx() -> TranscriptContext {
        TranscriptContext {
            conversation_id: "c1".to_string(),
            title: "chat.txt".to_string(),
            ingested_at: 42,
        }
    }

    #[test]
    fn test_parse_dashed_header() {
        let h = parse_header("01/01/2024, 10:00 - Alice: Hello").unwrap();
        assert_eq!(h.sender, "Alice");
        assert_eq!(h.body, "Hello");
        assert_eq!(h.timestamp, Some(1_704_103_200_000));
    }

    #[test]
    fn test_parse_bracketed_header_with_meridiem() {
        let h = parse_header("[15/02/2024, 10:14:15 PM] Sara: See you!").unwrap();
        assert_eq!(h.sender, "Sara");
        assert_eq!(h.body, "See you!");
        // day-first fallback: 15 cannot be a month
        let expected = NaiveDate::from_ymd_opt(2024, 2, 15)
            .unwrap()
            .and_hms_opt(22, 14, 15)
            .unwrap()
            .and_utc()
            .timestamp_millis();
        assert_eq!(h.timestamp, Some(expected));
    }

    #[test]
    fn test_unparseable_date_still_matches_header() {
        let h = parse_header("99/99/2024, 10:00 - Bob: hi").unwrap();
        assert_eq!(h.timestamp, None);
        let (state, flushed) = step(ParserState::Idle, "99/99/2024, 10:00 - Bob: hi", &ctx());
        assert!(flushed.is_none());
        match state {
            ParserState::Accumulating(r) => assert_eq!(r.timestamp, 42),
            ParserState::Idle => panic!("expected open record"),
        }
    }

    #[test]
    fn test_non_header_lines() {
        assert!(parse_header("just some text").is_none());
        assert!(parse_header("01/01/2024 no time: here").is_none());
    }

    #[test]
    fn test_two_records_with_continuation() {
        let input = "01/01/2024, 10:00 - Alice: Hello\n01/01/2024, 10:01 - Bob: Hi Alice\nHow are you?";
        let records = classify_lines(input.lines(), ctx());
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].sender, "Alice");
        assert_eq!(records[0].content(), "Hello");
        assert_eq!(records[1].sender, "Bob");
        assert_eq!(records[1].content(), "Hi Alice\nHow are you?");
        assert!(records[1].meta().has_question);
        assert_eq!(records[1].meta().word_count, 5);
    }

    #[test]
    fn test_idle_line_becomes_unattributed_record() {
        let (state, flushed) = step(ParserState::Idle, "  preamble text  ", &ctx());
        assert_eq!(state, ParserState::Idle);
        let record = flushed.unwrap();
        assert_eq!(record.sender, UNATTRIBUTED_SENDER);
        assert_eq!(record.direction, Direction::Received);
        assert_eq!(record.content(), "preamble text");
        assert_eq!(record.timestamp, 42);
    }

    #[test]
    fn test_header_flushes_open_record() {
        let c = ctx();
        let (state, _) = step(ParserState::Idle, "01/01/2024, 10:00 - Alice: one", &c);
        let (state, _) = step(state, "two", &c);
        let (_, flushed) = step(state, "01/01/2024, 10:05 - Bob: three", &c);
        let flushed = flushed.unwrap();
        assert_eq!(flushed.content(), "one\ntwo");
        assert_eq!(*flushed.meta(), crate::types::analyze("one\ntwo"));
    }

    #[test]
    fn test_blank_lines_ignored() {
        let input = "01/01/2024, 10:00 - Alice: one\n\n   \ntwo\n";
        let records = classify_lines(input.lines(), ctx());
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].content(), "one\ntwo");
    }

    #[test]
    fn test_classifier_batches_leave_open_record() {
        let mut classifier = TranscriptClassifier::new(ctx());
        classifier.feed("01/01/2024, 10:00 - Alice: one");
        classifier.feed("01/01/2024, 10:01 - Bob: two");
        assert_eq!(classifier.pending_len(), 1);
        let batch = classifier.take_batch();
        assert_eq!(batch[0].sender, "Alice");
        let rest = classifier.finish();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].sender, "Bob");
    }
}
