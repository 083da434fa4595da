//! In-memory relevance search over heterogeneous entries
//!
//! Entries are untyped field maps: persisted records, reference profiles,
//! glossary items. Every string field containing the query scores a
//! field-specific weight, an exact match adds a bonus, and every matching
//! string element of an array field adds a small fixed amount.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::types::Record;

/// Bonus for a field equal to the query
pub const EXACT_MATCH_BONUS: u32 = 10;
/// Score per matching string element of an array field
pub const ARRAY_ELEMENT_WEIGHT: u32 = 2;
/// Weight for string fields without a specific weight
pub const DEFAULT_FIELD_WEIGHT: u32 = 1;

/// Weight of a string field by name
pub fn field_weight(field: &str) -> u32 {
    match field {
        "name" => 10,
        "title" => 8,
        "content" | "message" => 7,
        "text" => 6,
        "definition" => 5,
        "background" => 4,
        _ => DEFAULT_FIELD_WEIGHT,
    }
}

/// One searchable entry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorpusEntry {
    /// Where the entry came from (file name, or `records` for the store)
    pub origin: String,
    pub fields: Map<String, Value>,
}

impl CorpusEntry {
    pub fn new(origin: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            origin: origin.into(),
            fields,
        }
    }

    /// Build an entry from a record's searchable text
    ///
    /// Only the message, its sender and the conversation title are exposed;
    /// ids and enum fields never score.
    pub fn from_record(record: &Record) -> Self {
        let mut fields = Map::new();
        fields.insert("title".into(), Value::String(record.title.clone()));
        fields.insert("sender".into(), Value::String(record.sender.clone()));
        fields.insert("content".into(), Value::String(record.content().to_string()));
        Self::new(RECORDS_ORIGIN, fields)
    }

    /// Display name: the first non-empty `name`, `title` or `sender`
    pub fn subject(&self) -> String {
        ["name", "title", "sender"]
            .iter()
            .filter_map(|key| self.fields.get(*key).and_then(Value::as_str))
            .find(|s| !s.is_empty())
            .unwrap_or("unknown")
            .to_string()
    }
}

/// Origin label for entries built from stored records
pub const RECORDS_ORIGIN: &str = "records";

/// An ordered snapshot of entries to search
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    entries: Vec<CorpusEntry>,
}

impl Corpus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: CorpusEntry) {
        self.entries.push(entry);
    }

    pub fn extend_entries(&mut self, entries: impl IntoIterator<Item = CorpusEntry>) {
        self.entries.extend(entries);
    }

    pub fn extend_records<'a>(&mut self, records: impl IntoIterator<Item = &'a Record>) {
        self.entries
            .extend(records.into_iter().map(CorpusEntry::from_record));
    }

    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&CorpusEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn search(&self, query: &str) -> Vec<SearchHit> {
        search(query, &self.entries)
    }
}

/// A scored match
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    /// Position of the entry in the searched corpus
    pub index: usize,
    pub subject: String,
    pub origin: String,
    pub score: u32,
}

/// Score one entry's fields against an already-normalized query
pub fn score_fields(fields: &Map<String, Value>, needle: &str) -> u32 {
    let mut score = 0;
    for (key, value) in fields {
        match value {
            Value::String(s) => {
                let lowered = s.to_lowercase();
                if lowered.contains(needle) {
                    score += field_weight(key);
                    if lowered == needle {
                        score += EXACT_MATCH_BONUS;
                    }
                }
            }
            Value::Array(items) => {
                score += items
                    .iter()
                    .filter_map(Value::as_str)
                    .filter(|item| item.to_lowercase().contains(needle))
                    .count() as u32
                    * ARRAY_ELEMENT_WEIGHT;
            }
            _ => {}
        }
    }
    score
}

/// Rank `entries` against `query`
///
/// Returns hits with a positive score, highest first; equal scores keep corpus
/// order. A blank query returns nothing without scanning.
pub fn search(query: &str, entries: &[CorpusEntry]) -> Vec<SearchHit> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return Vec::new();
    }

    let mut hits: Vec<SearchHit> = entries
        .iter()
        .enumerate()
        .filter_map(|(index, entry)| {
            let score = score_fields(&entry.fields, &needle);
            (score > 0).then(|| SearchHit {
                index,
                subject: entry.subject(),
                origin: entry.origin.clone(),
                score,
            })
        })
        .collect();

    // sort_by is stable, ties stay in corpus order
    hits.sort_by(|a, b| b.score.cmp(&a.score));
    hits
}
