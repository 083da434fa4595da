//! Search corpus assembly from reference datasets and the store

use std::fs;
use std::path::Path;

use chatvault_core::{Corpus, CorpusEntry};
use chatvault_db::VaultDb;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::discovery::discover_exports;
use crate::html::{body_text, parse_markup};
use crate::ingest::IngestError;

const MAX_TEXT_LINES: usize = 1000;
const MIN_LINE_CHARS: usize = 5;
const MAX_MARKUP_CHARS: usize = 2000;

const TEXT_SENDER: &str = "Archive";
const MARKUP_SENDER: &str = "System/Archive";

/// Load every reference dataset under `dir`
///
/// Unreadable or malformed files are skipped with a warning. A missing
/// directory yields no entries.
pub fn load_reference_dir(dir: &Path) -> Vec<CorpusEntry> {
    let mut entries = Vec::new();
    for path in discover_exports(dir) {
        match load_reference_file(&path) {
            Ok(found) => {
                debug!(path = %path.display(), entries = found.len(), "loaded reference file");
                entries.extend(found);
            }
            Err(e) => warn!(path = %path.display(), error = %e, "skipping reference file"),
        }
    }
    entries
}

/// Load one reference file, dispatching on its extension
pub fn load_reference_file(path: &Path) -> Result<Vec<CorpusEntry>, IngestError> {
    let origin = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let bytes = fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);

    let entries = match ext.as_str() {
        "json" => json_entries(&origin, &text)?,
        "html" | "htm" => markup_entry(&origin, &text).into_iter().collect(),
        _ => text_entries(&origin, &text),
    };
    Ok(entries)
}

fn json_entries(origin: &str, text: &str) -> Result<Vec<CorpusEntry>, IngestError> {
    let value: Value = serde_json::from_str(text.trim_start_matches('\u{FEFF}'))?;
    let entries = match value {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(fields) => Some(CorpusEntry::new(origin, fields)),
                _ => None,
            })
            .collect(),
        Value::Object(fields) => vec![CorpusEntry::new(origin, fields)],
        _ => Vec::new(),
    };
    Ok(entries)
}

fn text_entries(origin: &str, text: &str) -> Vec<CorpusEntry> {
    text.lines()
        .take(MAX_TEXT_LINES)
        .map(str::trim)
        .filter(|line| line.chars().count() > MIN_LINE_CHARS)
        .map(|line| CorpusEntry::new(origin, entry_fields(line, TEXT_SENDER)))
        .collect()
}

fn markup_entry(origin: &str, html: &str) -> Option<CorpusEntry> {
    let text: String = body_text(&parse_markup(html))
        .chars()
        .take(MAX_MARKUP_CHARS)
        .collect();
    if text.trim().is_empty() {
        return None;
    }
    Some(CorpusEntry::new(origin, entry_fields(&text, MARKUP_SENDER)))
}

fn entry_fields(content: &str, sender: &str) -> Map<String, Value> {
    let mut fields = Map::new();
    fields.insert("content".to_string(), Value::String(content.to_string()));
    fields.insert("sender".to_string(), Value::String(sender.to_string()));
    fields
}

/// Snapshot the reference datasets plus every stored record
pub fn build_corpus(db: &VaultDb, reference_dir: Option<&Path>) -> Result<Corpus, IngestError> {
    let mut corpus = Corpus::new();
    if let Some(dir) = reference_dir {
        corpus.extend_entries(load_reference_dir(dir));
    }
    let records = db.all_records()?;
    corpus.extend_records(&records);
    Ok(corpus)
}
