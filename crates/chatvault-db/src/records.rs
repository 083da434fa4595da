//! Record writes and queries

use std::collections::{BTreeMap, BTreeSet};

use chatvault_core::{Direction, Record, RecordFilter, Source};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::debug;

use crate::connection::{DbError, VaultDb};
use crate::summaries::{merge_summary, recompute_summary, SummaryDelta};

/// Default cap for [`VaultDb::scan_records`]
pub const DEFAULT_SCAN_LIMIT: usize = 250;

/// What one batch write did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Records whose id was new
    pub inserted: usize,
    /// Records that overwrote an existing id
    pub replaced: usize,
    /// Distinct conversations touched
    pub conversations: usize,
}

const RECORD_COLUMNS: &str =
    "id, source, conversation_id, title, timestamp, sender, direction, content";

pub(crate) fn parse_enum<T>(
    idx: usize,
    value: String,
    parse: fn(&str) -> Option<T>,
) -> rusqlite::Result<T> {
    parse(&value).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unknown value '{}'", value).into(),
        )
    })
}

/// Map a row selected with [`RECORD_COLUMNS`]; `meta` is recomputed
fn row_to_record(row: &Row) -> rusqlite::Result<Record> {
    Ok(Record::new(
        row.get::<_, String>(0)?,
        parse_enum(1, row.get(1)?, Source::parse)?,
        row.get::<_, String>(2)?,
        row.get::<_, String>(3)?,
        row.get(4)?,
        row.get::<_, String>(5)?,
        parse_enum(6, row.get(6)?, Direction::parse)?,
        row.get::<_, String>(7)?,
    ))
}

fn upsert_record(conn: &Connection, record: &Record) -> Result<(), DbError> {
    let meta = record.meta();
    let mut stmt = conn.prepare_cached(
        "INSERT INTO records (
            id, source, conversation_id, title, timestamp, sender, direction, content,
            message_length, word_count, has_question, has_exclamation
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
         ON CONFLICT(id) DO UPDATE SET
            source = excluded.source,
            conversation_id = excluded.conversation_id,
            title = excluded.title,
            timestamp = excluded.timestamp,
            sender = excluded.sender,
            direction = excluded.direction,
            content = excluded.content,
            message_length = excluded.message_length,
            word_count = excluded.word_count,
            has_question = excluded.has_question,
            has_exclamation = excluded.has_exclamation",
    )?;
    stmt.execute(params![
        record.id,
        record.source.as_str(),
        record.conversation_id,
        record.title,
        record.timestamp,
        record.sender,
        record.direction.as_str(),
        record.content(),
        meta.message_length as i64,
        meta.word_count as i64,
        meta.has_question,
        meta.has_exclamation,
    ])?;
    Ok(())
}

fn existing_conversation(conn: &Connection, id: &str) -> Result<Option<String>, DbError> {
    let mut stmt = conn.prepare_cached("SELECT conversation_id FROM records WHERE id = ?1")?;
    Ok(stmt.query_row([id], |row| row.get(0)).optional()?)
}

/// Upsert a batch and bring the touched summaries up to date
pub(crate) fn write_batch_in(conn: &Connection, records: &[Record]) -> Result<BatchOutcome, DbError> {
    let mut outcome = BatchOutcome::default();
    let mut deltas: BTreeMap<&str, SummaryDelta<'_>> = BTreeMap::new();
    let mut recompute: BTreeSet<String> = BTreeSet::new();

    for record in records {
        let previous = existing_conversation(conn, &record.id)?;
        upsert_record(conn, record)?;

        match previous {
            Some(old) => {
                outcome.replaced += 1;
                recompute.insert(record.conversation_id.clone());
                // The old conversation may have lost a record
                recompute.insert(old);
            }
            None => {
                outcome.inserted += 1;
                deltas
                    .entry(record.conversation_id.as_str())
                    .or_insert_with(|| SummaryDelta::new(record))
                    .add(record);
            }
        }
    }

    let mut touched: BTreeSet<&str> = deltas.keys().copied().collect();
    touched.extend(recompute.iter().map(String::as_str));
    outcome.conversations = touched.len();

    for (conversation_id, delta) in &deltas {
        merge_summary(conn, conversation_id, delta)?;
    }
    // Recompute after merging so replaced ids are counted once
    for conversation_id in &recompute {
        recompute_summary(conn, conversation_id)?;
    }
    Ok(outcome)
}

impl VaultDb {
    /// Upsert a batch of records and merge their conversation summaries
    ///
    /// Records are written in slice order, last write wins on a duplicate id.
    /// Records and summaries change in one transaction.
    pub fn write_batch(&mut self, records: &[Record]) -> Result<BatchOutcome, DbError> {
        if records.is_empty() {
            return Ok(BatchOutcome::default());
        }
        let outcome = self.transaction(|tx| write_batch_in(tx, records))?;
        debug!(
            inserted = outcome.inserted,
            replaced = outcome.replaced,
            conversations = outcome.conversations,
            "wrote batch"
        );
        Ok(outcome)
    }

    /// All records of one conversation, oldest first
    pub fn records_for_conversation(&self, conversation_id: &str) -> Result<Vec<Record>, DbError> {
        let sql = format!(
            "SELECT {} FROM records WHERE conversation_id = ?1 ORDER BY timestamp ASC, rowid ASC",
            RECORD_COLUMNS
        );
        self.collect_records(&sql, [conversation_id])
    }

    /// Get a single record by id
    pub fn get_record(&self, id: &str) -> Result<Option<Record>, DbError> {
        let sql = format!("SELECT {} FROM records WHERE id = ?1", RECORD_COLUMNS);
        Ok(self.conn.query_row(&sql, [id], row_to_record).optional()?)
    }

    /// Bounded case-insensitive scan of content and sender, newest first
    ///
    /// Stops reading as soon as `limit` hits are found; `limit` is capped at
    /// [`DEFAULT_SCAN_LIMIT`]. A blank query returns nothing.
    pub fn scan_records(&self, query: &str, limit: usize) -> Result<Vec<Record>, DbError> {
        let limit = limit.min(DEFAULT_SCAN_LIMIT);
        let needle = query.trim().to_lowercase();
        if needle.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let sql = format!(
            "SELECT {} FROM records ORDER BY timestamp DESC, rowid DESC",
            RECORD_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_record)?;

        let mut hits = Vec::new();
        for row in rows {
            let record = row?;
            if record.content().to_lowercase().contains(&needle)
                || record.sender.to_lowercase().contains(&needle)
            {
                hits.push(record);
                if hits.len() >= limit {
                    break;
                }
            }
        }
        Ok(hits)
    }

    /// Records matching a filter, newest first
    pub fn filter_records(&self, filter: &RecordFilter) -> Result<Vec<Record>, DbError> {
        let mut sql = format!("SELECT {} FROM records WHERE 1 = 1", RECORD_COLUMNS);
        let mut values: Vec<rusqlite::types::Value> = Vec::new();

        if let Some(source) = filter.source {
            sql.push_str(" AND source = ?");
            values.push(source.as_str().to_string().into());
        }
        if let Some(from) = filter.date_from {
            sql.push_str(" AND timestamp >= ?");
            values.push(from.into());
        }
        if let Some(to) = filter.date_to {
            sql.push_str(" AND timestamp <= ?");
            values.push(to.into());
        }
        if let Some(min) = filter.min_length {
            sql.push_str(" AND message_length >= ?");
            values.push((min as i64).into());
        }
        sql.push_str(" ORDER BY timestamp DESC, rowid DESC");

        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params_from_iter(values), row_to_record)?;

        // Sender aliases and Unicode case folding are applied here
        let mut out = Vec::new();
        for row in rows {
            let record = row?;
            if filter.matches(&record) {
                out.push(record);
            }
        }
        Ok(out)
    }

    /// Snapshot of every record, oldest first
    pub fn all_records(&self) -> Result<Vec<Record>, DbError> {
        let sql = format!(
            "SELECT {} FROM records ORDER BY timestamp ASC, rowid ASC",
            RECORD_COLUMNS
        );
        self.collect_records(&sql, [])
    }

    /// The most recent `limit` records, newest first
    pub fn recent_records(&self, limit: usize) -> Result<Vec<Record>, DbError> {
        let sql = format!(
            "SELECT {} FROM records ORDER BY timestamp DESC, rowid DESC LIMIT ?1",
            RECORD_COLUMNS
        );
        self.collect_records(&sql, [limit as i64])
    }

    fn collect_records<P: rusqlite::Params>(&self, sql: &str, params: P) -> Result<Vec<Record>, DbError> {
        let mut stmt = self.conn.prepare(sql)?;
        let rows = stmt.query_map(params, row_to_record)?;
        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }
}
