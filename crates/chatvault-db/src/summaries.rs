//! Conversation summary maintenance and lookup

use std::collections::{BTreeSet, HashMap};

use chatvault_core::{ConversationSummary, Record, Source};
use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::connection::{DbError, VaultDb};
use crate::records::parse_enum;

/// Aggregate of one conversation's share of a batch
#[derive(Debug)]
pub(crate) struct SummaryDelta<'a> {
    pub title: &'a str,
    pub source: Source,
    pub count: i64,
    pub max_timestamp: i64,
    pub senders: BTreeSet<&'a str>,
}

impl<'a> SummaryDelta<'a> {
    pub fn new(first: &'a Record) -> Self {
        Self {
            title: &first.title,
            source: first.source,
            count: 0,
            max_timestamp: i64::MIN,
            senders: BTreeSet::new(),
        }
    }

    pub fn add(&mut self, record: &'a Record) {
        self.count += 1;
        self.max_timestamp = self.max_timestamp.max(record.timestamp);
        self.senders.insert(&record.sender);
    }
}

/// Merge a delta into the stored summary without reading it first
///
/// The increment and max happen inside the UPSERT itself, so concurrent
/// writers cannot lose each other's counts.
pub(crate) fn merge_summary(
    conn: &Connection,
    conversation_id: &str,
    delta: &SummaryDelta<'_>,
) -> Result<(), DbError> {
    conn.execute(
        "INSERT INTO summaries (id, title, source, message_count, last_message_timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET
            message_count = message_count + excluded.message_count,
            last_message_timestamp = MAX(last_message_timestamp, excluded.last_message_timestamp)",
        params![
            conversation_id,
            delta.title,
            delta.source.as_str(),
            delta.count,
            delta.max_timestamp
        ],
    )?;

    let mut stmt = conn.prepare_cached(
        "INSERT OR IGNORE INTO summary_participants (conversation_id, sender) VALUES (?1, ?2)",
    )?;
    for sender in &delta.senders {
        stmt.execute(params![conversation_id, sender])?;
    }
    Ok(())
}

/// Recompute a summary from the records table
///
/// Used when records move between conversations or are replaced, where an
/// incremental merge would double count. Removes the summary when no records
/// remain.
pub(crate) fn recompute_summary(conn: &Connection, conversation_id: &str) -> Result<(), DbError> {
    let (count, last): (i64, Option<i64>) = conn.query_row(
        "SELECT COUNT(*), MAX(timestamp) FROM records WHERE conversation_id = ?1",
        [conversation_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    conn.execute(
        "DELETE FROM summary_participants WHERE conversation_id = ?1",
        [conversation_id],
    )?;

    let Some(last) = last.filter(|_| count > 0) else {
        conn.execute("DELETE FROM summaries WHERE id = ?1", [conversation_id])?;
        return Ok(());
    };

    let (title, source): (String, String) = conn.query_row(
        "SELECT title, source FROM records WHERE conversation_id = ?1
         ORDER BY timestamp ASC, rowid ASC LIMIT 1",
        [conversation_id],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;

    conn.execute(
        "INSERT INTO summaries (id, title, source, message_count, last_message_timestamp)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(id) DO UPDATE SET
            message_count = excluded.message_count,
            last_message_timestamp = excluded.last_message_timestamp",
        params![conversation_id, title, source, count, last],
    )?;

    conn.execute(
        "INSERT OR IGNORE INTO summary_participants (conversation_id, sender)
         SELECT DISTINCT conversation_id, sender FROM records WHERE conversation_id = ?1",
        [conversation_id],
    )?;
    Ok(())
}

fn row_to_summary(row: &Row) -> rusqlite::Result<ConversationSummary> {
    Ok(ConversationSummary {
        id: row.get(0)?,
        title: row.get(1)?,
        source: parse_enum(2, row.get(2)?, Source::parse)?,
        message_count: row.get(3)?,
        last_message_timestamp: row.get(4)?,
        participants: Vec::new(),
    })
}

const SUMMARY_COLUMNS: &str = "id, title, source, message_count, last_message_timestamp";

impl VaultDb {
    /// List all summaries, most recently active first
    pub fn list_summaries(&self) -> Result<Vec<ConversationSummary>, DbError> {
        let sql = format!(
            "SELECT {} FROM summaries ORDER BY last_message_timestamp DESC, id ASC",
            SUMMARY_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], row_to_summary)?;

        let mut summaries = Vec::new();
        for row in rows {
            summaries.push(row?);
        }

        let mut participants = self.all_participants()?;
        for summary in &mut summaries {
            summary.participants = participants.remove(&summary.id).unwrap_or_default();
        }
        Ok(summaries)
    }

    /// Get one summary by conversation id
    pub fn get_summary(&self, conversation_id: &str) -> Result<Option<ConversationSummary>, DbError> {
        let sql = format!("SELECT {} FROM summaries WHERE id = ?1", SUMMARY_COLUMNS);
        let summary = self
            .conn
            .query_row(&sql, [conversation_id], row_to_summary)
            .optional()?;

        match summary {
            Some(mut summary) => {
                summary.participants = self.participants(conversation_id)?;
                Ok(Some(summary))
            }
            None => Ok(None),
        }
    }

    /// Find summaries whose id or title contains `pattern`
    pub fn find_summaries(&self, pattern: &str) -> Result<Vec<ConversationSummary>, DbError> {
        let needle = pattern.to_lowercase();
        Ok(self
            .list_summaries()?
            .into_iter()
            .filter(|s| {
                s.id.to_lowercase().contains(&needle) || s.title.to_lowercase().contains(&needle)
            })
            .collect())
    }

    fn participants(&self, conversation_id: &str) -> Result<Vec<String>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT sender FROM summary_participants WHERE conversation_id = ?1 ORDER BY sender",
        )?;
        let rows = stmt.query_map([conversation_id], |row| row.get(0))?;
        let mut out = Vec::new();
        for row in rows {
            out.push(row?);
        }
        Ok(out)
    }

    fn all_participants(&self) -> Result<HashMap<String, Vec<String>>, DbError> {
        let mut stmt = self.conn.prepare(
            "SELECT conversation_id, sender FROM summary_participants
             ORDER BY conversation_id, sender",
        )?;
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get(1)?)))?;
        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for row in rows {
            let (conversation_id, sender) = row?;
            map.entry(conversation_id).or_default().push(sender);
        }
        Ok(map)
    }
}
