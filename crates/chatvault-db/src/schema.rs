//! Database schema creation and migration
//!
//! All DDL runs inside the same transaction that writes the version row, so a
//! failed upgrade leaves the previous schema untouched.

use rusqlite::{Connection, OptionalExtension, TransactionBehavior};
use tracing::info;

use crate::connection::DbError;
use crate::rebuild;

/// Current database schema version
pub const DB_VERSION: i32 = 2;

const METADATA_TABLE: &str = "CREATE TABLE IF NOT EXISTS metadata (
    key TEXT PRIMARY KEY,
    value TEXT
)";

const RECORDS_TABLE: &str = "CREATE TABLE IF NOT EXISTS records (
    id TEXT PRIMARY KEY,
    source TEXT NOT NULL,
    conversation_id TEXT NOT NULL,
    title TEXT NOT NULL,
    timestamp INTEGER NOT NULL,
    sender TEXT NOT NULL,
    direction TEXT NOT NULL,
    content TEXT NOT NULL,
    message_length INTEGER NOT NULL,
    word_count INTEGER NOT NULL,
    has_question INTEGER NOT NULL,
    has_exclamation INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_records_timestamp ON records(timestamp);
CREATE INDEX IF NOT EXISTS idx_records_conversation ON records(conversation_id, timestamp);";

const SUMMARY_TABLES: &str = "CREATE TABLE IF NOT EXISTS summaries (
    id TEXT PRIMARY KEY,
    title TEXT NOT NULL,
    source TEXT NOT NULL,
    message_count INTEGER NOT NULL,
    last_message_timestamp INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS summary_participants (
    conversation_id TEXT NOT NULL,
    sender TEXT NOT NULL,
    PRIMARY KEY (conversation_id, sender)
);";

/// Read the stored schema version, `None` for a fresh database
pub fn stored_version(conn: &Connection) -> Result<Option<i32>, DbError> {
    let has_metadata: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'metadata')",
        [],
        |row| row.get(0),
    )?;
    if !has_metadata {
        return Ok(None);
    }
    let version: Option<i32> = conn
        .query_row(
            "SELECT CAST(value AS INTEGER) FROM metadata WHERE key = 'version'",
            [],
            |row| row.get(0),
        )
        .optional()?;
    Ok(version)
}

/// Initialize the database schema (create tables + run migrations)
pub fn init_schema(conn: &mut Connection) -> Result<(), DbError> {
    let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let current = stored_version(&tx)?;
    if let Some(found) = current {
        if found > DB_VERSION {
            return Err(DbError::VersionMismatch {
                expected: DB_VERSION,
                found,
            });
        }
        if found == DB_VERSION {
            return Ok(());
        }
    }

    create_tables(&tx)?;
    if let Some(found) = current {
        migrate_schema(&tx, found)?;
    }

    tx.execute(
        "INSERT OR REPLACE INTO metadata (key, value) VALUES ('version', ?1)",
        [&DB_VERSION.to_string()],
    )?;
    tx.commit()?;
    Ok(())
}

/// Create every current table and index; safe to repeat
fn create_tables(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(METADATA_TABLE)?;
    conn.execute_batch(RECORDS_TABLE)?;
    conn.execute_batch(SUMMARY_TABLES)?;
    Ok(())
}

/// Migrate data from older versions to current; tables already exist
pub fn migrate_schema(conn: &Connection, from: i32) -> Result<(), DbError> {
    // Migration v1 -> v2: summaries did not exist, derive them from records
    if from < 2 {
        info!("Migrating schema from v{} to v2", from);
        let rebuilt = rebuild::rebuild_summaries_in(conn)?;
        info!(conversations = rebuilt, "Migration to v2 complete");
    }

    Ok(())
}

#[cfg(test)]
pub(crate) fn create_v1_schema(conn: &Connection) -> Result<(), DbError> {
    conn.execute_batch(METADATA_TABLE)?;
    conn.execute_batch(RECORDS_TABLE)?;
    conn.execute("INSERT OR REPLACE INTO metadata (key, value) VALUES ('version', '1')", [])?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table_names(conn: &Connection) -> Vec<String> {
        conn.prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect()
    }

    #[test]
    fn test_fresh_schema_creates_all_tables() {
        let mut conn = Connection::open_in_memory().unwrap();
        init_schema(&mut conn).unwrap();

        let tables = table_names(&conn);
        for name in ["metadata", "records", "summaries", "summary_participants"] {
            assert!(tables.contains(&name.to_string()), "missing {}", name);
        }
        assert_eq!(stored_version(&conn).unwrap(), Some(DB_VERSION));
    }

    #[test]
    fn test_init_is_idempotent() {
        let mut conn = Connection::open_in_memory().unwrap();
        init_schema(&mut conn).unwrap();
        init_schema(&mut conn).unwrap();
        assert_eq!(stored_version(&conn).unwrap(), Some(DB_VERSION));
    }

    #[test]
    fn test_newer_version_rejected_without_changes() {
        let mut conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE metadata (key TEXT PRIMARY KEY, value TEXT);
             INSERT INTO metadata (key, value) VALUES ('version', '99');",
        )
        .unwrap();

        let err = init_schema(&mut conn).unwrap_err();
        assert!(matches!(
            err,
            DbError::VersionMismatch {
                expected: DB_VERSION,
                found: 99
            }
        ));
        assert_eq!(table_names(&conn), vec!["metadata".to_string()]);
    }

    #[test]
    fn test_v1_upgrade_backfills_summaries() {
        let mut conn = Connection::open_in_memory().unwrap();
        create_v1_schema(&conn).unwrap();
        conn.execute_batch(
            "INSERT INTO records VALUES ('a', 'transcript', 'C1', 'chat', 10, 'Ann', 'received', 'hi', 2, 1, 0, 0);
             INSERT INTO records VALUES ('b', 'transcript', 'C1', 'chat', 30, 'Ben', 'received', 'yo', 2, 1, 0, 0);
             INSERT INTO records VALUES ('c', 'thread', 'C2', 'other', 5, 'Cy', 'sent', 'hey', 3, 1, 0, 0);",
        )
        .unwrap();

        init_schema(&mut conn).unwrap();
        assert_eq!(stored_version(&conn).unwrap(), Some(DB_VERSION));

        let (count, last): (i64, i64) = conn
            .query_row(
                "SELECT message_count, last_message_timestamp FROM summaries WHERE id = 'C1'",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(last, 30);

        let participants: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM summary_participants WHERE conversation_id = 'C1'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(participants, 2);
    }
}
