//! Store maintenance: clearing and summary rebuilds

use rusqlite::Connection;
use tracing::info;

use crate::connection::{DbError, VaultDb, LAST_IMPORT_KEY};
use crate::summaries::recompute_summary;

/// Recompute every summary from the records table, returning how many exist
pub(crate) fn rebuild_summaries_in(conn: &Connection) -> Result<usize, DbError> {
    conn.execute_batch(
        "DELETE FROM summary_participants;
         DELETE FROM summaries;",
    )?;

    let mut stmt = conn.prepare("SELECT DISTINCT conversation_id FROM records")?;
    let ids: Vec<String> = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<_, _>>()?;

    for id in &ids {
        recompute_summary(conn, id)?;
    }
    Ok(ids.len())
}

impl VaultDb {
    /// Delete every record and summary, keeping the schema
    pub fn clear(&mut self) -> Result<(), DbError> {
        self.transaction(|tx| {
            tx.execute_batch(
                "DELETE FROM summary_participants;
                 DELETE FROM summaries;
                 DELETE FROM records;",
            )?;
            tx.execute("DELETE FROM metadata WHERE key = ?1", [LAST_IMPORT_KEY])?;
            Ok(())
        })?;
        info!("Cleared all records and summaries");
        Ok(())
    }

    /// Recompute all summaries from stored records
    pub fn rebuild_summaries(&mut self) -> Result<usize, DbError> {
        let count = self.transaction(rebuild_summaries_in)?;
        info!(conversations = count, "Rebuilt summaries");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatvault_core::{Direction, Record, Source};

    fn rec(id: &str, conv: &str, ts: i64) -> Record {
        Record::new(id, Source::Markup, conv, "Page", ts, "You", Direction::Sent, "x")
    }

    #[test]
    fn test_clear_removes_everything() {
        let mut db = VaultDb::open_in_memory().unwrap();
        db.write_batch(&[rec("1", "A", 1), rec("2", "B", 2)]).unwrap();
        db.touch_last_import().unwrap();

        db.clear().unwrap();

        let stats = db.stats().unwrap();
        assert_eq!(stats.record_count, 0);
        assert_eq!(stats.conversation_count, 0);
        assert!(stats.last_import.is_none());
        assert!(db.list_summaries().unwrap().is_empty());
    }

    #[test]
    fn test_rebuild_repairs_drifted_summary() {
        let mut db = VaultDb::open_in_memory().unwrap();
        db.write_batch(&[rec("1", "A", 1), rec("2", "A", 9)]).unwrap();
        db.connection()
            .execute("UPDATE summaries SET message_count = 40 WHERE id = 'A'", [])
            .unwrap();

        assert_eq!(db.rebuild_summaries().unwrap(), 1);
        let summary = db.get_summary("A").unwrap().unwrap();
        assert_eq!(summary.message_count, 2);
        assert_eq!(summary.last_message_timestamp, 9);
        assert_eq!(summary.source, Source::Markup);
    }
}
