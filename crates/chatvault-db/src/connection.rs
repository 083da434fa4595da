//! Store handle and connection management

use rusqlite::{Connection, OpenFlags, OptionalExtension, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::schema::{self, DB_VERSION};

/// Database errors
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database not found at {0}")]
    NotFound(PathBuf),

    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database version mismatch: expected at most {expected}, found {found}")]
    VersionMismatch { expected: i32, found: i32 },
}

/// Default database path
pub fn default_db_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "~".to_string());
    PathBuf::from(home).join(".chatvault").join("vault.db")
}

/// How long a writer waits for another connection's write lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Read-write handle to the record store
///
/// Opened once by the caller and passed to every ingestion and query call.
/// Dropping the handle closes the connection; [`VaultDb::close`] does the same
/// but reports errors.
pub struct VaultDb {
    pub(crate) conn: Connection,
    path: Option<PathBuf>,
}

impl std::fmt::Debug for VaultDb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultDb").field("path", &self.path).finish()
    }
}

impl VaultDb {
    /// Open or create the database at a specific path, upgrading its schema
    pub fn open_or_create(path: &Path) -> Result<Self, DbError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;

        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )?;

        Self::init(conn, Some(path.to_path_buf()))
    }

    /// Open an existing database, failing if the file is missing
    pub fn open_existing(path: &Path) -> Result<Self, DbError> {
        if !path.exists() {
            return Err(DbError::NotFound(path.to_path_buf()));
        }
        Self::open_or_create(path)
    }

    /// Fresh private in-memory store
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn, None)
    }

    fn init(conn: Connection, path: Option<PathBuf>) -> Result<Self, DbError> {
        let mut db = Self { conn, path };
        schema::init_schema(&mut db.conn)?;
        Ok(db)
    }

    /// Close the connection, reporting any error
    pub fn close(self) -> Result<(), DbError> {
        self.conn.close().map_err(|(_, e)| DbError::Sqlite(e))
    }

    /// Database file path, `None` for in-memory stores
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Get a reference to the underlying connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Execute a closure within an IMMEDIATE transaction
    ///
    /// The write lock is taken at BEGIN, so writers on other connections wait
    /// (up to the busy timeout) instead of interleaving read-modify-write.
    /// Inside a staged transaction the closure runs in a savepoint instead.
    pub fn transaction<F, T>(&mut self, f: F) -> Result<T, DbError>
    where
        F: FnOnce(&Connection) -> Result<T, DbError>,
    {
        if self.is_staging() {
            let sp = self.conn.savepoint()?;
            let result = f(&sp)?;
            sp.commit()?;
            return Ok(result);
        }
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let result = f(&tx)?;
        tx.commit()?;
        Ok(result)
    }

    /// Open an IMMEDIATE transaction spanning several batch writes
    ///
    /// Nothing written until [`VaultDb::commit_staged`] is visible to other
    /// connections, and [`VaultDb::rollback_staged`] discards all of it.
    pub fn begin_staged(&mut self) -> Result<(), DbError> {
        self.conn.execute_batch("BEGIN IMMEDIATE")?;
        Ok(())
    }

    /// Commit the staged transaction
    pub fn commit_staged(&mut self) -> Result<(), DbError> {
        if self.is_staging() {
            self.conn.execute_batch("COMMIT")?;
        }
        Ok(())
    }

    /// Discard everything written since [`VaultDb::begin_staged`]
    pub fn rollback_staged(&mut self) -> Result<(), DbError> {
        if self.is_staging() {
            self.conn.execute_batch("ROLLBACK")?;
        }
        Ok(())
    }

    /// Whether a staged transaction is open
    pub fn is_staging(&self) -> bool {
        !self.conn.is_autocommit()
    }

    /// Read a metadata value
    pub fn get_metadata(&self, key: &str) -> Result<Option<String>, DbError> {
        let value = self
            .conn
            .query_row("SELECT value FROM metadata WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    /// Write a metadata value
    pub fn set_metadata(&self, key: &str, value: &str) -> Result<(), DbError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            [key, value],
        )?;
        Ok(())
    }

    /// Record the time of the latest completed import
    pub fn touch_last_import(&self) -> Result<(), DbError> {
        self.set_metadata(LAST_IMPORT_KEY, &chrono::Utc::now().to_rfc3339())
    }

    /// Get database statistics
    pub fn stats(&self) -> Result<VaultStats, DbError> {
        let version: i32 = self
            .get_metadata("version")?
            .and_then(|v| v.parse().ok())
            .unwrap_or(0);

        let record_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;

        let conversation_count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM summaries", [], |row| row.get(0))?;

        let last_import = self.get_metadata(LAST_IMPORT_KEY)?;

        let db_size_bytes = self
            .path
            .as_ref()
            .and_then(|p| std::fs::metadata(p).ok())
            .map(|m| m.len())
            .unwrap_or(0);

        Ok(VaultStats {
            version,
            expected_version: DB_VERSION,
            record_count,
            conversation_count,
            last_import,
            db_path: self.path.clone(),
            db_size_bytes,
        })
    }
}

pub(crate) const LAST_IMPORT_KEY: &str = "last_import";

/// Database statistics
#[derive(Debug, Clone)]
pub struct VaultStats {
    pub version: i32,
    pub expected_version: i32,
    pub record_count: i64,
    pub conversation_count: i64,
    pub last_import: Option<String>,
    pub db_path: Option<PathBuf>,
    pub db_size_bytes: u64,
}
