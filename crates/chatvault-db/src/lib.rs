//! chatvault-db - SQLite persistence layer for chat records
//!
//! Stores normalized records alongside per-conversation summaries. Every batch
//! write updates both in one transaction, and summaries are merged with
//! SQLite's atomic upsert so concurrent importers cannot lose counts.

pub mod connection;
pub mod schema;
pub mod records;
pub mod summaries;
pub mod rebuild;

pub use connection::*;
pub use records::{BatchOutcome, DEFAULT_SCAN_LIMIT};
pub use schema::DB_VERSION;
