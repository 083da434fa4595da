//! chatvault-indexer - Ingestion pipeline for chat export files
//!
//! This crate owns the I/O side of ingestion: reading resources in byte
//! ranges, handing decoded lines or materialized documents to the
//! `chatvault-core` parsers, and writing the resulting batches through
//! `chatvault-db`. It also assembles search corpora from reference datasets.

pub mod corpus;
pub mod discovery;
pub mod html;
pub mod import;
pub mod ingest;
pub mod source;

pub use corpus::{build_corpus, load_reference_dir, load_reference_file};
pub use discovery::{default_reference_dir, discover_exports};
pub use html::{body_text, parse_markup};
pub use import::{import_paths, ImportFailure, ImportReport};
pub use ingest::{
    ingest, ingest_file, IngestError, IngestOptions, IngestResult, DEFAULT_CHUNK_SIZE,
    DEFAULT_MAX_BATCH,
};
pub use source::{ByteSource, FileSource, MemorySource};
