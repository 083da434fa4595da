//! chatvault-core - Core types and algorithms for chat export ingestion
//!
//! This crate holds everything that does not touch the disk: the normalized
//! record model, incremental line reassembly, the transcript line classifier,
//! markup and JSON thread extraction, and the in-memory relevance search.

pub mod types;
pub mod reader;
pub mod classifier;
pub mod markup;
pub mod threads;
pub mod detect;
pub mod search;
pub mod filter;
pub mod stats;
pub mod names;
pub mod context;

pub use types::*;
pub use reader::*;
pub use classifier::*;
pub use markup::*;
pub use threads::*;
pub use detect::*;
pub use search::*;
pub use filter::*;
pub use stats::*;
pub use names::*;
pub use context::*;
