//! CLI command implementations

pub mod context;
pub mod find;
pub mod import;
pub mod list;
pub mod recent;
pub mod reset;
pub mod search;
pub mod stats;
pub mod status;
pub mod view;

use anyhow::{bail, Result};
use chatvault_core::ConversationSummary;
use chatvault_db::VaultDb;

/// Resolve a conversation by exact id, then by id or title substring
pub fn resolve_conversation(db: &VaultDb, query: &str) -> Result<ConversationSummary> {
    if let Some(summary) = db.get_summary(query)? {
        return Ok(summary);
    }

    let mut matches = db.find_summaries(query)?;
    match matches.len() {
        0 => bail!("Conversation not found: {}", query),
        1 => Ok(matches.remove(0)),
        _ => {
            eprintln!("Multiple conversations match '{}':", query);
            for m in &matches {
                eprintln!("  - {} ({})", m.title, m.id);
            }
            bail!("Please specify a more specific conversation id");
        }
    }
}
