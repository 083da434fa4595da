//! Context command - render the read-only snapshot given to a text collaborator

use anyhow::Result;
use chatvault_core::transcript_context;
use chatvault_db::VaultDb;

use crate::cli::{Cli, OutputFormat};
use crate::commands::resolve_conversation;
use crate::output::print_json;

pub fn run(cli: &Cli, db: &VaultDb, conversation: &str, max_messages: usize) -> Result<()> {
    let summary = resolve_conversation(db, conversation)?;
    let records = db.records_for_conversation(&summary.id)?;
    let context = transcript_context(&records, max_messages);

    match cli.effective_format() {
        OutputFormat::Json => {
            let output = serde_json::json!({
                "conversationId": summary.id,
                "title": summary.title,
                "messages": records.len().min(max_messages),
                "context": context,
            });
            print_json(&output, cli.pretty)?;
        }
        OutputFormat::Human | OutputFormat::Minimal => println!("{}", context),
    }

    Ok(())
}
