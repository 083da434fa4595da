//! View command - display the messages of a conversation

use anyhow::Result;
use chatvault_db::VaultDb;

use crate::cli::{Cli, OutputFormat};
use crate::commands::resolve_conversation;
use crate::output::{colors, human, json, minimal, print_json};

pub fn run(
    cli: &Cli,
    db: &VaultDb,
    conversation: &str,
    last: Option<usize>,
    first: Option<usize>,
    reverse: bool,
) -> Result<()> {
    let summary = resolve_conversation(db, conversation)?;
    let mut records = db.records_for_conversation(&summary.id)?;

    if let Some(n) = last {
        let start = records.len().saturating_sub(n);
        records.drain(..start);
    } else if let Some(n) = first {
        records.truncate(n);
    }
    if reverse {
        records.reverse();
    }

    match cli.effective_format() {
        OutputFormat::Human => {
            println!("{}", human::format_summary_info(&summary));
            println!();
            for record in &records {
                println!("{}", human::format_record(record, true));
                println!();
            }
            if records.is_empty() {
                println!("{}", colors::warning("No messages in this conversation"));
            }
        }
        OutputFormat::Json => {
            let json_array: Vec<serde_json::Value> =
                records.iter().map(json::record_to_json).collect();
            print_json(&json_array, cli.pretty)?;
        }
        OutputFormat::Minimal => {
            for record in &records {
                let content = minimal::format_record(record);
                if !content.is_empty() {
                    println!("{}", content);
                }
            }
        }
    }

    Ok(())
}
