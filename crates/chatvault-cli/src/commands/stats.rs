//! Stats command - message statistics

use anyhow::Result;
use chatvault_core::CorpusStats;
use chatvault_db::VaultDb;

use crate::cli::{Cli, OutputFormat};
use crate::commands::resolve_conversation;
use crate::output::{colors, human, print_json};

pub fn run(cli: &Cli, db: &VaultDb, conversation: Option<&str>) -> Result<()> {
    let (title, records) = match conversation {
        Some(query) => {
            let summary = resolve_conversation(db, query)?;
            let records = db.records_for_conversation(&summary.id)?;
            (summary.title, records)
        }
        None => ("All conversations".to_string(), db.all_records()?),
    };
    let stats = CorpusStats::from_records(&records);

    match cli.effective_format() {
        OutputFormat::Human => {
            println!("{}", colors::header(&title));
            println!();
            println!("{}", human::format_stats(&stats));
        }
        OutputFormat::Json => print_json(&stats, cli.pretty)?,
        OutputFormat::Minimal => {
            println!("{}\t{}", stats.total_messages, stats.total_words);
        }
    }

    Ok(())
}
