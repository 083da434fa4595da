//! List command - show conversations

use anyhow::Result;
use chatvault_db::VaultDb;

use crate::cli::{Cli, OutputFormat};
use crate::output::{colors, human, json, minimal, print_json};

pub fn run(cli: &Cli, db: &VaultDb, limit: usize, search: Option<&str>) -> Result<()> {
    let summaries = match search {
        Some(pattern) => db.find_summaries(pattern)?,
        None => db.list_summaries()?,
    };
    let summaries: Vec<_> = summaries.into_iter().take(limit).collect();

    match cli.effective_format() {
        OutputFormat::Human => {
            if summaries.is_empty() {
                println!("No conversations found");
            } else {
                println!(
                    "{}",
                    colors::header(&format!("Conversations ({})", summaries.len()))
                );
                println!();
                for summary in &summaries {
                    println!("{}", human::format_summary(summary));
                }
            }
        }
        OutputFormat::Json => {
            let json_array: Vec<serde_json::Value> =
                summaries.iter().map(json::summary_to_json).collect();
            print_json(&json_array, cli.pretty)?;
        }
        OutputFormat::Minimal => {
            for summary in &summaries {
                println!("{}", minimal::format_summary(summary));
            }
        }
    }

    Ok(())
}
