//! Recent command - latest messages across every conversation

use anyhow::Result;
use chatvault_db::VaultDb;

use crate::cli::{Cli, OutputFormat};
use crate::output::{colors, human, json, minimal, print_json};

pub fn run(cli: &Cli, db: &VaultDb, limit: usize) -> Result<()> {
    let records = db.recent_records(limit)?;

    match cli.effective_format() {
        OutputFormat::Human => {
            if records.is_empty() {
                println!("{}", colors::warning("No messages stored yet"));
                return Ok(());
            }
            println!(
                "{}",
                colors::header(&format!("Latest {} messages", records.len()))
            );
            println!();
            for record in &records {
                print!("{} ", colors::colored_conversation(&record.title));
                println!("{}", human::format_record(record, false));
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
