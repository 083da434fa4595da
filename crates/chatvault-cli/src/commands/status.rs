//! Status command - show store statistics

use anyhow::Result;
use chatvault_db::VaultDb;

use crate::cli::{Cli, OutputFormat};
use crate::output::{colors, print_json};

pub fn run(cli: &Cli, db: &VaultDb) -> Result<()> {
    let stats = db.stats()?;
    let healthy = stats.version == stats.expected_version;
    let db_path = stats
        .db_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| ":memory:".to_string());

    match cli.effective_format() {
        OutputFormat::Human => {
            println!("{}", colors::header("Vault Status"));
            println!();
            println!("  {}: {}", colors::label("Database"), db_path);
            println!(
                "  {}: {}",
                colors::label("Size"),
                colors::format_size(stats.db_size_bytes)
            );
            println!(
                "  {}: {}",
                colors::label("Version"),
                colors::value(&stats.version.to_string())
            );
            println!();
            println!(
                "  {}: {}",
                colors::label("Conversations"),
                colors::format_count(stats.conversation_count)
            );
            println!(
                "  {}: {}",
                colors::label("Messages"),
                colors::format_count(stats.record_count)
            );

            if let Some(last) = &stats.last_import {
                println!();
                println!("  {}: {}", colors::label("Last import"), colors::value(last));
            }

            println!();
            if healthy {
                println!("{}", colors::success("Vault is healthy"));
            } else {
                println!(
                    "{}",
                    colors::warning(&format!(
                        "Schema version {} (expected {})",
                        stats.version, stats.expected_version
                    ))
                );
            }
        }

        OutputFormat::Json => {
            let output = serde_json::json!({
                "db_path": db_path,
                "db_size_bytes": stats.db_size_bytes,
                "version": stats.version,
                "expected_version": stats.expected_version,
                "conversation_count": stats.conversation_count,
                "record_count": stats.record_count,
                "last_import": stats.last_import,
                "status": if healthy { "healthy" } else { "outdated" },
            });
            print_json(&output, cli.pretty)?;
        }

        OutputFormat::Minimal => {
            println!("{}", db_path);
        }
    }

    Ok(())
}
