//! Reset command - clear the store or rebuild summaries

use anyhow::{bail, Result};
use chatvault_db::VaultDb;

use crate::cli::{Cli, OutputFormat};
use crate::output::{colors, print_json};

pub fn run(cli: &Cli, db: &mut VaultDb, rebuild: bool, yes: bool) -> Result<()> {
    if rebuild {
        let count = db.rebuild_summaries()?;
        match cli.effective_format() {
            OutputFormat::Json => {
                print_json(&serde_json::json!({ "rebuilt": count }), cli.pretty)?
            }
            _ => println!(
                "{}",
                colors::success(&format!("Rebuilt {} conversation summaries", count))
            ),
        }
        return Ok(());
    }

    if !yes {
        bail!("Refusing to delete all messages without --yes");
    }

    db.clear()?;
    match cli.effective_format() {
        OutputFormat::Json => print_json(&serde_json::json!({ "cleared": true }), cli.pretty)?,
        _ => println!("{}", colors::success("Vault cleared")),
    }
    Ok(())
}
