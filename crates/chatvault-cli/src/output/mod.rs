//! Output formatting for CLI commands

pub mod colors;
pub mod human;
pub mod json;
pub mod minimal;

use anyhow::Result;
use serde::Serialize;

/// Print a value as JSON, pretty-printed on request
pub fn print_json<T: Serialize + ?Sized>(value: &T, pretty: bool) -> Result<()> {
    if pretty {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{}", serde_json::to_string(value)?);
    }
    Ok(())
}
