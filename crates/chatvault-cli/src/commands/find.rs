//! Find command - filter stored messages

use anyhow::{Context, Result};
use chatvault_core::{RecordFilter, Source};
use chatvault_db::VaultDb;
use chrono::NaiveDate;

use crate::cli::{Cli, OutputFormat};
use crate::output::{colors, human, json, minimal, print_json};

/// Filter criteria as given on the command line
#[derive(Debug, Default)]
pub struct FindArgs<'a> {
    pub keyword: Option<&'a str>,
    pub sender: Option<&'a str>,
    pub source: Option<Source>,
    pub from: Option<&'a str>,
    pub to: Option<&'a str>,
    pub min_length: Option<usize>,
}

/// Start of `date` (UTC) in epoch millis; with `end_of_day`, its last millisecond
fn parse_day(date: &str, end_of_day: bool) -> Result<i64> {
    let day = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .with_context(|| format!("Invalid date '{}', expected YYYY-MM-DD", date))?;
    let start = day
        .and_hms_opt(0, 0, 0)
        .map(|dt| dt.and_utc().timestamp_millis())
        .with_context(|| format!("Invalid date '{}'", date))?;
    Ok(if end_of_day {
        start + 24 * 60 * 60 * 1000 - 1
    } else {
        start
    })
}

pub fn build_filter(args: &FindArgs<'_>) -> Result<RecordFilter> {
    let mut filter = RecordFilter::new();
    if let Some(keyword) = args.keyword {
        filter = filter.with_keyword(keyword);
    }
    if let Some(sender) = args.sender {
        filter = filter.with_sender(sender);
    }
    if let Some(source) = args.source {
        filter = filter.with_source(source);
    }
    let from = args.from.map(|d| parse_day(d, false)).transpose()?;
    let to = args.to.map(|d| parse_day(d, true)).transpose()?;
    filter = filter.with_date_range(from, to);
    if let Some(min) = args.min_length {
        filter = filter.with_min_length(min);
    }
    Ok(filter)
}

pub fn run(cli: &Cli, db: &VaultDb, args: &FindArgs<'_>, limit: usize) -> Result<()> {
    let filter = build_filter(args)?;
    let records: Vec<_> = db.filter_records(&filter)?.into_iter().take(limit).collect();

    match cli.effective_format() {
        OutputFormat::Human => {
            if records.is_empty() {
                println!("No messages match");
            } else {
                println!(
                    "{}",
                    colors::header(&format!("Matching messages ({})", records.len()))
                );
                println!();
                for record in &records {
                    print!("{} ", colors::colored_conversation(&record.title));
                    println!("{}", human::format_record(record, false));
                }
            }
        }
        OutputFormat::Json => {
            let json_array: Vec<serde_json::Value> =
                records.iter().map(json::record_to_json).collect();
            print_json(&json_array, cli.pretty)?;
        }
        OutputFormat::Minimal => {
            for record in &records {
                println!("{}", minimal::format_record(record));
            }
        }
    }

    Ok(())
}
