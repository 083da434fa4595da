//! Search command - ranked relevance search or plain substring scan

use anyhow::Result;
use chatvault_core::Record;
use chatvault_db::VaultDb;
use chatvault_indexer::build_corpus;
use colored::Colorize;
use regex::{Regex, RegexBuilder};

use crate::cli::{Cli, OutputFormat};
use crate::output::{colors, human, json, print_json};

pub fn run(cli: &Cli, db: &VaultDb, query: &str, limit: usize, scan: bool) -> Result<()> {
    if scan {
        return run_scan(cli, db, query, limit);
    }

    let reference_dir = cli.reference_dir();
    let corpus = build_corpus(db, reference_dir.as_deref())?;
    let hits: Vec<_> = corpus.search(query).into_iter().take(limit).collect();

    match cli.effective_format() {
        OutputFormat::Human => {
            if hits.is_empty() {
                println!("No results found for: {}", query.cyan());
            } else {
                println!(
                    "{}",
                    colors::header(&format!("Search results for '{}' ({})", query, hits.len()))
                );
                println!();
                for hit in &hits {
                    println!("{}", human::format_hit(hit, corpus.get(hit.index)));
                }
            }
        }
        OutputFormat::Json => {
            let json_array: Vec<serde_json::Value> = hits
                .iter()
                .map(|hit| json::hit_to_json(hit, corpus.get(hit.index)))
                .collect();
            print_json(&json_array, cli.pretty)?;
        }
        OutputFormat::Minimal => {
            for hit in &hits {
                println!("{}\t{}", hit.score, hit.subject);
            }
        }
    }

    Ok(())
}

fn run_scan(cli: &Cli, db: &VaultDb, query: &str, limit: usize) -> Result<()> {
    let records = db.scan_records(query, limit)?;

    match cli.effective_format() {
        OutputFormat::Human => {
            if records.is_empty() {
                println!("No messages contain: {}", query.cyan());
            } else {
                println!(
                    "{}",
                    colors::header(&format!("Messages containing '{}' ({})", query, records.len()))
                );
                println!();
                for record in &records {
                    print!("{} ", colors::colored_conversation(&record.title));
                    println!("{}", human::format_record(record, false));
                    highlight_match(record, query);
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
                println!("{}", record.content());
            }
        }
    }

    Ok(())
}

/// Print the content line holding the first match, with the match highlighted
fn highlight_match(record: &Record, query: &str) {
    let Some(pattern) = match_pattern(query) else {
        return;
    };
    let Some((line, (start, end))) = record
        .content()
        .lines()
        .find_map(|l| match_span(&pattern, l).map(|span| (l, span)))
    else {
        return;
    };
    println!(
        "  >>> {}{}{}",
        &line[..start],
        line[start..end].black().on_yellow(),
        &line[end..]
    );
}

/// Case-insensitive literal pattern for a query, `None` when blank
fn match_pattern(query: &str) -> Option<Regex> {
    let needle = query.trim();
    if needle.is_empty() {
        return None;
    }
    RegexBuilder::new(&regex::escape(needle))
        .case_insensitive(true)
        .build()
        .ok()
}

/// Byte range of the first match within `line`
fn match_span(pattern: &Regex, line: &str) -> Option<(usize, usize)> {
    pattern.find(line).map(|m| (m.start(), m.end()))
}
