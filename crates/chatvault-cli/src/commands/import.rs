//! Import command - ingest export files into the vault

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::{bail, Result};
use chatvault_db::VaultDb;
use chatvault_indexer::{discover_exports, import_paths, IngestOptions};

use crate::cli::{Cli, OutputFormat};
use crate::output::{colors, print_json};

/// Expand directories into their export files; explicit files are kept as given
pub fn expand_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
        } else {
            files.extend(discover_exports(path));
        }
    }
    files.dedup();
    files
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub async fn run(
    cli: &Cli,
    db: &mut VaultDb,
    paths: &[PathBuf],
    chunk_size: usize,
    batch_size: usize,
) -> Result<()> {
    let files = expand_paths(paths);
    if files.is_empty() {
        bail!("No export files found");
    }

    let cancel = Arc::new(AtomicBool::new(false));
    let signal_flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_flag.store(true, Ordering::Relaxed);
        }
    });

    let options = IngestOptions::new()
        .with_chunk_size(chunk_size)
        .with_max_batch(batch_size)
        .with_cancel_flag(cancel);

    let format = cli.effective_format();
    let show_progress = format == OutputFormat::Human && atty::is(atty::Stream::Stderr);
    let mut progress = |path: &Path, pct: u8| {
        if show_progress {
            eprint!("\r  {} {:>3}%", file_label(path), pct);
            if pct == 100 {
                eprintln!();
            }
            let _ = std::io::stderr().flush();
        }
    };

    let report = import_paths(db, &files, &options, &mut progress).await;
    if show_progress && (report.cancelled || !report.failures.is_empty()) {
        eprintln!();
    }

    match format {
        OutputFormat::Human => {
            for file in &report.files {
                println!(
                    "{}",
                    colors::success(&format!(
                        "{}: {} messages in {} conversation(s)",
                        file.name,
                        colors::format_count(file.records_written as i64),
                        file.conversations.len()
                    ))
                );
            }
            for failure in &report.failures {
                println!(
                    "{}",
                    colors::error(&format!("{}: {}", file_label(&failure.path), failure.error))
                );
            }
            if report.cancelled {
                println!("{}", colors::warning("Import cancelled"));
            }
            println!();
            println!(
                "{} {}",
                colors::label("Imported"),
                colors::value(&format!(
                    "{} messages from {} of {} file(s)",
                    colors::format_count(report.total_records() as i64),
                    report.files.len(),
                    files.len()
                ))
            );
        }
        OutputFormat::Json => {
            let output = serde_json::json!({
                "files": report.files.iter().map(|f| serde_json::json!({
                    "name": f.name,
                    "source": f.source,
                    "records": f.records_written,
                    "bytes": f.bytes_read,
                    "conversations": f.conversations,
                })).collect::<Vec<_>>(),
                "failures": report.failures.iter().map(|f| serde_json::json!({
                    "path": f.path.display().to_string(),
                    "error": f.error.to_string(),
                })).collect::<Vec<_>>(),
                "total_records": report.total_records(),
                "cancelled": report.cancelled,
            });
            print_json(&output, cli.pretty)?;
        }
        OutputFormat::Minimal => {
            println!("{}", report.total_records());
        }
    }

    if report.files.is_empty() && !report.failures.is_empty() {
        bail!("All {} file(s) failed to import", report.failures.len());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_expand_paths_mixes_files_and_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("exports");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("a.txt"), "x").unwrap();
        fs::write(dir.join("b.json"), "[]").unwrap();
        fs::write(dir.join("c.png"), "x").unwrap();
        let odd = tmp.path().join("export.dat");
        fs::write(&odd, "01/01/2024, 10:00 - A: b").unwrap();

        let files = expand_paths(&[odd.clone(), dir.clone()]);
        assert_eq!(files, vec![odd, dir.join("a.txt"), dir.join("b.json")]);
    }
}
