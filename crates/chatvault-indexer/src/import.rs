//! Multi-file import with per-file failure isolation

use std::path::{Path, PathBuf};

use chatvault_db::VaultDb;
use tracing::{info, warn};

use crate::ingest::{ingest_file, IngestError, IngestOptions, IngestResult};

/// A file that could not be ingested
#[derive(Debug)]
pub struct ImportFailure {
    pub path: PathBuf,
    pub error: IngestError,
}

/// Outcome of importing a set of files
#[derive(Debug, Default)]
pub struct ImportReport {
    pub files: Vec<IngestResult>,
    pub failures: Vec<ImportFailure>,
    /// Set when the cancellation flag stopped the run early
    pub cancelled: bool,
}

impl ImportReport {
    pub fn total_records(&self) -> usize {
        self.files.iter().map(|f| f.records_written).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && !self.cancelled
    }
}

/// Ingest `paths` one after another
///
/// A file that fails is logged and recorded in [`ImportReport::failures`];
/// the remaining files still run. Cancellation ends the whole run. `progress`
/// receives the file being ingested and its percentage.
pub async fn import_paths(
    db: &mut VaultDb,
    paths: &[PathBuf],
    options: &IngestOptions,
    progress: &mut dyn FnMut(&Path, u8),
) -> ImportReport {
    let mut report = ImportReport::default();

    for path in paths {
        let mut on_progress = |pct: u8| progress(path, pct);
        match ingest_file(db, path, options, &mut on_progress).await {
            Ok(result) => report.files.push(result),
            Err(IngestError::Cancelled) => {
                info!(path = %path.display(), "import cancelled");
                report.cancelled = true;
                break;
            }
            Err(error) => {
                warn!(path = %path.display(), error = %error, "failed to import file");
                report.failures.push(ImportFailure {
                    path: path.clone(),
                    error,
                });
            }
        }
    }

    if !report.files.is_empty() {
        if let Err(e) = db.touch_last_import() {
            warn!(error = %e, "failed to record import time");
        }
    }

    info!(
        files = report.files.len(),
        failures = report.failures.len(),
        records = report.total_records(),
        "import finished"
    );
    report
}
