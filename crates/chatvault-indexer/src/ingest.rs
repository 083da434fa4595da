//! Streaming ingestion of one export resource
//!
//! The resource is read in fixed-size byte ranges. After each range the loop
//! yields to the tokio scheduler and checks the cancellation flag, so a long
//! import never monopolizes the runtime. Transcripts are classified line by
//! line as chunks arrive; JSON threads and markup archives are materialized
//! first because their structure spans the whole document.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chatvault_core::{
    chunk_progress, detect_source, parse_thread_json, ConversationExtractor, ExtractContext,
    LineAssembler, Record, Source, StructuredExtractor, ThreadContext, TranscriptClassifier,
    TranscriptContext, Utf8StreamDecoder,
};
use chatvault_db::{DbError, VaultDb};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::html::parse_markup;
use crate::source::{ByteSource, FileSource};

/// Ingestion errors
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Ingestion cancelled")]
    Cancelled,
}

/// Default bytes per read
pub const DEFAULT_CHUNK_SIZE: usize = 1024 * 1024;
/// Default records per write transaction
pub const DEFAULT_MAX_BATCH: usize = 500;
/// Bytes sniffed for format detection
const SNIFF_LEN: usize = 512;

/// Tuning and control for one ingestion call
#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub chunk_size: usize,
    pub max_batch: usize,
    /// Checked at every chunk boundary
    pub cancel: Option<Arc<AtomicBool>>,
    /// Override for the ingestion clock (epoch millis)
    pub ingested_at: Option<i64>,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_batch: DEFAULT_MAX_BATCH,
            cancel: None,
            ingested_at: None,
        }
    }
}

impl IngestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn with_max_batch(mut self, max_batch: usize) -> Self {
        self.max_batch = max_batch.max(1);
        self
    }

    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn with_ingested_at(mut self, millis: i64) -> Self {
        self.ingested_at = Some(millis);
        self
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn chunk_len(&self) -> usize {
        self.chunk_size.max(1)
    }

    fn batch_len(&self) -> usize {
        self.max_batch.max(1)
    }

    fn now(&self) -> i64 {
        self.ingested_at
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis())
    }
}

/// Result of ingesting a single resource
#[derive(Debug, Clone, Default)]
pub struct IngestResult {
    pub name: String,
    pub source: Option<Source>,
    pub records_written: usize,
    pub bytes_read: u64,
    /// Conversation ids that received records
    pub conversations: Vec<String>,
}

/// Forwards progress values, dropping any that would go backwards
struct ProgressTracker<'a> {
    last: Option<u8>,
    callback: &'a mut dyn FnMut(u8),
}

impl<'a> ProgressTracker<'a> {
    fn new(callback: &'a mut dyn FnMut(u8)) -> Self {
        Self {
            last: None,
            callback,
        }
    }

    fn report(&mut self, value: u8) {
        let value = value.min(100);
        if self.last.map_or(true, |last| value > last) {
            self.last = Some(value);
            (self.callback)(value);
        }
    }

    fn complete(&mut self) {
        self.report(100);
    }
}

/// Accumulates written-record bookkeeping
#[derive(Default)]
struct Writer {
    records_written: usize,
    conversations: BTreeSet<String>,
}

impl Writer {
    fn write(&mut self, db: &mut VaultDb, batch: &[Record]) -> Result<(), IngestError> {
        if batch.is_empty() {
            return Ok(());
        }
        db.write_batch(batch)?;
        self.records_written += batch.len();
        self.conversations
            .extend(batch.iter().map(|r| r.conversation_id.clone()));
        Ok(())
    }
}

/// Read the resource chunk by chunk, yielding after each one
///
/// `on_chunk` receives the bytes plus the consumed and total byte counts.
async fn read_chunks<S, F>(
    source: &mut S,
    options: &IngestOptions,
    mut on_chunk: F,
) -> Result<u64, IngestError>
where
    S: ByteSource + ?Sized,
    F: FnMut(&[u8], u64, u64) -> Result<(), IngestError>,
{
    let total = source.size();
    let mut offset: u64 = 0;

    while offset < total {
        if options.is_cancelled() {
            return Err(IngestError::Cancelled);
        }
        let want = options.chunk_len().min((total - offset) as usize);
        let bytes = source.read_range(offset, want)?;
        if bytes.is_empty() {
            // Resource shrank while reading
            break;
        }
        offset += bytes.len() as u64;
        on_chunk(&bytes, offset, total)?;
        debug!(name = source.name(), offset, total, "processed chunk");
        tokio::task::yield_now().await;
    }
    Ok(offset)
}

/// Ingest a resource of the given kind
///
/// Progress values are non-decreasing and end at 100 on success. All batches
/// of one resource are staged in a single transaction: on error or
/// cancellation nothing from the resource is kept.
pub async fn ingest<S>(
    db: &mut VaultDb,
    source: &mut S,
    kind: Source,
    options: &IngestOptions,
    progress: &mut dyn FnMut(u8),
) -> Result<IngestResult, IngestError>
where
    S: ByteSource + ?Sized,
{
    let mut tracker = ProgressTracker::new(progress);
    tracker.report(0);

    let name = source.name().to_string();
    db.begin_staged()?;
    let staged = match kind {
        Source::Transcript => ingest_transcript(db, source, options, &mut tracker).await,
        Source::Thread => ingest_thread(db, source, options, &mut tracker).await,
        Source::Markup => ingest_markup(db, source, options, &mut tracker).await,
    };
    let (bytes_read, writer) = match staged.and_then(|done| {
        db.commit_staged()?;
        Ok(done)
    }) {
        Ok(done) => done,
        Err(e) => {
            if let Err(rollback) = db.rollback_staged() {
                warn!(name = %name, error = %rollback, "failed to roll back partial import");
            }
            debug!(name = %name, error = %e, "discarded partial import");
            return Err(e);
        }
    };
    tracker.complete();

    info!(
        name = %name,
        kind = %kind,
        records = writer.records_written,
        bytes = bytes_read,
        "ingested resource"
    );

    Ok(IngestResult {
        name,
        source: Some(kind),
        records_written: writer.records_written,
        bytes_read,
        conversations: writer.conversations.into_iter().collect(),
    })
}

/// Detect the kind of a local file and ingest it
pub async fn ingest_file(
    db: &mut VaultDb,
    path: &Path,
    options: &IngestOptions,
    progress: &mut dyn FnMut(u8),
) -> Result<IngestResult, IngestError> {
    let mut source = FileSource::open(path)?;
    let head = source.read_range(0, SNIFF_LEN)?;
    let kind = detect_source(source.name(), &head);
    debug!(path = %path.display(), kind = %kind, "detected export kind");
    ingest(db, &mut source, kind, options, progress).await
}

async fn ingest_transcript<S>(
    db: &mut VaultDb,
    source: &mut S,
    options: &IngestOptions,
    tracker: &mut ProgressTracker<'_>,
) -> Result<(u64, Writer), IngestError>
where
    S: ByteSource + ?Sized,
{
    let now = options.now();
    let ctx = TranscriptContext {
        conversation_id: format!("file_{}_{}", source.name(), now),
        title: source.name().to_string(),
        ingested_at: now,
    };
    let mut assembler = LineAssembler::new();
    let mut classifier = TranscriptClassifier::new(ctx);
    let mut writer = Writer::default();
    let batch_len = options.batch_len();

    let bytes_read = read_chunks(source, options, |bytes, consumed, total| {
        for line in assembler.push(bytes) {
            classifier.feed(&line);
            if classifier.pending_len() >= batch_len {
                writer.write(db, &classifier.take_batch())?;
            }
        }
        writer.write(db, &classifier.take_batch())?;
        tracker.report(chunk_progress(consumed, total));
        Ok(())
    })
    .await?;

    if let Some(last) = assembler.finish() {
        classifier.feed(&last);
    }
    for batch in classifier.finish().chunks(batch_len) {
        writer.write(db, batch)?;
    }
    Ok((bytes_read, writer))
}

/// Decode the whole resource, reporting read progress scaled into `0..=ceiling`
async fn read_text<S>(
    source: &mut S,
    options: &IngestOptions,
    tracker: &mut ProgressTracker<'_>,
    ceiling: u8,
) -> Result<(u64, String), IngestError>
where
    S: ByteSource + ?Sized,
{
    let mut decoder = Utf8StreamDecoder::new();
    let mut text = String::new();
    let bytes_read = read_chunks(source, options, |bytes, consumed, total| {
        text.push_str(&decoder.decode(bytes, false));
        let pct = chunk_progress(consumed, total) as u32 * ceiling as u32 / 99;
        tracker.report(pct as u8);
        Ok(())
    })
    .await?;
    text.push_str(&decoder.decode(&[], true));
    Ok((bytes_read, text))
}

/// Write records in batches, reporting progress in `floor..=99`
async fn write_batched(
    db: &mut VaultDb,
    records: &[Record],
    options: &IngestOptions,
    tracker: &mut ProgressTracker<'_>,
    floor: u8,
) -> Result<Writer, IngestError> {
    let mut writer = Writer::default();
    let total = records.len().max(1);
    let span = 99u32.saturating_sub(floor as u32);
    for batch in records.chunks(options.batch_len()) {
        if options.is_cancelled() {
            return Err(IngestError::Cancelled);
        }
        writer.write(db, batch)?;
        let done = writer.records_written as u32 * span / total as u32;
        tracker.report(floor + done as u8);
        tokio::task::yield_now().await;
    }
    Ok(writer)
}

async fn ingest_thread<S>(
    db: &mut VaultDb,
    source: &mut S,
    options: &IngestOptions,
    tracker: &mut ProgressTracker<'_>,
) -> Result<(u64, Writer), IngestError>
where
    S: ByteSource + ?Sized,
{
    let (bytes_read, text) = read_text(source, options, tracker, 50).await?;
    let ctx = ThreadContext {
        file_name: source.name().to_string(),
        ingested_at: options.now(),
    };
    let records = parse_thread_json(&text, &ctx)?;
    debug!(name = source.name(), records = records.len(), "parsed thread export");
    let writer = write_batched(db, &records, options, tracker, 50).await?;
    Ok((bytes_read, writer))
}

async fn ingest_markup<S>(
    db: &mut VaultDb,
    source: &mut S,
    options: &IngestOptions,
    tracker: &mut ProgressTracker<'_>,
) -> Result<(u64, Writer), IngestError>
where
    S: ByteSource + ?Sized,
{
    let (bytes_read, text) = read_text(source, options, tracker, 50).await?;
    let now = options.now();
    let ctx = ExtractContext {
        conversation_id: format!("html_{}_{}", source.name(), now),
        title: source.name().to_string(),
        ingested_at: now,
    };
    let root = parse_markup(&text);
    let records = ConversationExtractor.extract(&root, &ctx);
    debug!(name = source.name(), records = records.len(), "extracted markup records");
    let writer = write_batched(db, &records, options, tracker, 50).await?;
    Ok((bytes_read, writer))
}
