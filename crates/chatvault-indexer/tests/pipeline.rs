use std::fs;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use chatvault_core::{classify_lines, Record, Source, TranscriptContext};
use chatvault_db::VaultDb;
use chatvault_indexer::{
    discover_exports, import_paths, ingest, ingest_file, IngestError, IngestOptions, MemorySource,
};

const INGESTED_AT: i64 = 7;

const TRANSCRIPT: &str = "exported by app\r\n\
12/03/2024, 09:15 - Ahmad: صباح الخير 🌅\r\n\
12/03/2024, 09:16 - Léa: Bonjour!\n\
ça va?\n\
\n\
   \n\
[12/03/2024, 9:20:05 PM] Ahmad: 👍🏽 done\n\
trailing line without newline";

fn key(record: &Record) -> (String, i64, String) {
    (record.sender.clone(), record.timestamp, record.content().to_string())
}

fn expected_records(name: &str) -> Vec<(String, i64, String)> {
    let ctx = TranscriptContext {
        conversation_id: format!("file_{}_{}", name, INGESTED_AT),
        title: name.to_string(),
        ingested_at: INGESTED_AT,
    };
    classify_lines(TRANSCRIPT.lines(), ctx).iter().map(key).collect()
}

async fn ingest_with_chunk_size(chunk_size: usize) -> Vec<(String, i64, String)> {
    let mut db = VaultDb::open_in_memory().unwrap();
    let mut source = MemorySource::new("chat.txt", TRANSCRIPT);
    let options = IngestOptions::new()
        .with_chunk_size(chunk_size)
        .with_max_batch(2)
        .with_ingested_at(INGESTED_AT);
    ingest(&mut db, &mut source, Source::Transcript, &options, &mut |_| {})
        .await
        .unwrap();
    db.records_for_conversation(&format!("file_chat.txt_{}", INGESTED_AT))
        .unwrap()
        .iter()
        .map(key)
        .collect()
}

#[tokio::test]
async fn test_chunk_size_independence() {
    let expected = expected_records("chat.txt");
    assert_eq!(expected.len(), 4);
    assert_eq!(expected[0].0, "User");
    assert_eq!(expected[2].2, "Bonjour!\nça va?");
    assert_eq!(expected[3].2, "👍🏽 done\ntrailing line without newline");

    for chunk_size in [1, 2, 3, 5, 7, 13, 64, 4096] {
        let got = ingest_with_chunk_size(chunk_size).await;
        assert_eq!(got, expected, "chunk size {}", chunk_size);
    }
}

#[tokio::test]
async fn test_multibyte_character_on_every_boundary() {
    // 4-byte emoji at every offset relative to a 4-byte chunk
    for pad in 0..4 {
        let text = format!("01/01/2024, 10:00 - A: {}🎉x", "a".repeat(pad));
        let mut db = VaultDb::open_in_memory().unwrap();
        let mut source = MemorySource::new("e.txt", text.clone());
        let options = IngestOptions::new().with_chunk_size(4).with_ingested_at(1);
        ingest(&mut db, &mut source, Source::Transcript, &options, &mut |_| {})
            .await
            .unwrap();
        let records = db.records_for_conversation("file_e.txt_1").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].content(), format!("{}🎉x", "a".repeat(pad)));
        assert!(!records[0].content().contains('\u{FFFD}'));
    }
}

#[tokio::test]
async fn test_progress_is_monotonic_and_ends_at_100() {
    for chunk_size in [1, 9, 100, 1 << 20] {
        let mut db = VaultDb::open_in_memory().unwrap();
        let mut source = MemorySource::new("chat.txt", TRANSCRIPT);
        let options = IngestOptions::new().with_chunk_size(chunk_size);
        let mut seen = Vec::new();
        ingest(&mut db, &mut source, Source::Transcript, &options, &mut |p| seen.push(p))
            .await
            .unwrap();

        assert_eq!(seen.first(), Some(&0));
        assert_eq!(seen.last(), Some(&100));
        assert!(seen.windows(2).all(|w| w[0] <= w[1]), "{:?}", seen);
        assert_eq!(seen.iter().filter(|p| **p == 100).count(), 1);
    }
}

#[tokio::test]
async fn test_ten_megabytes_in_one_megabyte_chunks() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("large.txt");

    let target = 10 * 1024 * 1024;
    let line = "continuation line with some words in it\n";
    let mut text = String::with_capacity(target + line.len());
    text.push_str("01/01/2024, 10:00 - Alice: start\n");
    while text.len() < target {
        text.push_str(line);
    }
    fs::write(&path, &text).unwrap();

    let mut db = VaultDb::open_in_memory().unwrap();
    let options = IngestOptions::new().with_chunk_size(1024 * 1024);
    let mut seen = Vec::new();
    let result = ingest_file(&mut db, &path, &options, &mut |p| seen.push(p))
        .await
        .unwrap();

    assert_eq!(result.bytes_read, text.len() as u64);
    assert_eq!(result.records_written, 1);
    assert_eq!(seen.last(), Some(&100));
    assert!(seen.windows(2).all(|w| w[0] <= w[1]));
    // One report per chunk plus start and finish
    assert!(seen.len() >= 10, "{:?}", seen);

    let records = db.all_records().unwrap();
    assert_eq!(records[0].meta().message_length, text.trim_end().chars().count() - 27);
}

#[tokio::test]
async fn test_two_speaker_file_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("greetings.txt");
    fs::write(
        &path,
        "01/01/2024, 10:00 - Alice: Hello\n01/01/2024, 10:01 - Bob: Hi Alice\nHow are you?",
    )
    .unwrap();

    let mut db = VaultDb::open_in_memory().unwrap();
    let options = IngestOptions::new().with_chunk_size(16).with_ingested_at(5);
    let result = ingest_file(&mut db, &path, &options, &mut |_| {}).await.unwrap();
    assert_eq!(result.source, Some(Source::Transcript));
    assert_eq!(result.records_written, 2);

    let records = db.records_for_conversation("file_greetings.txt_5").unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[1].sender, "Bob");
    assert_eq!(records[1].content(), "Hi Alice\nHow are you?");
    assert!(records[1].meta().has_question);
    assert_eq!(records[1].meta().word_count, 5);

    let summary = db.get_summary("file_greetings.txt_5").unwrap().unwrap();
    assert_eq!(summary.message_count, 2);
    assert_eq!(summary.last_message_timestamp, records[1].timestamp);
    assert_eq!(summary.participants, vec!["Alice".to_string(), "Bob".to_string()]);
}

#[tokio::test]
async fn test_byte_order_mark_on_transcript() {
    let text = "\u{FEFF}01/01/2024, 10:00 - Alice: Hello\nsecond line\n01/01/2024, 10:01 - Bob: Hi";
    for chunk_size in [1, 2, 3, 64] {
        let mut db = VaultDb::open_in_memory().unwrap();
        let mut source = MemorySource::new("bom.txt", text);
        let options = IngestOptions::new()
            .with_chunk_size(chunk_size)
            .with_ingested_at(3);
        ingest(&mut db, &mut source, Source::Transcript, &options, &mut |_| {})
            .await
            .unwrap();

        let records = db.records_for_conversation("file_bom.txt_3").unwrap();
        assert_eq!(records.len(), 2, "chunk size {}", chunk_size);
        assert_eq!(records[0].sender, "Alice");
        assert_eq!(records[0].content(), "Hello\nsecond line");
        assert_eq!(records[1].sender, "Bob");
    }
}

#[tokio::test]
async fn test_byte_order_mark_on_json_thread() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bom.json");
    fs::write(&path, "\u{FEFF}[{\"text\": \"hi\", \"sender\": \"Sam\"}]").unwrap();

    let mut db = VaultDb::open_in_memory().unwrap();
    let options = IngestOptions::new().with_chunk_size(2);
    let result = ingest_file(&mut db, &path, &options, &mut |_| {})
        .await
        .unwrap();

    assert_eq!(result.source, Some(Source::Thread));
    assert_eq!(result.records_written, 1);
    let records = db.all_records().unwrap();
    assert_eq!(records[0].sender, "Sam");
    assert_eq!(records[0].content(), "hi");
}

fn write_mixed_exports(dir: &std::path::Path) -> Vec<PathBuf> {
    fs::write(
        dir.join("a_chat.txt"),
        "01/01/2024, 10:00 - Alice: Hello\n01/01/2024, 10:01 - Bob: Hi\n",
    )
    .unwrap();
    fs::write(dir.join("b_broken.json"), "{\"messages\": [ {").unwrap();
    fs::write(
        dir.join("c_page.html"),
        "<html><body><div class=\"message\"><b>You</b> hi there</div>\
         <div class=\"message\"><b>ChatGPT</b> hello!</div></body></html>",
    )
    .unwrap();
    fs::write(
        dir.join("d_thread.json"),
        r#"{"thread_path": "inbox/ann_1", "title": "Ann", "messages": [
            {"sender_name": "Ann", "timestamp_ms": 20, "content": "later"},
            {"sender_name": "Me", "timestamp_ms": 10, "content": "earlier"}
        ]}"#,
    )
    .unwrap();
    fs::write(dir.join("notes.md"), "not an export").unwrap();
    discover_exports(dir)
}

#[tokio::test]
async fn test_import_isolates_failing_files() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_mixed_exports(dir.path());
    assert_eq!(paths.len(), 4);

    let mut db = VaultDb::open_in_memory().unwrap();
    let mut finished = Vec::new();
    let report = import_paths(&mut db, &paths, &IngestOptions::new(), &mut |path, pct| {
        if pct == 100 {
            finished.push(path.to_path_buf());
        }
    })
    .await;

    assert!(!report.cancelled);
    assert_eq!(report.files.len(), 3);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].path.ends_with("b_broken.json"));
    assert!(matches!(report.failures[0].error, IngestError::Json(_)));
    assert_eq!(report.total_records(), 6);
    assert_eq!(finished.len(), 3);

    let thread = db.records_for_conversation("inbox/ann_1").unwrap();
    assert_eq!(thread[0].content(), "earlier");

    let stats = db.stats().unwrap();
    assert_eq!(stats.record_count, 6);
    assert_eq!(stats.conversation_count, 3);
    assert!(stats.last_import.is_some());
}

#[tokio::test]
async fn test_summaries_match_records_after_import() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_mixed_exports(dir.path());
    let mut db = VaultDb::open_in_memory().unwrap();
    let options = IngestOptions::new().with_max_batch(1).with_chunk_size(11);
    import_paths(&mut db, &paths, &options, &mut |_, _| {}).await;

    let records = db.all_records().unwrap();
    for summary in db.list_summaries().unwrap() {
        let own: Vec<_> = records
            .iter()
            .filter(|r| r.conversation_id == summary.id)
            .collect();
        assert_eq!(summary.message_count, own.len() as i64, "{}", summary.id);
        assert_eq!(
            summary.last_message_timestamp,
            own.iter().map(|r| r.timestamp).max().unwrap()
        );
    }
}

#[tokio::test]
async fn test_cancelled_import_stops_early() {
    let dir = tempfile::tempdir().unwrap();
    let paths = write_mixed_exports(dir.path());
    let mut db = VaultDb::open_in_memory().unwrap();
    let options = IngestOptions::new().with_cancel_flag(Arc::new(AtomicBool::new(true)));

    let report = import_paths(&mut db, &paths, &options, &mut |_, _| {}).await;
    assert!(report.cancelled);
    assert!(report.files.is_empty());
    assert!(report.failures.is_empty());
    assert_eq!(db.stats().unwrap().record_count, 0);
    assert!(db.stats().unwrap().last_import.is_none());
}

#[tokio::test]
async fn test_reimport_with_stable_ids_keeps_counts() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dump.json");
    fs::write(
        &path,
        r#"[{"id": "conv-1", "title": "Colours", "mapping": {
            "a": {"message": {"id": "m1", "author": {"role": "user"},
                  "create_time": 100.5, "content": {"parts": ["Name a colour"]}}},
            "b": {"message": {"id": "m2", "author": {"role": "assistant"},
                  "create_time": 101.0, "content": {"parts": ["Teal"]}}}
        }}]"#,
    )
    .unwrap();

    let mut db = VaultDb::open_in_memory().unwrap();
    for _ in 0..2 {
        ingest_file(&mut db, &path, &IngestOptions::new(), &mut |_| {})
            .await
            .unwrap();
    }

    let summary = db.get_summary("conv-1").unwrap().unwrap();
    assert_eq!(summary.message_count, 2);
    assert_eq!(summary.last_message_timestamp, 101_000);
    assert_eq!(summary.title, "Colours");
}
