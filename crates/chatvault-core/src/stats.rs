//! Corpus analytics over a snapshot of records

use std::collections::{BTreeMap, HashMap};

use serde::Serialize;

use crate::types::Record;

const TOP_WORDS: usize = 10;
const MIN_WORD_CHARS: usize = 4;

/// A label with its occurrence count
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Count {
    pub label: String,
    pub count: usize,
}

/// Aggregate statistics for a set of records
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CorpusStats {
    pub total_messages: usize,
    pub total_words: usize,
    /// Messages per UTC day (`YYYY-MM-DD`), oldest first
    pub per_day: Vec<Count>,
    /// Messages per sender, most active first
    pub per_sender: Vec<Count>,
    pub top_words: Vec<Count>,
    pub questions: usize,
    pub exclamations: usize,
}

fn day_key(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp)
        .map(|dt| dt.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

/// Sort by count descending, then label ascending
fn ranked(counts: HashMap<String, usize>) -> Vec<Count> {
    let mut out: Vec<Count> = counts
        .into_iter()
        .map(|(label, count)| Count { label, count })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.label.cmp(&b.label)));
    out
}

impl CorpusStats {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a Record>) -> Self {
        let mut stats = CorpusStats::default();
        let mut per_day: BTreeMap<String, usize> = BTreeMap::new();
        let mut per_sender: HashMap<String, usize> = HashMap::new();
        let mut words: HashMap<String, usize> = HashMap::new();

        for record in records {
            let meta = record.meta();
            stats.total_messages += 1;
            stats.total_words += meta.word_count;
            if meta.has_question {
                stats.questions += 1;
            }
            if meta.has_exclamation {
                stats.exclamations += 1;
            }
            *per_day.entry(day_key(record.timestamp)).or_insert(0) += 1;
            *per_sender.entry(record.sender.clone()).or_insert(0) += 1;

            for word in record.content().to_lowercase().split_whitespace() {
                if word.chars().count() >= MIN_WORD_CHARS {
                    *words.entry(word.to_string()).or_insert(0) += 1;
                }
            }
        }

        stats.per_day = per_day
            .into_iter()
            .map(|(label, count)| Count { label, count })
            .collect();
        stats.per_sender = ranked(per_sender);
        stats.top_words = ranked(words);
        stats.top_words.truncate(TOP_WORDS);
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Direction, Source};

    fn rec(sender: &str, ts: i64, content: &str) -> Record {
        Record::new("x", Source::Transcript, "c", "t", ts, sender, Direction::Received, content)
    }

    #[test]
    fn test_from_records() {
        let day = 86_400_000;
        let records = vec![
            rec("Ann", day, "hello there friend"),
            rec("Ben", 0, "Hello again?"),
            rec("Ann", day + 5, "hello!"),
        ];
        let stats = CorpusStats::from_records(&records);
        assert_eq!(stats.total_messages, 3);
        assert_eq!(stats.total_words, 6);
        assert_eq!(stats.questions, 1);
        assert_eq!(stats.exclamations, 1);
        assert_eq!(stats.per_day[0], Count { label: "1970-01-01".into(), count: 1 });
        assert_eq!(stats.per_day[1].count, 2);
        assert_eq!(stats.per_sender[0], Count { label: "Ann".into(), count: 2 });
        assert_eq!(stats.top_words[0], Count { label: "hello".into(), count: 2 });
    }

    #[test]
    fn test_empty() {
        let stats = CorpusStats::from_records(&Vec::<Record>::new());
        assert_eq!(stats, CorpusStats::default());
    }
}
