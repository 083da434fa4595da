//! Record filtering

use crate::names::is_same_person;
use crate::types::{Record, Source};

/// Filter options for records
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordFilter {
    /// Case-insensitive substring of content or sender
    pub keyword: Option<String>,
    /// Sender name, matched with alias equivalence
    pub sender: Option<String>,
    pub source: Option<Source>,
    /// Inclusive lower bound, epoch millis
    pub date_from: Option<i64>,
    /// Inclusive upper bound, epoch millis
    pub date_to: Option<i64>,
    /// Minimum content length in chars
    pub min_length: Option<usize>,
}

impl RecordFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keyword = Some(keyword.into());
        self
    }

    pub fn with_sender(mut self, sender: impl Into<String>) -> Self {
        self.sender = Some(sender.into());
        self
    }

    pub fn with_source(mut self, source: Source) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_date_range(mut self, from: Option<i64>, to: Option<i64>) -> Self {
        self.date_from = from;
        self.date_to = to;
        self
    }

    pub fn with_min_length(mut self, min_length: usize) -> Self {
        self.min_length = Some(min_length);
        self
    }

    /// True when no criterion is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn matches(&self, record: &Record) -> bool {
        if let Some(source) = self.source {
            if record.source != source {
                return false;
            }
        }
        if self.date_from.is_some_and(|from| record.timestamp < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| record.timestamp > to) {
            return false;
        }
        if let Some(min) = self.min_length {
            if record.meta().message_length < min {
                return false;
            }
        }
        if let Some(sender) = &self.sender {
            if !is_same_person(&record.sender, sender) {
                return false;
            }
        }
        if let Some(keyword) = &self.keyword {
            let needle = keyword.trim().to_lowercase();
            if !needle.is_empty()
                && !record.content().to_lowercase().contains(&needle)
                && !record.sender.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }
}
