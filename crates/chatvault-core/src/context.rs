//! Read-only hand-off of stored records to an external text generator

use crate::types::Record;

/// Something that turns a conversation context into generated text
///
/// Implementations live outside this workspace; the core only ever passes them
/// a rendered snapshot and never accepts writes back.
pub trait TextCollaborator {
    type Error;

    fn generate(&self, context: &str) -> Result<String, Self::Error>;
}

/// Render the last `max_messages` records as `[sender]: content` lines
pub fn transcript_context(records: &[Record], max_messages: usize) -> String {
    let start = records.len().saturating_sub(max_messages);
    records[start..]
        .iter()
        .map(|r| format!("[{}]: {}", r.sender, r.content()))
        .collect::<Vec<_>>()
        .join("\n")
}
