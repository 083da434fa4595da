//! Incremental UTF-8 decoding and line reassembly across chunk boundaries
//!
//! [`LineAssembler`] is fed raw byte chunks in order and hands back every line
//! completed so far. A multi-byte character split across two chunks is held
//! until its remaining bytes arrive, and the trailing partial line (the
//! "leftover") is carried into the next chunk instead of being emitted.

/// Streaming UTF-8 decoder that keeps incomplete trailing sequences between calls
///
/// Invalid sequences are replaced with U+FFFD, the same way
/// [`String::from_utf8_lossy`] does for the whole input, so output never depends
/// on where chunk boundaries fall. A leading byte-order mark is dropped.
#[derive(Debug, Default)]
pub struct Utf8StreamDecoder {
    pending: Vec<u8>,
    started: bool,
}

impl Utf8StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the next chunk. With `last == true` any dangling bytes are flushed
    /// as a replacement character.
    pub fn decode(&mut self, chunk: &[u8], last: bool) -> String {
        let mut bytes = std::mem::take(&mut self.pending);
        bytes.extend_from_slice(chunk);

        let mut out = String::with_capacity(bytes.len());
        let mut rest: &[u8] = &bytes;
        loop {
            match std::str::from_utf8(rest) {
                Ok(valid) => {
                    out.push_str(valid);
                    break;
                }
                Err(e) => {
                    let (valid, after) = rest.split_at(e.valid_up_to());
                    out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                    match e.error_len() {
                        Some(len) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            rest = &after[len..];
                        }
                        None => {
                            // Truncated sequence at the end of the buffer
                            if last {
                                out.push(char::REPLACEMENT_CHARACTER);
                            } else {
                                self.pending = after.to_vec();
                            }
                            break;
                        }
                    }
                }
            }
        }
        if !self.started && !out.is_empty() {
            self.started = true;
            if let Some(rest) = out.strip_prefix(BOM) {
                return rest.to_string();
            }
        }
        out
    }
}

const BOM: char = '\u{FEFF}';

/// Reassembles logical lines from a stream of byte chunks
#[derive(Debug, Default)]
pub struct LineAssembler {
    decoder: Utf8StreamDecoder,
    leftover: String,
}

impl LineAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk, returning every line it completes.
    ///
    /// Both `\n` and `\r\n` terminate a line; terminators are not included.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let decoded = self.decoder.decode(chunk, false);
        let mut text = std::mem::take(&mut self.leftover);
        text.push_str(&decoded);

        let mut lines: Vec<String> = text.split('\n').map(strip_cr).collect();
        // The final element is either empty or an unterminated line
        self.leftover = lines.pop().unwrap_or_default();
        lines
    }

    /// Signal end of input, returning the unterminated final line if any
    pub fn finish(&mut self) -> Option<String> {
        let tail = self.decoder.decode(&[], true);
        let mut last = std::mem::take(&mut self.leftover);
        last.push_str(&tail);
        let last = strip_cr(&last);
        if last.is_empty() {
            None
        } else {
            Some(last)
        }
    }

    /// The partial line currently carried between chunks
    pub fn leftover(&self) -> &str {
        &self.leftover
    }
}

fn strip_cr(line: &str) -> String {
    line.strip_suffix('\r').unwrap_or(line).to_string()
}

/// Progress after `consumed` of `total` bytes, held below 100 until completion
pub fn chunk_progress(consumed: u64, total: u64) -> u8 {
    if total == 0 {
        return 99;
    }
    let pct = (consumed.min(total) as f64 / total as f64 * 100.0).round() as u8;
    pct.min(99)
}

/// Decode and split a complete buffer in one pass
pub fn split_lines(bytes: &[u8]) -> Vec<String> {
    let mut assembler = LineAssembler::new();
    let mut lines = assembler.push(bytes);
    lines.extend(assembler.finish());
    lines
}
