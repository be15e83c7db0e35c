//! Record framing: splits an unbounded text stream into logical records.
//!
//! Records arrive split across read boundaries or concatenated within one
//! read; the framer buffers until complete records exist. Three buffer states
//! are recognized:
//!
//! - an SSE-style stream (`data:` prefix): split on the delimiter, keep the
//!   trailing remainder buffered,
//! - a complete bare JSON document: one record, flushed immediately,
//! - anything else: the accumulated text passes through opaquely, for
//!   formats that emit one complete payload per chunk.
//!
//! The JSON probe runs on the whole buffer before any delimiter split, so a
//! delimiter character inside JSON string content never mis-splits a record.

const SSE_PREFIX: &str = "data:";

/// Splits continuously arriving text into complete records on a delimiter.
#[derive(Debug)]
pub struct RecordFramer {
    delimiter: String,
    buffer: String,
}

impl RecordFramer {
    pub fn new(delimiter: impl Into<String>) -> Self {
        Self {
            delimiter: delimiter.into(),
            buffer: String::new(),
        }
    }

    /// The default newline-delimited framer.
    pub fn with_newline() -> Self {
        Self::new("\n")
    }

    /// Append one chunk and return every record it completes, in order.
    pub fn push(&mut self, chunk: &str) -> Vec<String> {
        self.buffer.push_str(chunk);

        let head = self.buffer.trim_start();
        if head.starts_with(SSE_PREFIX) {
            return self.split_complete();
        }
        if !head.is_empty() && SSE_PREFIX.starts_with(head) {
            // Could still become an SSE prefix once more bytes arrive.
            return Vec::new();
        }

        if serde_json::from_str::<serde_json::Value>(self.buffer.trim()).is_ok() {
            // One complete document; flush rather than waiting for a delimiter.
            let record = std::mem::take(&mut self.buffer);
            return vec![record.trim().to_string()];
        }

        // Opaque pass-through: the accumulated text is one record. Outside
        // the carry-over cases the buffer is exactly the incoming chunk.
        let record = std::mem::take(&mut self.buffer);
        if record.trim().is_empty() {
            Vec::new()
        } else {
            vec![record]
        }
    }

    /// End-of-stream flush: a non-whitespace remainder is the final record.
    pub fn finish(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        if rest.trim().is_empty() { None } else { Some(rest) }
    }

    fn split_complete(&mut self) -> Vec<String> {
        let mut parts: Vec<String> = self
            .buffer
            .split(&self.delimiter)
            .map(str::to_string)
            .collect();
        // The final part has no terminating delimiter yet; keep it buffered.
        self.buffer = parts.pop().unwrap_or_default();
        parts.retain(|part| !part.trim().is_empty());
        parts
    }
}
