//! Error types for the stream-decode core.
//!
//! Only terminal conditions are represented here. Framing anomalies
//! (split/merged records) and decode anomalies (unparseable or unrecognized
//! payloads) are absorbed where they are detected and never become errors.

use thiserror::Error;

/// Terminal stream conditions surfaced to the consumer.
///
/// The four variants are pairwise distinct so the caller can decide whether
/// to retry, show a partial-result warning, or treat the stop as intentional.
/// Partial transcripts remain usable after any of them.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WireError {
    /// Transport-level failure reported by a source adapter.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The source failed mid-stream.
    #[error("Stream error: {0}")]
    Stream(String),

    /// The source closed before a protocol completion marker was seen.
    #[error("stream closed before completion marker")]
    IncompleteStream,

    /// The caller aborted the stream.
    #[error("stream cancelled")]
    Cancelled,
}

impl WireError {
    /// Whether this condition was requested by the caller rather than hit
    /// on the wire.
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}
