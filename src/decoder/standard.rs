//! Decoder for the plain-text model family.
//!
//! The wire carries raw token text; the only structured payload is the
//! inline progress channel. Anything that is not a strict progress envelope
//! renders verbatim.

use super::{DONE_MARKER, RecordDecoder, content_signal, parse_progress, record_payload};
use crate::event::{DecodeSignal, StreamEvent};

#[derive(Debug, Clone, Default)]
pub struct StandardDecoder;

impl StandardDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl RecordDecoder for StandardDecoder {
    fn decode_record(&self, record: &str) -> Vec<DecodeSignal> {
        let payload = record_payload(record);
        if payload == DONE_MARKER {
            return vec![DecodeSignal::Event(StreamEvent::Done)];
        }

        if let Ok(value) = serde_json::from_str::<serde_json::Value>(payload)
            && let Some(progress) = parse_progress(&value, true)
        {
            return vec![DecodeSignal::Event(StreamEvent::Progress(progress))];
        }

        // Raw token text, progress-shaped or not: render as-is.
        content_signal(payload.to_string())
    }
}
