//! Decoder for the chat-completions model family (spark, siliconflow).
//!
//! These backends interleave vendor chat-completion deltas with the custom
//! `{messageType, content}` and progress envelopes, all behind SSE framing.

use super::{
    DONE_MARKER, RecordDecoder, content_signal, message_envelope_content, nested_data_content,
    parse_progress, record_payload,
};
use crate::event::{DecodeSignal, StreamEvent};
use serde_json::Value;

#[derive(Debug, Clone, Default)]
pub struct ChatCompletionsDecoder;

impl ChatCompletionsDecoder {
    pub fn new() -> Self {
        Self
    }

    /// The `{choices: [{delta: {content}}]}` chat-completion delta. Matching
    /// requires the delta object; a missing content consumes the record
    /// without emitting.
    fn delta_content(value: &Value) -> Option<String> {
        let delta = value.get("choices")?.get(0)?.get("delta")?;
        Some(
            delta
                .get("content")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
        )
    }
}

impl RecordDecoder for ChatCompletionsDecoder {
    fn decode_record(&self, record: &str) -> Vec<DecodeSignal> {
        let payload = record_payload(record);
        if payload == DONE_MARKER {
            return vec![DecodeSignal::Event(StreamEvent::Done)];
        }

        let value: Value = match serde_json::from_str(payload) {
            Ok(value) => value,
            // Best-effort fallback: render unparseable records verbatim.
            Err(_) => return content_signal(payload.to_string()),
        };

        if let Some(content) = message_envelope_content(&value) {
            return content_signal(content);
        }
        if let Some(progress) = parse_progress(&value, true) {
            return vec![DecodeSignal::Event(StreamEvent::Progress(progress))];
        }
        if let Some(content) = nested_data_content(&value) {
            return content_signal(content);
        }
        if let Some(content) = Self::delta_content(&value) {
            return content_signal(content);
        }

        // Parsed but unrecognized: bookkeeping payload, nothing to render.
        Vec::new()
    }
}
