//! Format decoders: one per backend model family.
//!
//! Each decoder turns one framed record into zero or more decode signals via
//! an ordered list of shape-match rules, first match wins. Decoders are pure
//! per record and infallible: unparseable text degrades to a raw content
//! event, parsed-but-unrecognized payloads decode to nothing. Adding a new
//! backend never perturbs the existing ones.

mod chat_completions;
mod multiplex;
mod standard;

pub use chat_completions::ChatCompletionsDecoder;
pub use multiplex::MultiplexDecoder;
pub use standard::StandardDecoder;

use crate::event::{DecodeSignal, ProgressStatus, ProgressUpdate, StreamEvent};
use serde_json::Value;
use std::sync::Arc;

pub(crate) const SSE_PREFIX: &str = "data:";
pub(crate) const DONE_MARKER: &str = "[DONE]";

/// Decodes one framed record into zero or more signals.
///
/// Implementations must never panic and never error; a single malformed
/// chunk must not kill an otherwise-healthy multi-minute stream.
pub trait RecordDecoder: Send + Sync {
    fn decode_record(&self, record: &str) -> Vec<DecodeSignal>;
}

/// Backend model families with distinct wire shapes.
///
/// Mirrors the model table the chat surface selects from; `Spark` and
/// `SiliconFlow` share the chat-completions wire shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireFormat {
    /// Plain text deltas with an inline progress channel.
    Standard,
    /// Chat-completions SSE deltas plus custom envelopes.
    Spark,
    /// Same wire shape as `Spark`, served by a different vendor.
    SiliconFlow,
    /// The internally tagged multiplex protocol (`dataType` envelopes).
    Qwen2,
}

impl WireFormat {
    /// Look up a family by its model-table name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "standard" => Some(Self::Standard),
            "spark" => Some(Self::Spark),
            "siliconflow" => Some(Self::SiliconFlow),
            "qwen2" => Some(Self::Qwen2),
            _ => None,
        }
    }

    /// Build the decoder for this family.
    pub fn decoder(self) -> Arc<dyn RecordDecoder> {
        match self {
            Self::Standard => Arc::new(StandardDecoder::new()),
            Self::Spark | Self::SiliconFlow => Arc::new(ChatCompletionsDecoder::new()),
            Self::Qwen2 => Arc::new(MultiplexDecoder::new()),
        }
    }
}

/// Strip an SSE `data:` prefix (with or without a following space) and trim.
/// Returns `None` when the record carries no prefix.
pub(crate) fn strip_sse_prefix(record: &str) -> Option<&str> {
    record.trim().strip_prefix(SSE_PREFIX).map(str::trim)
}

/// The record payload a decoder inspects: the SSE payload when prefixed,
/// otherwise the trimmed record itself.
pub(crate) fn record_payload(record: &str) -> &str {
    strip_sse_prefix(record).unwrap_or_else(|| record.trim())
}

pub(crate) fn non_empty_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key)?.as_str().filter(|s| !s.is_empty())
}

/// Strict progress envelope check. All of `type == "step_progress"`, `step`,
/// `status` and `progressId` must be present and non-empty; `stepName` is
/// required only for the top-level envelope. A partial match is not progress.
pub(crate) fn parse_progress(value: &Value, require_step_name: bool) -> Option<ProgressUpdate> {
    if value.get("type")?.as_str()? != "step_progress" {
        return None;
    }
    let step = non_empty_str(value, "step")?.to_string();
    let step_name = non_empty_str(value, "stepName").map(str::to_string);
    if require_step_name && step_name.is_none() {
        return None;
    }
    let status = match value.get("status")?.as_str()? {
        "start" => ProgressStatus::Start,
        "complete" => ProgressStatus::Complete,
        _ => return None,
    };
    let progress_id = non_empty_str(value, "progressId")?.to_string();
    Some(ProgressUpdate {
        step,
        step_name,
        status,
        progress_id,
    })
}

/// The generic `{messageType, content}` envelope. Matching requires both
/// keys; an empty content still consumes the record (no event is emitted).
pub(crate) fn message_envelope_content(value: &Value) -> Option<String> {
    value.get("messageType")?;
    let content = value.get("content")?;
    Some(content.as_str().unwrap_or_default().to_string())
}

/// The nested `{data: {content}}` envelope.
pub(crate) fn nested_data_content(value: &Value) -> Option<String> {
    let content = value.get("data")?.get("content")?;
    Some(content.as_str().unwrap_or_default().to_string())
}

/// Emit a content event unless the matched content is empty.
pub(crate) fn content_signal(text: String) -> Vec<DecodeSignal> {
    if text.is_empty() {
        Vec::new()
    } else {
        vec![DecodeSignal::Event(StreamEvent::Content { text })]
    }
}
