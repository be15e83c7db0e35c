//! Normalized streaming event types.
//!
//! Every backend wire shape decodes into the same small event algebra so the
//! rendering layer never sees provider-specific envelopes.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Lifecycle of a long-running backend step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressStatus {
    Start,
    Complete,
}

/// Milestone notification for a long-running backend operation.
///
/// The wire envelope is only accepted as progress when `step`, `status` and
/// `progress_id` are all present and non-empty; the top-level envelope also
/// requires `step_name`, while the nested multiplex form may omit it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    pub step: String,
    #[serde(rename = "stepName", skip_serializing_if = "Option::is_none")]
    pub step_name: Option<String>,
    pub status: ProgressStatus,
    #[serde(rename = "progressId")]
    pub progress_id: String,
}

/// Normalized stream event consumed by the rendering layer.
///
/// Exactly one variant is active per value; content, progress and completion
/// never overlap.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StreamEvent {
    /// Incremental text delta to append to the current answer.
    Content { text: String },
    /// Milestone notification about a long-running backend operation.
    Progress(ProgressUpdate),
    /// Terminal marker; no further events follow for this exchange.
    Done,
}

impl StreamEvent {
    /// Build a content delta, normalizing ownership at the call site.
    pub fn content(text: impl Into<String>) -> Self {
        Self::Content { text: text.into() }
    }
}

/// One decoded signal: a user-visible event, or a side-channel update routed
/// to the caller's sinks instead of the event sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeSignal {
    /// A normalized event for the transcript.
    Event(StreamEvent),
    /// A task identifier observed on the wire (record-id notifications and
    /// envelope-level `task_id` fields).
    TaskId(String),
    /// A finalized structured result (chart/table payload) that updates
    /// aggregate UI state rather than the incremental transcript.
    StructuredResult(serde_json::Value),
}

type TaskIdSink = Arc<dyn Fn(&str) + Send + Sync>;
type StructuredResultSink = Arc<dyn Fn(&serde_json::Value) + Send + Sync>;

/// Caller-supplied side-channel sinks, invoked at most once per relevant
/// record.
///
/// Passing sinks in at pipeline construction keeps the decode core free of
/// any dependency on a specific state container.
#[derive(Clone, Default)]
pub struct SideChannels {
    pub(crate) task_id: Option<TaskIdSink>,
    pub(crate) structured_result: Option<StructuredResultSink>,
}

impl SideChannels {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receive task identifiers as they are first observed on the wire.
    pub fn on_task_id(mut self, sink: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.task_id = Some(Arc::new(sink));
        self
    }

    /// Receive finalized structured-result payloads.
    pub fn on_structured_result(
        mut self,
        sink: impl Fn(&serde_json::Value) + Send + Sync + 'static,
    ) -> Self {
        self.structured_result = Some(Arc::new(sink));
        self
    }
}

impl fmt::Debug for SideChannels {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SideChannels")
            .field("task_id", &self.task_id.is_some())
            .field("structured_result", &self.structured_result.is_some())
            .finish()
    }
}
