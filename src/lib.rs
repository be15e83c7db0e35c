//! chatwire
//!
//! Incremental decoding of chat model response streams: record framing,
//! per-backend format decoders, the composed stream pipeline, and history
//! replay through the same decode path.
#![deny(unsafe_code)]

pub mod cancel;
pub mod decoder;
pub mod error;
pub mod event;
pub mod framer;
pub mod pipeline;
pub mod replay;
pub mod source;
pub mod utf8;

pub use cancel::CancelHandle;
pub use decoder::{RecordDecoder, WireFormat};
pub use error::WireError;
pub use event::{DecodeSignal, ProgressStatus, ProgressUpdate, SideChannels, StreamEvent};
pub use framer::RecordFramer;
pub use pipeline::{EventStream, EventStreamHandle, PipelineBuilder};
pub use replay::{ConversationRow, replay_events, replay_source};
