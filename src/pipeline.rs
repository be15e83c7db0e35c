//! Stream pipeline: source → text decode → framing → format decode → events.
//!
//! A pipeline is configured once per exchange and consumed pull-driven; it
//! suspends only while awaiting the next source chunk, decoding itself is
//! synchronous. Each pipeline exclusively owns its accumulation buffers and
//! decoder context, so concurrent exchanges share no mutable state.

use crate::cancel::{CancelHandle, make_cancellable};
use crate::decoder::{MultiplexDecoder, RecordDecoder, WireFormat};
use crate::error::WireError;
use crate::event::{DecodeSignal, SideChannels, StreamEvent};
use crate::framer::RecordFramer;
use crate::source::ChunkStream;
use crate::utf8::Utf8Decoder;
use futures::Stream;
use futures_util::StreamExt;
use std::pin::Pin;
use std::sync::Arc;
use tracing::debug;

/// Normalized event stream: the pipeline's output contract.
///
/// Terminal conditions are pairwise distinct: an explicit `Done` event is
/// normal completion; `Err(IncompleteStream)` is an abrupt close without a
/// completion marker; `Err(Cancelled)` is a caller abort; any other error is
/// a source failure, forwarded as the final item.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, WireError>> + Send>>;

/// Event stream paired with its first-class cancellation handle.
pub struct EventStreamHandle {
    pub stream: EventStream,
    pub cancel: CancelHandle,
}

enum DecoderChoice {
    Format(WireFormat),
    Custom(Arc<dyn RecordDecoder>),
}

/// Per-exchange pipeline configuration.
pub struct PipelineBuilder {
    decoder: DecoderChoice,
    delimiter: String,
    question: Option<String>,
    side_channels: SideChannels,
    finish_on_close: bool,
}

impl PipelineBuilder {
    pub fn new(format: WireFormat) -> Self {
        Self {
            decoder: DecoderChoice::Format(format),
            delimiter: "\n".to_string(),
            question: None,
            side_channels: SideChannels::new(),
            finish_on_close: false,
        }
    }

    /// Use a caller-supplied decoder instead of a registry format.
    pub fn with_decoder(decoder: Arc<dyn RecordDecoder>) -> Self {
        Self {
            decoder: DecoderChoice::Custom(decoder),
            delimiter: "\n".to_string(),
            question: None,
            side_channels: SideChannels::new(),
            finish_on_close: false,
        }
    }

    /// Record delimiter; newline by default.
    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    /// The submitted question, echoed back by formats that request it.
    pub fn question(mut self, question: impl Into<String>) -> Self {
        self.question = Some(question.into());
        self
    }

    /// Side-channel sinks for task ids and structured results.
    pub fn side_channels(mut self, side_channels: SideChannels) -> Self {
        self.side_channels = side_channels;
        self
    }

    /// Treat source exhaustion without a completion marker as clean
    /// completion instead of an incomplete stream. Replay sources end this
    /// way; live sources should keep the default.
    pub fn finish_on_close(mut self, finish_on_close: bool) -> Self {
        self.finish_on_close = finish_on_close;
        self
    }

    /// Consume a source, producing the pull-driven event stream.
    pub fn events(self, source: ChunkStream) -> EventStream {
        let decoder = self.build_decoder();
        let delimiter = self.delimiter;
        let side_channels = self.side_channels;
        let finish_on_close = self.finish_on_close;
        let mut source = source;

        let s = async_stream::stream! {
            let mut text = Utf8Decoder::new();
            let mut framer = RecordFramer::new(delimiter);
            let mut ctx = DecoderContext::new(side_channels);

            while let Some(chunk) = source.next().await {
                let chunk = match chunk {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                };
                let decoded = text.decode(&chunk);
                if decoded.is_empty() {
                    continue;
                }
                for record in framer.push(&decoded) {
                    for event in ctx.route(&*decoder, &record) {
                        let done = matches!(event, StreamEvent::Done);
                        yield Ok(event);
                        if done {
                            // Explicit completion: later records are not decoded.
                            return;
                        }
                    }
                }
            }

            // Source exhausted: flush dangling text, then the trailing record.
            let mut tail_records = Vec::new();
            let dangling = text.finish();
            if !dangling.is_empty() {
                tail_records.extend(framer.push(&dangling));
            }
            tail_records.extend(framer.finish());
            for record in tail_records {
                for event in ctx.route(&*decoder, &record) {
                    let done = matches!(event, StreamEvent::Done);
                    yield Ok(event);
                    if done {
                        return;
                    }
                }
            }

            if !finish_on_close {
                yield Err(WireError::IncompleteStream);
            }
        };
        Box::pin(s)
    }

    /// Like [`events`](Self::events), paired with a cancellation handle.
    pub fn events_with_cancel(self, source: ChunkStream) -> EventStreamHandle {
        let (stream, cancel) = make_cancellable(self.events(source));
        EventStreamHandle { stream, cancel }
    }

    fn build_decoder(&self) -> Arc<dyn RecordDecoder> {
        match &self.decoder {
            DecoderChoice::Custom(decoder) => decoder.clone(),
            DecoderChoice::Format(WireFormat::Qwen2) => {
                let mut decoder = MultiplexDecoder::new();
                if let Some(question) = &self.question {
                    decoder = decoder.with_question(question.clone());
                }
                Arc::new(decoder)
            }
            DecoderChoice::Format(format) => format.decoder(),
        }
    }
}

/// Per-pipeline decode state: routes side channels and tracks the last-seen
/// task id so the sink fires once per observed id, not once per record.
struct DecoderContext {
    side_channels: SideChannels,
    last_task_id: Option<String>,
}

impl DecoderContext {
    fn new(side_channels: SideChannels) -> Self {
        Self {
            side_channels,
            last_task_id: None,
        }
    }

    fn route(&mut self, decoder: &dyn RecordDecoder, record: &str) -> Vec<StreamEvent> {
        let signals = decoder.decode_record(record);
        if signals.is_empty() {
            // Unrecognized bookkeeping payload: drop, keep the stream alive.
            debug!(record, "record matched no decode rule, dropped");
            return Vec::new();
        }

        let mut events = Vec::new();
        for signal in signals {
            match signal {
                DecodeSignal::Event(event) => events.push(event),
                DecodeSignal::TaskId(id) => {
                    if self.last_task_id.as_deref() != Some(id.as_str()) {
                        if let Some(sink) = &self.side_channels.task_id {
                            sink(&id);
                        }
                        self.last_task_id = Some(id);
                    }
                }
                DecodeSignal::StructuredResult(result) => {
                    if let Some(sink) = &self.side_channels.structured_result {
                        sink(&result);
                    }
                }
            }
        }
        events
    }
}
