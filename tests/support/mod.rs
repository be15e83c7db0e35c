//! Shared test drivers: feed chunk sequences through a pipeline and collect
//! the resulting event sequence.
#![allow(dead_code)]

use chatwire::source;
use chatwire::{EventStream, PipelineBuilder, StreamEvent, WireError, WireFormat};
use futures_util::StreamExt;

/// Install a test subscriber so dropped-record diagnostics are visible under
/// `RUST_LOG`. Safe to call from every test; only the first call wins.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Drain an event stream to completion.
pub async fn collect(mut stream: EventStream) -> Vec<Result<StreamEvent, WireError>> {
    let mut out = Vec::new();
    while let Some(item) = stream.next().await {
        out.push(item);
    }
    out
}

/// Decode prepared text chunks with a default pipeline for `format`.
pub async fn decode_chunks(
    format: WireFormat,
    chunks: Vec<String>,
) -> Vec<Result<StreamEvent, WireError>> {
    collect(PipelineBuilder::new(format).events(source::from_text_chunks(chunks))).await
}

/// Split `input` into byte chunks of at most `size` bytes, ignoring UTF-8
/// boundaries on purpose: the pipeline must reassemble them safely.
pub fn byte_chunks(input: &str, size: usize) -> Vec<bytes::Bytes> {
    input
        .as_bytes()
        .chunks(size.max(1))
        .map(bytes::Bytes::copy_from_slice)
        .collect()
}
