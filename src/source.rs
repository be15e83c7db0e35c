//! Chunk sources: the pipeline's sole input abstraction.
//!
//! A source yields successive byte chunks and signals end-of-stream by
//! terminating or abrupt failure through an error item. The pipeline treats
//! every transport the same way, whether an HTTP streaming body or a
//! synthetic in-memory stream built from persisted rows.

use crate::error::WireError;
use bytes::Bytes;
use futures::Stream;
use futures_util::StreamExt;
use std::pin::Pin;

/// Byte-chunk source consumed by a pipeline.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<Bytes, WireError>> + Send>>;

/// Wrap a streaming HTTP response body.
///
/// The caller has already handled status and authentication; only the body
/// stream crosses into the decode core.
pub fn from_response(response: reqwest::Response) -> ChunkStream {
    Box::pin(
        response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|e| WireError::Http(format!("body stream error: {e}")))),
    )
}

/// In-memory source over prepared byte chunks (replay and tests).
pub fn from_chunks<I>(chunks: I) -> ChunkStream
where
    I: IntoIterator<Item = Bytes>,
    I::IntoIter: Send + 'static,
{
    Box::pin(futures::stream::iter(chunks.into_iter().map(Ok)))
}

/// In-memory source over text chunks.
pub fn from_text_chunks<I>(chunks: I) -> ChunkStream
where
    I: IntoIterator<Item = String>,
    I::IntoIter: Send + 'static,
{
    Box::pin(futures::stream::iter(
        chunks.into_iter().map(|text| Ok(Bytes::from(text))),
    ))
}
