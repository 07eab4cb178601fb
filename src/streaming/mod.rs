//! Streaming: SSE framing, the chunk state machine and the public part stream.

pub mod sse;
pub mod stream_part;
pub mod transformer;

pub use sse::{DONE_MARKER, SseChunk, sse_chunks};
pub use stream_part::{StreamError, StreamPart};
pub use transformer::{StreamMode, StreamTransformer};

use futures_util::{Stream, StreamExt};
use std::fmt::Display;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

/// Normalized part stream returned by `stream` calls.
pub type PartStream = Pin<Box<dyn Stream<Item = StreamPart> + Send>>;

/// Drive `transformer` over a response byte stream.
///
/// The abort token is checked before every read; once it fires the stream ends
/// without emitting anything further. Read failures become an in-band `error`.
pub fn into_part_stream<S, B, E>(
    byte_stream: S,
    mut transformer: StreamTransformer,
    abort: Option<CancellationToken>,
) -> PartStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let abort = abort.unwrap_or_default();
    let out = async_stream::stream! {
        let mut chunks = Box::pin(sse_chunks(byte_stream));
        loop {
            let next = tokio::select! {
                biased;
                _ = abort.cancelled() => {
                    tracing::debug!(target: "siumai::openrouter", "stream aborted by caller");
                    break;
                }
                next = chunks.next() => next,
            };
            let parts = match next {
                Some(Ok(chunk)) => transformer.process(chunk),
                Some(Err(e)) => transformer.fail_with(e),
                None => transformer.finish(),
            };
            for part in parts {
                yield part;
            }
            if transformer.is_finished() {
                break;
            }
        }
    };
    Box::pin(out)
}
