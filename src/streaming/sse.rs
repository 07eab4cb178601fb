//! SSE framing.
//!
//! Splits a response byte stream into `data:` payloads. Comment lines
//! (OpenRouter sends `: OPENROUTER PROCESSING` keep-alives) and empty payloads
//! never reach the transformer.

use super::stream_part::StreamError;
use eventsource_stream::{EventStreamError, Eventsource};
use futures_util::{Stream, StreamExt};
use std::fmt::Display;

pub const DONE_MARKER: &str = "[DONE]";

/// One SSE data payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseChunk {
    Data(String),
    /// The `data: [DONE]` terminator.
    Done,
}

impl SseChunk {
    pub fn from_data(data: impl Into<String>) -> Self {
        let data = data.into();
        if data.trim() == DONE_MARKER {
            Self::Done
        } else {
            Self::Data(data)
        }
    }
}

/// Decode a byte stream into SSE chunks.
///
/// Undecodable bytes surface as [`StreamError::Parse`]; failures of the
/// underlying byte stream as [`StreamError::Transport`].
pub fn sse_chunks<S, B, E>(
    byte_stream: S,
) -> impl Stream<Item = Result<SseChunk, StreamError>> + Send
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    byte_stream.eventsource().filter_map(|item| async move {
        match item {
            Ok(event) if event.data.trim().is_empty() => None,
            Ok(event) => Some(Ok(SseChunk::from_data(event.data))),
            Err(e) => Some(Err(framing_error(e))),
        }
    })
}

fn framing_error<E: Display>(error: EventStreamError<E>) -> StreamError {
    match error {
        EventStreamError::Utf8(e) => StreamError::Parse {
            message: format!("event stream is not valid UTF-8: {}", e.utf8_error()),
            raw: String::from_utf8_lossy(e.as_bytes()).into_owned(),
        },
        EventStreamError::Parser(e) => StreamError::Parse {
            message: format!("malformed event stream: {:?}", e.code),
            raw: e.input,
        },
        EventStreamError::Transport(e) => StreamError::Transport {
            message: e.to_string(),
        },
    }
}
