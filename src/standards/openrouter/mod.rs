//! OpenRouter protocol mapping.
//!
//! - `messages`: normalized prompt ⇄ wire messages
//! - `completion_prompt`: prompt flattening for the raw `/completions` endpoint
//! - `request`: layered request bodies
//! - `response`: non-streaming responses
//! - `errors`: HTTP error classification

pub mod completion_prompt;
pub mod errors;
pub mod messages;
pub mod request;
pub mod response;
pub mod types;

pub use completion_prompt::{CompletionPrompt, to_completion_prompt};
pub use errors::classify_openrouter_http_error;
pub use messages::{from_wire_message, to_wire_messages};
pub use request::{
    PROVIDER_OPTIONS_KEY, RequestLayers, build_chat_request, build_completion_request,
    merge_layers,
};
pub use response::{PROVIDER_METADATA_KEY, parse_chat_response, parse_completion_response};
