//! Error handling types for the OpenRouter adapter.
//!
//! Every fallible operation in this crate returns [`LlmError`]. Stream-scoped
//! failures are not raised through this type while a stream is being consumed;
//! they are delivered in-band as `StreamPart::Error` (see [`crate::streaming`]).

mod conversions;
pub mod types;

pub use types::*;
