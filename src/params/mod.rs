//! Request parameters.
//!
//! [`CallOptions`] are supplied per call. [`OpenRouterChatSettings`] are fixed when a
//! model is created, and also serve as provider-wide defaults.

mod call;
mod openrouter;

pub use call::*;
pub use openrouter::*;
