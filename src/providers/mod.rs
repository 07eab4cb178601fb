//! Provider facades.

pub mod openrouter;
