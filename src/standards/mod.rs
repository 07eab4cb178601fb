//! Protocol standards.
//!
//! OpenRouter speaks the OpenAI Chat Completions dialect with its own extensions
//! (reasoning details, routing preferences, usage accounting).

pub mod openrouter;
