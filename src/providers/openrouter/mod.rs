//! OpenRouter provider.
//!
//! ```rust,ignore
//! use siumai_provider_openrouter::prelude::*;
//!
//! let provider = create_openrouter(OpenRouterProviderSettings::new().with_api_key(key))?;
//! let model = provider.chat("anthropic/claude-3.7-sonnet", OpenRouterChatSettings::new())?;
//! let result = model.generate(CallOptions::from_user_text("Hello")).await?;
//! ```

mod chat;
mod client;
mod completion;
mod config;

pub use chat::OpenRouterChatModel;
pub use client::{OpenRouterProvider, create_openrouter};
pub use completion::OpenRouterCompletionModel;
pub use config::{API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_USER_AGENT, OpenRouterProviderSettings};
