//! siumai-provider-openrouter
//!
//! OpenRouter protocol adapter.
//!
//! This crate owns:
//! - the request builder (normalized prompt + call options + layered settings -> wire body)
//! - the response parser (wire body -> [`types::GenerateResult`])
//! - the SSE stream normalizer (wire chunks -> [`streaming::StreamPart`])
//! - the HTTP error classifier and the schema-versioned JSON encoders
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use siumai_provider_openrouter::prelude::*;
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), LlmError> {
//!     let provider = create_openrouter(
//!         OpenRouterProviderSettings::new().with_app_attribution("https://example.com", "Example"),
//!     )?;
//!     let model = provider.chat("openai/gpt-4o-mini", OpenRouterChatSettings::new())?;
//!
//!     let mut parts = model.stream(CallOptions::from_user_text("Hello")).await?;
//!     while let Some(part) = parts.next().await {
//!         if let StreamPart::TextDelta { delta, .. } = part {
//!             print!("{delta}");
//!         }
//!     }
//!     Ok(())
//! }
//! ```
#![deny(unsafe_code)]

pub mod encoding;
pub mod error;
pub mod execution;
pub mod params;
pub mod providers;
pub mod standards;
pub mod streaming;
pub mod tools;
pub mod types;

pub use error::LlmError;
pub use providers::openrouter::{
    OpenRouterChatModel, OpenRouterCompletionModel, OpenRouterProvider,
    OpenRouterProviderSettings, create_openrouter,
};

pub mod prelude {
    pub use crate::encoding::{JsonEncodeOptions, SchemaVersion, StreamPartEncoder};
    pub use crate::error::{ErrorCategory, LlmError};
    pub use crate::params::{CallOptions, OpenRouterChatSettings, ResponseFormat};
    pub use crate::providers::openrouter::{
        OpenRouterChatModel, OpenRouterCompletionModel, OpenRouterProvider,
        OpenRouterProviderSettings, create_openrouter,
    };
    pub use crate::streaming::{PartStream, StreamError, StreamPart};
    pub use crate::types::{
        ContentBlock, ContentPart, FinishReason, GenerateResult, Message, Prompt,
        ReasoningBlock, ReasoningDetail, Role, ToolCall, ToolChoice, ToolDefinition,
        UsageAccounting,
    };
}
