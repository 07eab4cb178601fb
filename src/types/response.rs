//! Normalized generation results.

use super::{ReasoningBlock, ToolCall, UsageAccounting};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Why generation stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FinishReason {
    Stop,
    Length,
    ContentFilter,
    ToolCalls,
    Error,
    Other,
}

impl FinishReason {
    /// Map an upstream `finish_reason`. Unknown strings and `null` map to [`FinishReason::Other`].
    pub fn from_wire(raw: Option<&str>) -> Self {
        match raw {
            Some("stop") | Some("end_turn") => Self::Stop,
            Some("length") | Some("max_tokens") => Self::Length,
            Some("content_filter") => Self::ContentFilter,
            Some("tool_calls") | Some("function_call") | Some("tool_use") => Self::ToolCalls,
            Some("error") => Self::Error,
            _ => Self::Other,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stop => "stop",
            Self::Length => "length",
            Self::ContentFilter => "content-filter",
            Self::ToolCalls => "tool-calls",
            Self::Error => "error",
            Self::Other => "other",
        }
    }
}

/// One entry of a result's content array.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ContentBlock {
    Text { text: String },
    Reasoning(ReasoningBlock),
    ToolCall(ToolCall),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
    /// The upstream provider OpenRouter routed the request to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
}

/// Provider metadata keyed by provider name (`{"openrouter": {...}}`).
pub type ProviderMetadata = Map<String, Value>;

/// Result of a non-streaming call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResult {
    /// Text first, then reasoning, then one entry per tool call.
    pub content: Vec<ContentBlock>,
    pub finish_reason: FinishReason,
    pub usage: UsageAccounting,
    pub response: ResponseMetadata,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_metadata: Option<ProviderMetadata>,
    /// The wire body that was sent, set by the model facade.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_body: Option<Value>,
}

impl GenerateResult {
    pub fn text(&self) -> Option<&str> {
        self.content.iter().find_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            _ => None,
        })
    }

    pub fn reasoning(&self) -> Option<&ReasoningBlock> {
        self.content.iter().find_map(|block| match block {
            ContentBlock::Reasoning(reasoning) => Some(reasoning),
            _ => None,
        })
    }

    pub fn tool_calls(&self) -> Vec<&ToolCall> {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolCall(call) => Some(call),
                _ => None,
            })
            .collect()
    }
}
