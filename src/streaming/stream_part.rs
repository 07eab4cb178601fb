//! Normalized stream parts.
//!
//! Parts follow the three-phase block lifecycle (`*-start`, `*-delta`, `*-end`).
//! `finish` and `error` are terminal except that an `error` is always followed by
//! the synthetic `finish` that reports unknown usage.

use crate::error::{ErrorEnvelope, LlmError};
use crate::types::{FinishReason, ProviderMetadata, ReasoningDetail, UsageAccounting};
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum StreamPart {
    TextStart {
        id: String,
    },
    TextDelta {
        id: String,
        delta: String,
    },
    TextEnd {
        id: String,
    },

    ReasoningStart {
        id: String,
    },
    ReasoningDelta {
        id: String,
        delta: String,
    },
    ReasoningEnd {
        id: String,
        /// Details that carry more than visible text (encrypted data, signatures).
        #[serde(skip_serializing_if = "Vec::is_empty")]
        details: Vec<ReasoningDetail>,
    },

    ToolInputStart {
        id: String,
        #[serde(rename = "callId")]
        call_id: String,
        name: String,
    },
    ToolInputDelta {
        id: String,
        #[serde(rename = "callId")]
        call_id: String,
        delta: String,
    },
    ToolInputEnd {
        id: String,
        #[serde(rename = "callId")]
        call_id: String,
        /// Concatenation of every delta for this call.
        input: String,
    },

    Finish {
        reason: FinishReason,
        usage: UsageAccounting,
        #[serde(
            default,
            skip_serializing_if = "Option::is_none",
            rename = "providerMetadata"
        )]
        provider_metadata: Option<ProviderMetadata>,
    },

    Error {
        error: StreamError,
    },

    ResponseMetadata {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none", rename = "modelId")]
        model_id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<DateTime<Utc>>,
    },
}

impl StreamPart {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::TextStart { .. } => "text-start",
            Self::TextDelta { .. } => "text-delta",
            Self::TextEnd { .. } => "text-end",
            Self::ReasoningStart { .. } => "reasoning-start",
            Self::ReasoningDelta { .. } => "reasoning-delta",
            Self::ReasoningEnd { .. } => "reasoning-end",
            Self::ToolInputStart { .. } => "tool-input-start",
            Self::ToolInputDelta { .. } => "tool-input-delta",
            Self::ToolInputEnd { .. } => "tool-input-end",
            Self::Finish { .. } => "finish",
            Self::Error { .. } => "error",
            Self::ResponseMetadata { .. } => "response-metadata",
        }
    }

    /// Block id for start/delta/end parts.
    pub fn block_id(&self) -> Option<&str> {
        match self {
            Self::TextStart { id }
            | Self::TextDelta { id, .. }
            | Self::TextEnd { id }
            | Self::ReasoningStart { id }
            | Self::ReasoningDelta { id, .. }
            | Self::ReasoningEnd { id, .. }
            | Self::ToolInputStart { id, .. }
            | Self::ToolInputDelta { id, .. }
            | Self::ToolInputEnd { id, .. } => Some(id),
            Self::Finish { .. } | Self::Error { .. } | Self::ResponseMetadata { .. } => None,
        }
    }

    pub fn is_finish(&self) -> bool {
        matches!(self, Self::Finish { .. })
    }
}

/// Failure delivered in-band on a stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum StreamError {
    /// A data line was not valid JSON or not a valid chunk.
    Parse { message: String, raw: String },
    /// The upstream sent an error envelope.
    Upstream(ErrorEnvelope),
    /// The byte stream failed after the response started.
    Transport { message: String },
}

impl StreamError {
    pub fn message(&self) -> &str {
        match self {
            Self::Parse { message, .. } | Self::Transport { message } => message,
            Self::Upstream(envelope) => &envelope.message,
        }
    }
}

impl From<StreamError> for LlmError {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::Parse { message, .. } => LlmError::StreamParseError(message),
            StreamError::Upstream(envelope) => LlmError::UpstreamError(envelope),
            StreamError::Transport { message } => LlmError::TransportError {
                message,
                aborted: false,
            },
        }
    }
}
