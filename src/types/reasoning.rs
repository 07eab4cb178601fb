//! Reasoning blocks and OpenRouter `reasoning_details`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One entry of OpenRouter's `reasoning_details` array.
///
/// Encrypted entries carry opaque data that is only ever echoed back upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ReasoningDetail {
    #[serde(rename = "reasoning.text")]
    Text {
        #[serde(default)]
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        signature: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<u32>,
    },
    #[serde(rename = "reasoning.summary")]
    Summary {
        #[serde(default)]
        summary: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<u32>,
    },
    #[serde(rename = "reasoning.encrypted")]
    Encrypted {
        data: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        format: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        index: Option<u32>,
    },
}

impl ReasoningDetail {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            signature: None,
            id: None,
            format: None,
            index: None,
        }
    }

    pub fn summary(summary: impl Into<String>) -> Self {
        Self::Summary {
            summary: summary.into(),
            id: None,
            format: None,
            index: None,
        }
    }

    pub fn encrypted(data: impl Into<String>) -> Self {
        Self::Encrypted {
            data: data.into(),
            id: None,
            format: None,
            index: None,
        }
    }

    /// Human-readable text carried by this detail. Encrypted details have none.
    pub fn visible_text(&self) -> Option<&str> {
        match self {
            Self::Text { text, .. } => Some(text),
            Self::Summary { summary, .. } => Some(summary),
            Self::Encrypted { .. } => None,
        }
    }

    /// Parse a wire `reasoning_details` array, skipping entries of unknown type.
    pub fn parse_list(value: &Value) -> Vec<Self> {
        let Some(items) = value.as_array() else {
            return Vec::new();
        };
        items
            .iter()
            .filter_map(|item| match serde_json::from_value::<Self>(item.clone()) {
                Ok(detail) => Some(detail),
                Err(e) => {
                    tracing::trace!(target: "siumai::openrouter", "skipping reasoning detail: {e}");
                    None
                }
            })
            .collect()
    }
}

/// Reasoning produced (or replayed) by an assistant turn.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReasoningBlock {
    pub text: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<ReasoningDetail>,
}

impl ReasoningBlock {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            details: Vec::new(),
        }
    }

    pub fn with_details(mut self, details: Vec<ReasoningDetail>) -> Self {
        self.details = details;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.details.is_empty()
    }

    /// Build a block from details alone, joining their visible text.
    pub fn from_details(details: Vec<ReasoningDetail>) -> Self {
        let text = details.iter().filter_map(ReasoningDetail::visible_text).collect();
        Self { text, details }
    }
}
