//! Tool definitions, tool choice and tool calls.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A function tool the model may call. `parameters` is a JSON Schema passed upstream verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub parameters: Value,
}

impl ToolDefinition {
    pub fn function(name: impl Into<String>, parameters: Value) -> Self {
        Self {
            name: name.into(),
            description: None,
            parameters,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Tool selection strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolChoice {
    /// Let the model decide (upstream default).
    Auto,
    /// The model must call at least one tool.
    Required,
    /// Disable tool calls.
    None,
    /// Force a specific tool.
    Tool { name: String },
}

impl ToolChoice {
    pub fn tool(name: impl Into<String>) -> Self {
        Self::Tool { name: name.into() }
    }
}

/// A tool call with its input kept as an opaque string.
///
/// The input is expected to be JSON but streamed calls are only valid JSON once complete,
/// so nothing here requires it. Use [`ToolCall::parse_input`] at the point of use.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(rename = "toolCallId")]
    pub id: String,
    #[serde(rename = "toolName")]
    pub name: String,
    pub input: String,
}

impl ToolCall {
    pub fn parse_input(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.input)
    }
}
