//! Normalized prompt messages.

use super::{ReasoningBlock, ToolCall};
use crate::error::LlmError;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// An ordered, non-empty list of messages.
pub type Prompt = Vec<Message>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::Tool => "tool",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "system" => Ok(Self::System),
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "tool" => Ok(Self::Tool),
            other => Err(LlmError::UnsupportedRole(other.to_string())),
        }
    }
}

/// Prompt-caching hint. Serializes as `{"type": "ephemeral"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CacheControl {
    Ephemeral,
}

/// Payload of an image or file part.
#[derive(Clone, PartialEq)]
pub enum MediaData {
    /// Passed through as-is (`https://` or an existing `data:` URI).
    Url(String),
    /// Already base64 encoded.
    Base64(String),
    Bytes(Vec<u8>),
}

impl fmt::Debug for MediaData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Url(url) if url.starts_with("data:") => {
                write!(f, "Url(<data uri, {} bytes>)", url.len())
            }
            Self::Url(url) => f.debug_tuple("Url").field(url).finish(),
            Self::Base64(data) => write!(f, "Base64(<{} chars>)", data.len()),
            Self::Bytes(data) => write!(f, "Bytes(<{} bytes>)", data.len()),
        }
    }
}

impl MediaData {
    /// Render as a URL, encoding inline data into a `data:<media_type>;base64,` URI.
    pub fn to_url(&self, media_type: &str) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::Base64(data) => format!("data:{media_type};base64,{data}"),
            Self::Bytes(bytes) => {
                let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
                format!("data:{media_type};base64,{encoded}")
            }
        }
    }

    /// Split a `data:<media_type>;base64,<data>` URI. Anything else stays a URL.
    pub fn from_url(url: &str) -> (Self, Option<String>) {
        if let Some(rest) = url.strip_prefix("data:")
            && let Some((media_type, data)) = rest.split_once(";base64,")
        {
            let media_type = (!media_type.is_empty()).then(|| media_type.to_string());
            return (Self::Base64(data.to_string()), media_type);
        }
        (Self::Url(url.to_string()), None)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ContentPart {
    Text {
        text: String,
        cache_control: Option<CacheControl>,
    },
    Image {
        data: MediaData,
        /// Defaults to `image/jpeg` when inline data is encoded.
        media_type: Option<String>,
        cache_control: Option<CacheControl>,
    },
    File {
        data: MediaData,
        filename: Option<String>,
        media_type: String,
        cache_control: Option<CacheControl>,
    },
    /// Assistant messages only.
    Reasoning(ReasoningBlock),
    /// Assistant messages only.
    ToolCall(ToolCall),
    /// Tool messages only.
    ToolResult {
        tool_call_id: String,
        tool_name: Option<String>,
        result: Value,
        cache_control: Option<CacheControl>,
    },
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            cache_control: None,
        }
    }

    pub fn image_url(url: impl Into<String>) -> Self {
        Self::Image {
            data: MediaData::Url(url.into()),
            media_type: None,
            cache_control: None,
        }
    }

    pub fn image_bytes(bytes: Vec<u8>, media_type: Option<String>) -> Self {
        Self::Image {
            data: MediaData::Bytes(bytes),
            media_type,
            cache_control: None,
        }
    }

    pub fn file(data: MediaData, media_type: impl Into<String>, filename: Option<String>) -> Self {
        Self::File {
            data,
            filename,
            media_type: media_type.into(),
            cache_control: None,
        }
    }

    pub fn tool_result(tool_call_id: impl Into<String>, result: Value) -> Self {
        Self::ToolResult {
            tool_call_id: tool_call_id.into(),
            tool_name: None,
            result,
            cache_control: None,
        }
    }

    /// Attach a cache hint. Reasoning and tool-call parts carry none and are returned unchanged.
    pub fn with_cache_control(mut self, hint: CacheControl) -> Self {
        match &mut self {
            Self::Text { cache_control, .. }
            | Self::Image { cache_control, .. }
            | Self::File { cache_control, .. }
            | Self::ToolResult { cache_control, .. } => *cache_control = Some(hint),
            Self::Reasoning(_) | Self::ToolCall(_) => {}
        }
        self
    }

    pub fn cache_control(&self) -> Option<&CacheControl> {
        match self {
            Self::Text { cache_control, .. }
            | Self::Image { cache_control, .. }
            | Self::File { cache_control, .. }
            | Self::ToolResult { cache_control, .. } => cache_control.as_ref(),
            Self::Reasoning(_) | Self::ToolCall(_) => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Image { .. } => "image",
            Self::File { .. } => "file",
            Self::Reasoning(_) => "reasoning",
            Self::ToolCall(_) => "tool-call",
            Self::ToolResult { .. } => "tool-result",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub role: Role,
    pub content: MessageContent,
    pub name: Option<String>,
    pub cache_control: Option<CacheControl>,
}

impl Message {
    pub fn new(role: Role, content: MessageContent) -> Self {
        Self {
            role,
            content,
            name: None,
            cache_control: None,
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(Role::System, MessageContent::Text(text.into()))
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(Role::User, MessageContent::Text(text.into()))
    }

    pub fn user_parts(parts: Vec<ContentPart>) -> Self {
        Self::new(Role::User, MessageContent::Parts(parts))
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::new(Role::Assistant, MessageContent::Text(text.into()))
    }

    pub fn assistant_parts(parts: Vec<ContentPart>) -> Self {
        Self::new(Role::Assistant, MessageContent::Parts(parts))
    }

    /// A tool message answering `tool_call_id`.
    pub fn tool_result(tool_call_id: impl Into<String>, result: Value) -> Self {
        Self::new(
            Role::Tool,
            MessageContent::Parts(vec![ContentPart::tool_result(tool_call_id, result)]),
        )
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_cache_control(mut self, hint: CacheControl) -> Self {
        self.cache_control = Some(hint);
        self
    }

    /// Concatenated text of the message (text parts only).
    pub fn text(&self) -> String {
        match &self.content {
            MessageContent::Text(text) => text.clone(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::Text { text, .. } => Some(text.as_str()),
                    _ => None,
                })
                .collect(),
        }
    }

    pub fn tool_calls(&self) -> Vec<&ToolCall> {
        match &self.content {
            MessageContent::Text(_) => Vec::new(),
            MessageContent::Parts(parts) => parts
                .iter()
                .filter_map(|p| match p {
                    ContentPart::ToolCall(call) => Some(call),
                    _ => None,
                })
                .collect(),
        }
    }
}
