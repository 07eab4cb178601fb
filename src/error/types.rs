//! Closed error taxonomy.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use thiserror::Error;

/// Coarse error category used for presentation and retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    Network,
    Cancelled,
    Authentication,
    RateLimit,
    Quota,
    NotFound,
    Client,
    Server,
    Parsing,
    Validation,
    Unsupported,
    Configuration,
}

/// Upstream `code` field; OpenRouter sends numbers, OpenAI-style upstreams send strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ErrorCode {
    Number(i64),
    Text(String),
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

/// The `{ "error": { ... } }` envelope used for both HTTP and in-stream errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub message: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<ErrorCode>,
    /// OpenRouter attaches provider-specific details (raw upstream error, moderation reasons).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl ErrorEnvelope {
    pub const UNKNOWN_MESSAGE: &'static str = "Unknown error";

    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_type: None,
            code: None,
            metadata: None,
        }
    }

    /// Generic envelope used when a body cannot be parsed.
    pub fn unknown() -> Self {
        Self::new(Self::UNKNOWN_MESSAGE)
    }

    /// Extract the envelope from an already-parsed JSON value.
    ///
    /// Accepts `{"error": {...}}` as well as `{"error": "message"}`. Returns `None`
    /// when there is no `error` key. A missing message falls back to "Unknown error".
    pub fn from_value(value: &Value) -> Option<Self> {
        let error = value.get("error")?;
        if let Some(message) = error.as_str() {
            return Some(Self::new(message));
        }
        let obj = error.as_object()?;
        let message = obj
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or(Self::UNKNOWN_MESSAGE)
            .to_string();
        let error_type = obj
            .get("type")
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
            .map(str::to_string);
        let code = obj.get("code").and_then(|v| match v {
            Value::String(s) => Some(ErrorCode::Text(s.clone())),
            Value::Number(n) => n.as_i64().map(ErrorCode::Number),
            _ => None,
        });
        Some(Self {
            message,
            error_type,
            code,
            metadata: obj.get("metadata").filter(|m| !m.is_null()).cloned(),
        })
    }

    /// Best-effort parse of a raw body. Never fails.
    pub fn from_body(body: &str) -> Self {
        serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| Self::from_value(&v))
            .unwrap_or_else(Self::unknown)
    }
}

/// Errors produced by the adapter.
#[derive(Debug, Clone, Error)]
pub enum LlmError {
    /// The send itself was rejected (network failure or abort).
    #[error("Transport error: {message}")]
    TransportError { message: String, aborted: bool },

    /// Non-2xx response. `body` keeps the raw text; `envelope` is the best-effort parse.
    #[error("HTTP error {status}: {}", envelope.message)]
    HttpError {
        status: u16,
        envelope: ErrorEnvelope,
        body: String,
    },

    /// Error envelope delivered inside an otherwise successful stream.
    #[error("Upstream error: {}", .0.message)]
    UpstreamError(ErrorEnvelope),

    #[error("Stream parse error: {0}")]
    StreamParseError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Unsupported content: {0}")]
    UnsupportedContent(String),

    #[error("Unsupported role: {0}")]
    UnsupportedRole(String),

    #[error("No choice in response")]
    NoChoice,

    #[error("JSON error: {0}")]
    JsonError(String),

    #[error("Configuration error: {0}")]
    ConfigurationError(String),
}

impl LlmError {
    pub fn transport(message: impl Into<String>) -> Self {
        Self::TransportError {
            message: message.into(),
            aborted: false,
        }
    }

    pub fn aborted() -> Self {
        Self::TransportError {
            message: "request aborted".to_string(),
            aborted: true,
        }
    }

    /// Build an `HttpError` from a status and raw body, parsing the envelope best-effort.
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        Self::HttpError {
            status,
            envelope: ErrorEnvelope::from_body(&body),
            body,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::HttpError { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::TransportError { aborted: true, .. })
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::TransportError { aborted: true, .. } => ErrorCategory::Cancelled,
            Self::TransportError { .. } => ErrorCategory::Network,
            Self::HttpError {
                status, envelope, ..
            } => classify_http(*status, envelope),
            Self::UpstreamError(envelope) => {
                let status = match &envelope.code {
                    Some(ErrorCode::Number(n)) => u16::try_from(*n).unwrap_or(500),
                    _ => 500,
                };
                classify_http(status, envelope)
            }
            Self::StreamParseError(_) | Self::JsonError(_) | Self::NoChoice => {
                ErrorCategory::Parsing
            }
            Self::ValidationError(_) => ErrorCategory::Validation,
            Self::UnsupportedContent(_) | Self::UnsupportedRole(_) => ErrorCategory::Unsupported,
            Self::ConfigurationError(_) => ErrorCategory::Configuration,
        }
    }

    /// Whether a caller-side retry could plausibly succeed. The adapter never retries itself.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.category(),
            ErrorCategory::Network | ErrorCategory::RateLimit | ErrorCategory::Server
        )
    }
}

/// Structured `type` first, then status, then message heuristics.
fn classify_http(status: u16, envelope: &ErrorEnvelope) -> ErrorCategory {
    match envelope.error_type.as_deref() {
        Some("authentication_error") | Some("invalid_api_key") => {
            return ErrorCategory::Authentication;
        }
        Some("rate_limit_error") => return ErrorCategory::RateLimit,
        Some("insufficient_quota") => return ErrorCategory::Quota,
        Some("not_found_error") => return ErrorCategory::NotFound,
        Some("invalid_request_error") => return ErrorCategory::Client,
        _ => {}
    }

    let lower = envelope.message.to_lowercase();
    match status {
        401 => ErrorCategory::Authentication,
        402 => ErrorCategory::Quota,
        404 => ErrorCategory::NotFound,
        429 => ErrorCategory::RateLimit,
        408 | 500..=599 => ErrorCategory::Server,
        _ if lower.contains("api key") || lower.contains("unauthorized") => {
            ErrorCategory::Authentication
        }
        _ if lower.contains("rate limit") || lower.contains("ratelimit") => {
            ErrorCategory::RateLimit
        }
        _ if lower.contains("quota") || lower.contains("credits") => ErrorCategory::Quota,
        400..=499 => ErrorCategory::Client,
        _ => ErrorCategory::Server,
    }
}
