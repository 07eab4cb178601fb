//! Type Conversions for LlmError
//!
//! From implementations for the error types of the crates this adapter sits on.

use super::types::LlmError;

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        Self::TransportError {
            message: err.to_string(),
            aborted: false,
        }
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        Self::JsonError(err.to_string())
    }
}

impl From<reqwest::header::InvalidHeaderValue> for LlmError {
    fn from(err: reqwest::header::InvalidHeaderValue) -> Self {
        Self::ConfigurationError(format!("Invalid header value: {err}"))
    }
}
