//! HTTP header construction.

use crate::error::LlmError;
use reqwest::header::{
    AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue, USER_AGENT,
};
use std::collections::HashMap;

/// HTTP header builder for API requests
#[derive(Debug, Default)]
pub struct HttpHeaderBuilder {
    headers: HeaderMap,
}

impl HttpHeaderBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add Bearer token authorization. The value is marked sensitive so it is
    /// redacted from `Debug` output.
    pub fn with_bearer_auth(mut self, token: &str) -> Result<Self, LlmError> {
        let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|e| LlmError::ConfigurationError(format!("Invalid API key format: {e}")))?;
        value.set_sensitive(true);
        self.headers.insert(AUTHORIZATION, value);
        Ok(self)
    }

    pub fn with_json_content_type(mut self) -> Self {
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        self
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Result<Self, LlmError> {
        self.headers.insert(
            USER_AGENT,
            HeaderValue::from_str(user_agent)
                .map_err(|e| LlmError::ConfigurationError(format!("Invalid user agent: {e}")))?,
        );
        Ok(self)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Result<Self, LlmError> {
        let (name, value) = parse_header(name, value)?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Add several headers; later calls override earlier ones with the same name.
    pub fn with_custom_headers(
        mut self,
        custom_headers: &HashMap<String, String>,
    ) -> Result<Self, LlmError> {
        for (key, value) in custom_headers {
            let (name, value) = parse_header(key, value)?;
            self.headers.insert(name, value);
        }
        Ok(self)
    }

    pub fn build(self) -> HeaderMap {
        self.headers
    }
}

fn parse_header(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), LlmError> {
    let header_name = HeaderName::from_bytes(name.as_bytes()).map_err(|e| {
        LlmError::ConfigurationError(format!("Invalid header name '{name}': {e}"))
    })?;
    let header_value = HeaderValue::from_str(value).map_err(|e| {
        LlmError::ConfigurationError(format!("Invalid header value for '{name}': {e}"))
    })?;
    Ok((header_name, header_value))
}

/// Merge extra headers into base headers. Extra headers override on name clash;
/// invalid pairs are skipped.
pub fn merge_headers(mut base: HeaderMap, extra: &HashMap<String, String>) -> HeaderMap {
    for (k, v) in extra {
        if let (Ok(name), Ok(val)) = (
            HeaderName::from_bytes(k.as_bytes()),
            HeaderValue::from_str(v),
        ) {
            base.insert(name, val);
        }
    }
    base
}
