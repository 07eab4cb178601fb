//! Provider-level configuration.

use crate::execution::http::HttpTransport;
use crate::params::OpenRouterChatSettings;
use secrecy::SecretString;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";
/// Sent on every request unless a `User-Agent` header is configured.
pub const DEFAULT_USER_AGENT: &str = concat!("siumai-provider-openrouter/", env!("CARGO_PKG_VERSION"));

/// Settings for [`create_openrouter`](super::create_openrouter).
///
/// `api_key` falls back to the `OPENROUTER_API_KEY` environment variable when unset.
/// `headers` are sent with every request (e.g. `HTTP-Referer` and `X-Title` for
/// OpenRouter app attribution); call-level headers override them.
#[derive(Clone)]
pub struct OpenRouterProviderSettings {
    pub base_url: String,
    pub api_key: Option<SecretString>,
    pub headers: HashMap<String, String>,
    /// Lowest-precedence body fields, merged into every request.
    pub extra_body: Map<String, Value>,
    /// Provider-wide defaults for every model created by this provider.
    pub defaults: OpenRouterChatSettings,
    pub transport: Option<Arc<dyn HttpTransport>>,
}

impl Default for OpenRouterProviderSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            headers: HashMap::new(),
            extra_body: Map::new(),
            defaults: OpenRouterChatSettings::default(),
            transport: None,
        }
    }
}

impl fmt::Debug for OpenRouterProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenRouterProviderSettings")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("headers", &self.headers)
            .field("extra_body", &self.extra_body)
            .field("defaults", &self.defaults)
            .field("custom_transport", &self.transport.is_some())
            .finish()
    }
}

impl OpenRouterProviderSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(api_key.into()));
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// OpenRouter app attribution (`HTTP-Referer` and `X-Title`).
    pub fn with_app_attribution(self, referer: impl Into<String>, title: impl Into<String>) -> Self {
        self.with_header("HTTP-Referer", referer)
            .with_header("X-Title", title)
    }

    pub fn with_extra_body(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra_body.insert(key.into(), value);
        self
    }

    pub fn with_defaults(mut self, defaults: OpenRouterChatSettings) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_transport(mut self, transport: Arc<dyn HttpTransport>) -> Self {
        self.transport = Some(transport);
        self
    }
}
