//! OpenRouter provider handle and request dispatch.

use super::chat::OpenRouterChatModel;
use super::completion::OpenRouterCompletionModel;
use super::config::{API_KEY_ENV, DEFAULT_USER_AGENT, OpenRouterProviderSettings};
use crate::error::LlmError;
use crate::execution::http::{
    ByteStream, HttpHeaderBuilder, HttpTransport, HttpTransportRequest, ReqwestTransport,
    merge_headers,
};
use crate::params::{CallOptions, OpenRouterChatSettings};
use crate::standards::openrouter::{RequestLayers, classify_openrouter_http_error};
use reqwest::header::HeaderMap;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use std::future::Future;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub(crate) const CHAT_PATH: &str = "/chat/completions";
pub(crate) const COMPLETION_PATH: &str = "/completions";

/// Create a provider. Every call returns an independent value; nothing is shared
/// between providers with different credentials.
pub fn create_openrouter(settings: OpenRouterProviderSettings) -> Result<OpenRouterProvider, LlmError> {
    let api_key = resolve_api_key(settings.api_key)?;
    let base_url = settings.base_url.trim().trim_end_matches('/').to_string();
    if base_url.is_empty() {
        return Err(LlmError::ConfigurationError(
            "OpenRouter base URL must not be empty".to_string(),
        ));
    }

    let headers = HttpHeaderBuilder::new()
        .with_bearer_auth(api_key.expose_secret())?
        .with_json_content_type()
        .with_user_agent(DEFAULT_USER_AGENT)?
        .with_custom_headers(&settings.headers)?
        .build();

    let transport = settings
        .transport
        .unwrap_or_else(|| Arc::new(ReqwestTransport::default()));

    tracing::debug!(target: "siumai::openrouter", base_url = %base_url, "created OpenRouter provider");

    Ok(OpenRouterProvider {
        inner: Arc::new(ProviderInner {
            base_url,
            headers,
            static_extra_body: settings.extra_body,
            provider_defaults: settings.defaults.to_layer()?,
            transport,
        }),
    })
}

fn resolve_api_key(explicit: Option<SecretString>) -> Result<SecretString, LlmError> {
    if let Some(key) = explicit.filter(|k| !k.expose_secret().trim().is_empty()) {
        return Ok(key);
    }
    match std::env::var(API_KEY_ENV) {
        Ok(key) if !key.trim().is_empty() => Ok(SecretString::from(key)),
        _ => Err(LlmError::ConfigurationError(format!(
            "OpenRouter API key is missing. Pass it with `with_api_key` or set {API_KEY_ENV}"
        ))),
    }
}

#[derive(Clone)]
pub struct OpenRouterProvider {
    inner: Arc<ProviderInner>,
}

impl std::fmt::Debug for OpenRouterProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterProvider")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

impl OpenRouterProvider {
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// A chat model (`/chat/completions`).
    pub fn chat(
        &self,
        model_id: impl Into<String>,
        settings: OpenRouterChatSettings,
    ) -> Result<OpenRouterChatModel, LlmError> {
        Ok(OpenRouterChatModel::new(
            self.inner.clone(),
            model_id.into(),
            self.inner.layers(&settings)?,
        ))
    }

    /// A raw completion model (`/completions`).
    pub fn completion(
        &self,
        model_id: impl Into<String>,
        settings: OpenRouterChatSettings,
    ) -> Result<OpenRouterCompletionModel, LlmError> {
        Ok(OpenRouterCompletionModel::new(
            self.inner.clone(),
            model_id.into(),
            self.inner.layers(&settings)?,
        ))
    }
}

/// Immutable provider state shared by its models.
pub(crate) struct ProviderInner {
    base_url: String,
    headers: HeaderMap,
    static_extra_body: Map<String, Value>,
    provider_defaults: Map<String, Value>,
    transport: Arc<dyn HttpTransport>,
}

impl ProviderInner {
    fn layers(&self, settings: &OpenRouterChatSettings) -> Result<RequestLayers, LlmError> {
        Ok(RequestLayers {
            static_extra_body: self.static_extra_body.clone(),
            provider_defaults: self.provider_defaults.clone(),
            model: settings.to_layer()?,
        })
    }

    fn request(&self, path: &str, body: Value, options: &CallOptions) -> HttpTransportRequest {
        HttpTransportRequest {
            url: format!("{}{}", self.base_url, path),
            headers: merge_headers(self.headers.clone(), &options.headers),
            body,
        }
    }

    /// POST a JSON body and return the parsed 2xx response body.
    pub(crate) async fn post_json(
        &self,
        path: &str,
        body: Value,
        options: &CallOptions,
    ) -> Result<Value, LlmError> {
        let request = self.request(path, body, options);
        tracing::debug!(target: "siumai::openrouter", url = %request.url, stream = false, "sending request");

        let response = race_abort(
            self.transport.execute_json(request),
            options.abort_signal.as_ref(),
        )
        .await?;
        tracing::debug!(target: "siumai::openrouter", status = response.status, "response received");

        if !(200..300).contains(&response.status) {
            let text = String::from_utf8_lossy(&response.body);
            return Err(classify_openrouter_http_error(
                response.status,
                &text,
                canonical_reason(response.status),
            ));
        }
        Ok(serde_json::from_slice(&response.body)?)
    }

    /// POST a streaming body and return the response bytes once headers arrived with 2xx.
    pub(crate) async fn post_stream(
        &self,
        path: &str,
        body: Value,
        options: &CallOptions,
    ) -> Result<ByteStream, LlmError> {
        let request = self.request(path, body, options);
        tracing::debug!(target: "siumai::openrouter", url = %request.url, stream = true, "sending request");

        let abort = options.abort_signal.as_ref();
        let response = race_abort(self.transport.execute_stream(request), abort).await?;
        tracing::debug!(target: "siumai::openrouter", status = response.status, "stream response received");

        if !(200..300).contains(&response.status) {
            let status = response.status;
            let bytes = race_abort(response.collect_body(), abort).await?;
            let text = String::from_utf8_lossy(&bytes);
            return Err(classify_openrouter_http_error(
                status,
                &text,
                canonical_reason(status),
            ));
        }
        Ok(response.body)
    }
}

/// Resolve `fut` unless the abort token fires first.
async fn race_abort<T>(
    fut: impl Future<Output = Result<T, LlmError>>,
    abort: Option<&CancellationToken>,
) -> Result<T, LlmError> {
    match abort {
        None => fut.await,
        Some(token) => {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    tracing::debug!(target: "siumai::openrouter", "request aborted by caller");
                    Err(LlmError::aborted())
                }
                result = fut => result,
            }
        }
    }
}

fn canonical_reason(status: u16) -> Option<&'static str> {
    reqwest::StatusCode::from_u16(status)
        .ok()
        .and_then(|s| s.canonical_reason())
}
