//! Chat model (`/chat/completions`).

use super::client::{CHAT_PATH, ProviderInner};
use crate::error::LlmError;
use crate::params::CallOptions;
use crate::standards::openrouter::{RequestLayers, build_chat_request, parse_chat_response};
use crate::streaming::{PartStream, StreamTransformer, into_part_stream};
use crate::types::GenerateResult;
use std::sync::Arc;

#[derive(Clone)]
pub struct OpenRouterChatModel {
    inner: Arc<ProviderInner>,
    model_id: String,
    layers: RequestLayers,
}

impl std::fmt::Debug for OpenRouterChatModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterChatModel")
            .field("model_id", &self.model_id)
            .finish_non_exhaustive()
    }
}

impl OpenRouterChatModel {
    pub(crate) fn new(inner: Arc<ProviderInner>, model_id: String, layers: RequestLayers) -> Self {
        Self {
            inner,
            model_id,
            layers,
        }
    }

    pub fn model_id(&self) -> &str {
        &self.model_id
    }

    pub fn provider(&self) -> &'static str {
        "openrouter.chat"
    }

    /// Build the body `generate`/`stream` would send, without sending it.
    pub fn request_body(&self, options: &CallOptions, stream: bool) -> Result<serde_json::Value, LlmError> {
        build_chat_request(&self.model_id, &self.layers, options, stream)
    }

    /// Non-streaming call. Failures surface before any result is returned.
    pub async fn generate(&self, options: CallOptions) -> Result<GenerateResult, LlmError> {
        let body = self.request_body(&options, false)?;
        tracing::debug!(target: "siumai::openrouter", model = %self.model_id, "chat generate");
        let raw = self.inner.post_json(CHAT_PATH, body.clone(), &options).await?;
        let mut result = parse_chat_response(&raw)?;
        result.request_body = Some(body);
        Ok(result)
    }

    /// Streaming call.
    ///
    /// Errors before the response starts are returned here; errors afterwards are
    /// delivered as `error` parts on the stream.
    pub async fn stream(&self, options: CallOptions) -> Result<PartStream, LlmError> {
        let body = self.request_body(&options, true)?;
        tracing::debug!(target: "siumai::openrouter", model = %self.model_id, "chat stream");
        let bytes = self.inner.post_stream(CHAT_PATH, body, &options).await?;
        Ok(into_part_stream(
            bytes,
            StreamTransformer::chat(),
            options.abort_signal,
        ))
    }
}
