//! Raw completion model (`/completions`).

use super::client::{COMPLETION_PATH, ProviderInner};
use crate::error::LlmError;
use crate::params::CallOptions;
use crate::standards::openrouter::{
    RequestLayers, build_completion_request, parse_completion_response,
};
use crate::streaming::{PartStream, StreamTransformer, into_part_stream};
use crate::types::GenerateResult;
use std::sync::Arc;

#[derive(Clone)]
pub struct OpenRouterCompletionModel {
    inner: Arc<ProviderInner>,
    model_id: String,
    layers: RequestLayers,
}

impl std::fmt::Debug for OpenRouterCompletionModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenRouterCompletionModel")
            .field("model_id", &self.model_id)
            .finish_non_exhaustive()
    }
}

impl OpenRouterCompletionModel {
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
        "openrouter.completion"
    }

    pub fn request_body(&self, options: &CallOptions, stream: bool) -> Result<serde_json::Value, LlmError> {
        build_completion_request(&self.model_id, &self.layers, options, stream)
    }

    pub async fn generate(&self, options: CallOptions) -> Result<GenerateResult, LlmError> {
        let body = self.request_body(&options, false)?;
        tracing::debug!(target: "siumai::openrouter", model = %self.model_id, "completion generate");
        let raw = self
            .inner
            .post_json(COMPLETION_PATH, body.clone(), &options)
            .await?;
        let mut result = parse_completion_response(&raw)?;
        result.request_body = Some(body);
        Ok(result)
    }

    pub async fn stream(&self, options: CallOptions) -> Result<PartStream, LlmError> {
        let body = self.request_body(&options, true)?;
        tracing::debug!(target: "siumai::openrouter", model = %self.model_id, "completion stream");
        let bytes = self.inner.post_stream(COMPLETION_PATH, body, &options).await?;
        Ok(into_part_stream(
            bytes,
            StreamTransformer::completion(),
            options.abort_signal,
        ))
    }
}
