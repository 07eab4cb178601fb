//! Non-streaming response parsing.

use super::types::{WireResponse, WireResponseMessage};
use crate::error::{ErrorEnvelope, LlmError};
use crate::tools::{from_typed_wire_call, generate_tool_call_id};
use crate::types::{
    ContentBlock, FinishReason, GenerateResult, ProviderMetadata, ReasoningBlock,
    ReasoningDetail, ResponseMetadata, UsageAccounting,
};
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

pub const PROVIDER_METADATA_KEY: &str = "openrouter";

/// Parse a `/chat/completions` response body.
///
/// Content is ordered text, reasoning, tool calls regardless of wire field order.
pub fn parse_chat_response(raw: &Value) -> Result<GenerateResult, LlmError> {
    let response = decode(raw)?;
    let choice = response.choices.first().ok_or(LlmError::NoChoice)?;
    let message = choice.message.clone().unwrap_or_default();

    let mut content = Vec::new();
    if let Some(text) = message.content.as_ref().filter(|t| !t.is_empty()) {
        content.push(ContentBlock::Text { text: text.clone() });
    }
    if let Some(reasoning) = reasoning_block(&message) {
        content.push(ContentBlock::Reasoning(reasoning));
    }
    for call in message.tool_calls.iter().flatten() {
        content.push(ContentBlock::ToolCall(from_typed_wire_call(
            call,
            generate_tool_call_id,
        )?));
    }

    Ok(finish_result(&response, content, choice.finish_reason.as_deref()))
}

/// Parse a `/completions` response body (`choices[0].text`).
pub fn parse_completion_response(raw: &Value) -> Result<GenerateResult, LlmError> {
    let response = decode(raw)?;
    let choice = response.choices.first().ok_or(LlmError::NoChoice)?;

    let mut content = Vec::new();
    if let Some(text) = choice.text.as_ref().filter(|t| !t.is_empty()) {
        content.push(ContentBlock::Text { text: text.clone() });
    }
    Ok(finish_result(&response, content, choice.finish_reason.as_deref()))
}

fn decode(raw: &Value) -> Result<WireResponse, LlmError> {
    // OpenRouter occasionally reports upstream failures in a 200 body.
    if let Some(envelope) = ErrorEnvelope::from_value(raw) {
        tracing::warn!(
            target: "siumai::openrouter",
            message = %envelope.message,
            "error envelope in successful response"
        );
        return Err(LlmError::HttpError {
            status: 200,
            envelope,
            body: raw.to_string(),
        });
    }
    Ok(serde_json::from_value(raw.clone())?)
}

fn finish_result(
    response: &WireResponse,
    content: Vec<ContentBlock>,
    finish_reason: Option<&str>,
) -> GenerateResult {
    let usage = response
        .usage
        .as_ref()
        .map(UsageAccounting::normalize)
        .unwrap_or_default();
    GenerateResult {
        content,
        finish_reason: FinishReason::from_wire(finish_reason),
        provider_metadata: Some(provider_metadata(&usage, response.provider.as_deref())),
        usage,
        response: ResponseMetadata {
            id: response.id.clone(),
            model_id: response.model.clone(),
            timestamp: response.created.and_then(timestamp_from_secs),
            provider: response.provider.clone(),
        },
        request_body: None,
    }
}

fn reasoning_block(message: &WireResponseMessage) -> Option<ReasoningBlock> {
    let details = message
        .reasoning_details
        .as_ref()
        .map(ReasoningDetail::parse_list)
        .unwrap_or_default();
    let block = match message.reasoning.as_ref().filter(|r| !r.is_empty()) {
        Some(text) => ReasoningBlock::new(text.clone()).with_details(details),
        None => ReasoningBlock::from_details(details),
    };
    (!block.is_empty()).then_some(block)
}

pub(crate) fn timestamp_from_secs(secs: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(secs, 0)
}

/// `{"openrouter": {"usage": {...}, "provider": "..."}}`
pub(crate) fn provider_metadata(
    usage: &UsageAccounting,
    provider: Option<&str>,
) -> ProviderMetadata {
    let mut inner = Map::new();
    if let Ok(usage) = serde_json::to_value(usage) {
        inner.insert("usage".to_string(), usage);
    }
    if let Some(provider) = provider {
        inner.insert("provider".to_string(), Value::String(provider.to_string()));
    }
    let mut metadata = Map::new();
    metadata.insert(PROVIDER_METADATA_KEY.to_string(), Value::Object(inner));
    metadata
}
