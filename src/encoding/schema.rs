//! Schema A / schema B renderings of normalized values.
//!
//! Schema A is the older contract (`promptTokens`/`completionTokens`, tool calls
//! with `args` and `toolCallType`, a flat `text`/`toolCalls` result). Schema B is
//! the newer one (`inputTokens`/`outputTokens`/`totalTokens`, tool calls with
//! `input`, a typed `content` array). Both are produced from the same values.

use crate::error::LlmError;
use crate::types::{ContentBlock, GenerateResult, ReasoningDetail, ToolCall, UsageAccounting};
use serde_json::{Map, Value, json};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SchemaVersion {
    A,
    #[default]
    B,
}

/// JSON encoding options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct JsonEncodeOptions {
    pub pretty: bool,
}

pub fn encode_usage(usage: &UsageAccounting, schema: SchemaVersion) -> Value {
    match schema {
        SchemaVersion::A => json!({
            "promptTokens": token_count(usage.input_tokens),
            "completionTokens": token_count(usage.output_tokens),
        }),
        SchemaVersion::B => serde_json::to_value(usage).unwrap_or_else(|_| {
            json!({
                "inputTokens": token_count(usage.input_tokens),
                "outputTokens": token_count(usage.output_tokens),
                "totalTokens": token_count(usage.total_tokens),
            })
        }),
    }
}

pub fn encode_tool_call(call: &ToolCall, schema: SchemaVersion) -> Value {
    match schema {
        SchemaVersion::A => json!({
            "toolCallType": "function",
            "toolCallId": call.id,
            "toolName": call.name,
            "args": call.input,
        }),
        SchemaVersion::B => json!({
            "type": "tool-call",
            "toolCallId": call.id,
            "toolName": call.name,
            "input": call.input,
        }),
    }
}

/// Render a non-streaming result.
pub fn encode_generate_result(result: &GenerateResult, schema: SchemaVersion) -> Value {
    let mut out = Map::new();
    match schema {
        SchemaVersion::A => {
            if let Some(text) = result.text() {
                out.insert("text".to_string(), Value::String(text.to_string()));
            }
            if let Some(reasoning) = result.reasoning() {
                out.insert("reasoning".to_string(), Value::String(reasoning.text.clone()));
                if !reasoning.details.is_empty() {
                    out.insert(
                        "reasoningDetails".to_string(),
                        details_value(&reasoning.details),
                    );
                }
            }
            let calls: Vec<Value> = result
                .tool_calls()
                .into_iter()
                .map(|c| encode_tool_call(c, schema))
                .collect();
            out.insert("toolCalls".to_string(), Value::Array(calls));
        }
        SchemaVersion::B => {
            let content: Vec<Value> = result
                .content
                .iter()
                .map(|block| match block {
                    ContentBlock::ToolCall(call) => encode_tool_call(call, schema),
                    other => serde_json::to_value(other).unwrap_or(Value::Null),
                })
                .collect();
            out.insert("content".to_string(), Value::Array(content));
        }
    }
    out.insert(
        "finishReason".to_string(),
        Value::String(result.finish_reason.as_str().to_string()),
    );
    out.insert("usage".to_string(), encode_usage(&result.usage, schema));
    if let Ok(response) = serde_json::to_value(&result.response)
        && response.as_object().is_some_and(|o| !o.is_empty())
    {
        out.insert("response".to_string(), response);
    }
    if let Some(metadata) = &result.provider_metadata {
        out.insert(
            "providerMetadata".to_string(),
            Value::Object(metadata.clone()),
        );
    }
    Value::Object(out)
}

/// Encode a result into a JSON body.
pub fn encode_generate_result_as_json(
    result: &GenerateResult,
    schema: SchemaVersion,
    opts: JsonEncodeOptions,
) -> Result<Vec<u8>, LlmError> {
    let value = encode_generate_result(result, schema);
    let bytes = if opts.pretty {
        serde_json::to_vec_pretty(&value)?
    } else {
        serde_json::to_vec(&value)?
    };
    Ok(bytes)
}

pub(crate) fn details_value(details: &[ReasoningDetail]) -> Value {
    serde_json::to_value(details).unwrap_or_else(|_| Value::Array(Vec::new()))
}

/// Whole numbers as integers, `NaN` as `null`.
pub(crate) fn token_count(value: f64) -> Value {
    if value.is_nan() {
        Value::Null
    } else if value.fract() == 0.0 && value >= 0.0 && value < u64::MAX as f64 {
        Value::from(value as u64)
    } else {
        serde_json::Number::from_f64(value)
            .map(Value::Number)
            .unwrap_or(Value::Null)
    }
}
