//! Stream part encoders.
//!
//! Schema B parts are the normalized parts as-is. Schema A has no block
//! boundaries: text and reasoning are bare deltas, tool input deltas carry the
//! tool name, and a complete `tool-call` is emitted when a tool block ends.

use super::schema::{SchemaVersion, encode_usage};
use crate::error::LlmError;
use crate::streaming::{DONE_MARKER, PartStream, StreamPart};
use crate::types::ReasoningDetail;
use bytes::Bytes;
use futures_util::{Stream, StreamExt, stream};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::pin::Pin;

/// Byte stream suitable for an HTTP response body.
pub type PartByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, LlmError>> + Send>>;

/// Stateful encoder; schema A needs the tool name on every delta.
#[derive(Debug, Default)]
pub struct StreamPartEncoder {
    schema: SchemaVersion,
    tool_names: HashMap<String, String>,
}

impl StreamPartEncoder {
    pub fn new(schema: SchemaVersion) -> Self {
        Self {
            schema,
            tool_names: HashMap::new(),
        }
    }

    pub fn schema(&self) -> SchemaVersion {
        self.schema
    }

    /// Encode one part. Returns nothing for parts the schema has no equivalent of.
    pub fn encode(&mut self, part: &StreamPart) -> Result<Vec<Value>, LlmError> {
        match self.schema {
            SchemaVersion::B => Ok(vec![encode_part_b(part)?]),
            SchemaVersion::A => Ok(self.encode_part_a(part)),
        }
    }

    fn encode_part_a(&mut self, part: &StreamPart) -> Vec<Value> {
        match part {
            StreamPart::TextStart { .. }
            | StreamPart::TextEnd { .. }
            | StreamPart::ReasoningStart { .. } => Vec::new(),
            StreamPart::TextDelta { delta, .. } => {
                vec![json!({"type": "text-delta", "textDelta": delta})]
            }
            StreamPart::ReasoningDelta { delta, .. } => {
                vec![json!({"type": "reasoning", "textDelta": delta})]
            }
            StreamPart::ReasoningEnd { details, .. } => {
                details.iter().filter_map(reasoning_detail_a).collect()
            }
            StreamPart::ToolInputStart { call_id, name, .. } => {
                self.tool_names.insert(call_id.clone(), name.clone());
                Vec::new()
            }
            StreamPart::ToolInputDelta { call_id, delta, .. } => vec![json!({
                "type": "tool-call-delta",
                "toolCallType": "function",
                "toolCallId": call_id,
                "toolName": self.tool_names.get(call_id).cloned().unwrap_or_default(),
                "argsTextDelta": delta,
            })],
            StreamPart::ToolInputEnd { call_id, input, .. } => vec![json!({
                "type": "tool-call",
                "toolCallType": "function",
                "toolCallId": call_id,
                "toolName": self.tool_names.remove(call_id).unwrap_or_default(),
                "args": input,
            })],
            StreamPart::Finish {
                reason,
                usage,
                provider_metadata,
            } => {
                let mut out = Map::new();
                out.insert("type".to_string(), json!("finish"));
                out.insert("finishReason".to_string(), json!(reason.as_str()));
                out.insert("usage".to_string(), encode_usage(usage, SchemaVersion::A));
                if let Some(metadata) = provider_metadata {
                    out.insert(
                        "providerMetadata".to_string(),
                        Value::Object(metadata.clone()),
                    );
                }
                vec![Value::Object(out)]
            }
            StreamPart::Error { error } => vec![json!({
                "type": "error",
                "error": serde_json::to_value(error).unwrap_or_else(|_| json!(error.message())),
            })],
            StreamPart::ResponseMetadata { .. } => {
                encode_part_b(part).map(|v| vec![v]).unwrap_or_default()
            }
        }
    }
}

fn encode_part_b(part: &StreamPart) -> Result<Value, LlmError> {
    Ok(serde_json::to_value(part)?)
}

fn reasoning_detail_a(detail: &ReasoningDetail) -> Option<Value> {
    match detail {
        ReasoningDetail::Text {
            signature: Some(signature),
            ..
        } => Some(json!({"type": "reasoning-signature", "signature": signature})),
        ReasoningDetail::Encrypted { data, .. } => {
            Some(json!({"type": "redacted-reasoning", "data": data}))
        }
        ReasoningDetail::Text { .. } | ReasoningDetail::Summary { .. } => None,
    }
}

/// `data: <json>\n\n`
pub fn sse_frame(value: &Value) -> Bytes {
    Bytes::from(format!("data: {value}\n\n"))
}

pub fn sse_done_frame() -> Bytes {
    Bytes::from(format!("data: {DONE_MARKER}\n\n"))
}

/// Re-serialize a part stream as SSE frames in `schema`, terminated by `[DONE]`.
pub fn encode_part_stream_as_sse(parts: PartStream, schema: SchemaVersion) -> PartByteStream {
    let mut encoder = StreamPartEncoder::new(schema);
    let frames = parts.flat_map(move |part| {
        let items: Vec<Result<Bytes, LlmError>> = match encoder.encode(&part) {
            Ok(values) => values.iter().map(|v| Ok(sse_frame(v))).collect(),
            Err(e) => vec![Err(e)],
        };
        stream::iter(items)
    });
    Box::pin(frames.chain(stream::once(async { Ok(sse_done_frame()) })))
}
