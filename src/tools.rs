//! Tool-call normalization.
//!
//! Tool calls arrive in three shapes: the OpenAI wire shape
//! (`{id, function: {name, arguments}}`), schema A (`{toolCallId, toolName, args}`)
//! and schema B (`{toolCallId, toolName, input}`). All of them normalize into
//! [`ToolCall`], whose input is always a string.

use crate::error::LlmError;
use crate::standards::openrouter::types::{WireFunction, WireToolCall};
use crate::types::ToolCall;
use serde_json::Value;

/// Normalize a tool call given in any supported shape.
///
/// Input resolution: `input` > `args` > `arguments` > `function.arguments`.
/// Object-valued inputs are serialized; a missing input becomes `"{}"`.
pub fn from_wire_call(raw: &Value) -> Result<ToolCall, LlmError> {
    let obj = raw
        .as_object()
        .ok_or_else(|| LlmError::ValidationError("tool call must be a JSON object".to_string()))?;
    let function = obj.get("function");

    let id = obj
        .get("toolCallId")
        .or_else(|| obj.get("id"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    let name = obj
        .get("toolName")
        .or_else(|| obj.get("name"))
        .or_else(|| function.and_then(|f| f.get("name")))
        .and_then(Value::as_str)
        .unwrap_or_default();
    let input = ["input", "args", "arguments"]
        .iter()
        .find_map(|k| obj.get(*k).filter(|v| !v.is_null()))
        .or_else(|| {
            function
                .and_then(|f| f.get("arguments"))
                .filter(|v| !v.is_null())
        });

    let builder = ToolCallBuilder::new(id, name);
    match input {
        Some(value) => builder.set_input_value(value),
        None => builder.set_input("{}"),
    }
    .build()
}

/// Convert a typed wire call. `fallback_id` is used when the upstream omitted the id.
pub fn from_typed_wire_call(
    call: &WireToolCall,
    fallback_id: impl FnOnce() -> String,
) -> Result<ToolCall, LlmError> {
    let id = call
        .id
        .clone()
        .filter(|id| !id.is_empty())
        .unwrap_or_else(fallback_id);
    let builder = ToolCallBuilder::new(id, call.function.name.clone().unwrap_or_default());
    match &call.function.arguments {
        Some(value) if !value.is_null() => builder.set_input_value(value),
        _ => builder.set_input("{}"),
    }
    .build()
}

/// Id for calls the upstream sent without one.
pub fn generate_tool_call_id() -> String {
    format!("call_{}", uuid::Uuid::new_v4().simple())
}

/// Render a call in the OpenAI wire shape.
pub fn to_wire_call(call: &ToolCall) -> WireToolCall {
    WireToolCall {
        index: None,
        id: Some(call.id.clone()),
        kind: Some("function".to_string()),
        function: WireFunction {
            name: Some(call.name.clone()),
            arguments: Some(Value::String(call.input.clone())),
        },
    }
}

/// Assembles a [`ToolCall`], validating only what must be valid.
///
/// `id` and `name` must be non-empty. The input is not required to be JSON; a
/// warning is logged instead, since streamed fragments are routinely incomplete.
#[derive(Debug, Clone, Default)]
pub struct ToolCallBuilder {
    id: String,
    name: String,
    input: String,
}

impl ToolCallBuilder {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            input: String::new(),
        }
    }

    pub fn set_input(mut self, input: impl Into<String>) -> Self {
        self.input = input.into();
        self
    }

    pub fn set_input_object(mut self, input: &Value) -> Self {
        self.input = input.to_string();
        self
    }

    /// Strings are taken verbatim, anything else is serialized.
    pub fn set_input_value(self, input: &Value) -> Self {
        match input {
            Value::String(s) => self.set_input(s.clone()),
            other => self.set_input_object(other),
        }
    }

    pub fn append_input(&mut self, fragment: &str) {
        self.input.push_str(fragment);
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn build(self) -> Result<ToolCall, LlmError> {
        if self.id.trim().is_empty() {
            return Err(LlmError::ValidationError(
                "tool call id must be a non-empty string".to_string(),
            ));
        }
        if self.name.trim().is_empty() {
            return Err(LlmError::ValidationError(format!(
                "tool call {} has an empty name",
                self.id
            )));
        }
        if !self.input.is_empty() && serde_json::from_str::<Value>(&self.input).is_err() {
            tracing::warn!(
                target: "siumai::openrouter",
                tool_call_id = %self.id,
                tool_name = %self.name,
                "tool call input is not valid JSON"
            );
        }
        Ok(ToolCall {
            id: self.id,
            name: self.name,
            input: self.input,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tracing_test::traced_test;

    #[test]
    fn normalizes_openai_wire_shape() {
        let call = from_wire_call(&json!({
            "id": "call_1",
            "type": "function",
            "function": {"name": "get_weather", "arguments": "{\"location\":\"NYC\"}"}
        }))
        .unwrap();
        assert_eq!(call.id, "call_1");
        assert_eq!(call.name, "get_weather");
        assert_eq!(call.input, r#"{"location":"NYC"}"#);
    }

    #[test]
    fn normalizes_schema_a_args_object() {
        let call = from_wire_call(&json!({
            "toolCallType": "function",
            "toolCallId": "c1",
            "toolName": "search",
            "args": {"q": "rust"}
        }))
        .unwrap();
        assert_eq!(call.input, r#"{"q":"rust"}"#);
    }

    #[test]
    fn input_wins_over_args() {
        let call = from_wire_call(&json!({
            "toolCallId": "c1",
            "toolName": "search",
            "input": "{\"q\":\"new\"}",
            "args": {"q": "old"}
        }))
        .unwrap();
        assert_eq!(call.input, r#"{"q":"new"}"#);
    }

    #[test]
    fn rejects_empty_id_or_name() {
        match from_wire_call(&json!({"toolCallId": "", "toolName": "x", "input": "{}"})) {
            Err(LlmError::ValidationError(msg)) => assert!(msg.contains("id")),
            other => panic!("unexpected result: {other:?}"),
        }
        match from_wire_call(&json!({"toolCallId": "c", "input": "{}"})) {
            Err(LlmError::ValidationError(msg)) => assert!(msg.contains("name")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn wire_round_trip_keeps_input_string() {
        let call = ToolCall {
            id: "call_9".to_string(),
            name: "lookup".to_string(),
            input: r#"{"k":1}"#.to_string(),
        };
        let wire = serde_json::to_value(to_wire_call(&call)).unwrap();
        assert_eq!(
            wire,
            json!({"id": "call_9", "type": "function", "function": {"name": "lookup", "arguments": "{\"k\":1}"}})
        );
        assert_eq!(from_wire_call(&wire).unwrap(), call);
    }

    #[test]
    fn typed_wire_call_uses_fallback_id() {
        let wire = WireToolCall {
            function: WireFunction {
                name: Some("ping".to_string()),
                arguments: None,
            },
            ..Default::default()
        };
        let call = from_typed_wire_call(&wire, || "generated".to_string()).unwrap();
        assert_eq!(call.id, "generated");
        assert_eq!(call.input, "{}");
    }

    #[test]
    fn generated_ids_are_unique() {
        let a = generate_tool_call_id();
        let b = generate_tool_call_id();
        assert!(a.starts_with("call_"));
        assert_ne!(a, b);
    }

    #[traced_test]
    #[test]
    fn builder_accepts_partial_json_with_warning() {
        let mut builder = ToolCallBuilder::new("c1", "weather");
        builder.append_input(r#"{"location""#);
        let call = builder.build().unwrap();
        assert_eq!(call.input, r#"{"location""#);
        assert!(logs_contain("tool call input is not valid JSON"));
    }

    #[test]
    fn builder_set_input_object_serializes() {
        let call = ToolCallBuilder::new("c1", "weather")
            .set_input_object(&json!({"location": "NYC"}))
            .build()
            .unwrap();
        assert_eq!(call.parse_input().unwrap(), json!({"location": "NYC"}));
    }
}
