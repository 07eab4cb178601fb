//! Wire request building.
//!
//! Settings come from four layers, folded lowest to highest:
//!
//! 1. static extra body (provider settings)
//! 2. provider-level defaults
//! 3. model settings
//! 4. call options (including `provider_options["openrouter"]`)
//!
//! The fold is shallow: a higher layer replaces a key wholesale, so nested policy
//! objects such as `reasoning` or `provider` are never merged field by field.
//! `null` never overrides a lower layer.

use super::completion_prompt::to_completion_prompt;
use super::messages::to_wire_messages;
use crate::error::LlmError;
use crate::params::{CallOptions, ResponseFormat};
use crate::types::{ToolChoice, ToolDefinition};
use serde_json::{Map, Value, json};

/// Key under which call-time provider options are looked up.
pub const PROVIDER_OPTIONS_KEY: &str = "openrouter";

/// The three configuration layers below call options.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestLayers {
    pub static_extra_body: Map<String, Value>,
    pub provider_defaults: Map<String, Value>,
    pub model: Map<String, Value>,
}

/// Fold layers left to right; the last non-null value for a key wins.
pub fn merge_layers<'a>(
    layers: impl IntoIterator<Item = &'a Map<String, Value>>,
) -> Map<String, Value> {
    let mut out = Map::new();
    for layer in layers {
        for (key, value) in layer {
            if !value.is_null() {
                out.insert(key.clone(), value.clone());
            }
        }
    }
    out
}

/// Build the `/chat/completions` body.
pub fn build_chat_request(
    model_id: &str,
    layers: &RequestLayers,
    options: &CallOptions,
    stream: bool,
) -> Result<Value, LlmError> {
    let messages = to_wire_messages(&options.prompt)?;
    let call = call_layer(options, true)?;
    let mut body = merge_layers([
        &layers.static_extra_body,
        &layers.provider_defaults,
        &layers.model,
        &call,
    ]);

    body.insert("model".to_string(), Value::String(model_id.to_string()));
    body.insert("messages".to_string(), serde_json::to_value(messages)?);
    apply_stream_flags(&mut body, stream);
    Ok(Value::Object(body))
}

/// Build the `/completions` body. Tools are not supported on this endpoint.
pub fn build_completion_request(
    model_id: &str,
    layers: &RequestLayers,
    options: &CallOptions,
    stream: bool,
) -> Result<Value, LlmError> {
    if !options.tools.is_empty() || options.tool_choice.is_some() {
        return Err(LlmError::UnsupportedContent(
            "tools are not supported by the completion endpoint".to_string(),
        ));
    }
    let completion = to_completion_prompt(&options.prompt)?;
    let call = call_layer(options, false)?;
    let mut body = merge_layers([
        &layers.static_extra_body,
        &layers.provider_defaults,
        &layers.model,
        &call,
    ]);

    // Caller stop sequences first, then the turn separator.
    let mut stop: Vec<Value> = body
        .get("stop")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    for sequence in completion.stop_sequences {
        let sequence = Value::String(sequence);
        if !stop.contains(&sequence) {
            stop.push(sequence);
        }
    }
    body.insert("stop".to_string(), Value::Array(stop));

    body.insert("model".to_string(), Value::String(model_id.to_string()));
    body.insert("prompt".to_string(), Value::String(completion.prompt));
    apply_stream_flags(&mut body, stream);
    Ok(Value::Object(body))
}

fn apply_stream_flags(body: &mut Map<String, Value>, stream: bool) {
    body.insert("stream".to_string(), Value::Bool(stream));
    if stream {
        body.insert("stream_options".to_string(), json!({"include_usage": true}));
    } else {
        body.remove("stream_options");
    }
}

fn call_layer(options: &CallOptions, with_tools: bool) -> Result<Map<String, Value>, LlmError> {
    let mut layer = Map::new();
    let mut put = |key: &str, value: Option<Value>| {
        if let Some(value) = value {
            layer.insert(key.to_string(), value);
        }
    };

    put("max_tokens", options.max_output_tokens.map(Value::from));
    put("temperature", options.temperature.map(Value::from));
    put("top_p", options.top_p.map(Value::from));
    put("top_k", options.top_k.map(Value::from));
    put("frequency_penalty", options.frequency_penalty.map(Value::from));
    put("presence_penalty", options.presence_penalty.map(Value::from));
    put("seed", options.seed.map(Value::from));
    put(
        "stop",
        options
            .stop_sequences
            .as_ref()
            .filter(|s| !s.is_empty())
            .map(|s| Value::from(s.clone())),
    );
    put(
        "response_format",
        options.response_format.as_ref().map(response_format_to_wire),
    );

    if with_tools && !options.tools.is_empty() {
        put("tools", Some(tools_to_wire(&options.tools)));
        put("tool_choice", options.tool_choice.as_ref().map(tool_choice_to_wire));
    }

    if let Some(provider_options) = options.provider_options.get(PROVIDER_OPTIONS_KEY) {
        let Value::Object(extra) = provider_options else {
            return Err(LlmError::ValidationError(format!(
                "provider options for '{PROVIDER_OPTIONS_KEY}' must be a JSON object"
            )));
        };
        for (key, value) in extra {
            layer.insert(key.clone(), value.clone());
        }
    }
    Ok(layer)
}

fn tools_to_wire(tools: &[ToolDefinition]) -> Value {
    Value::Array(
        tools
            .iter()
            .map(|tool| {
                let mut function = Map::new();
                function.insert("name".to_string(), Value::String(tool.name.clone()));
                if let Some(description) = &tool.description {
                    function.insert(
                        "description".to_string(),
                        Value::String(description.clone()),
                    );
                }
                function.insert("parameters".to_string(), tool.parameters.clone());
                json!({"type": "function", "function": function})
            })
            .collect(),
    )
}

fn tool_choice_to_wire(choice: &ToolChoice) -> Value {
    match choice {
        ToolChoice::Auto => json!("auto"),
        ToolChoice::None => json!("none"),
        ToolChoice::Required => json!("required"),
        ToolChoice::Tool { name } => json!({"type": "function", "function": {"name": name}}),
    }
}

fn response_format_to_wire(format: &ResponseFormat) -> Value {
    match format {
        ResponseFormat::Text => json!({"type": "text"}),
        ResponseFormat::Json { schema: None, .. } => json!({"type": "json_object"}),
        ResponseFormat::Json {
            schema: Some(schema),
            name,
            description,
        } => {
            let mut json_schema = Map::new();
            json_schema.insert("schema".to_string(), schema.clone());
            json_schema.insert("strict".to_string(), Value::Bool(true));
            json_schema.insert(
                "name".to_string(),
                Value::String(name.clone().unwrap_or_else(|| "response".to_string())),
            );
            if let Some(description) = description {
                json_schema.insert(
                    "description".to_string(),
                    Value::String(description.clone()),
                );
            }
            json!({"type": "json_schema", "json_schema": json_schema})
        }
    }
}
