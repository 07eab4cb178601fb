//! Per-call options.

use crate::types::{Message, Prompt, ToolChoice, ToolDefinition};
use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio_util::sync::CancellationToken;

/// Requested output format.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseFormat {
    Text,
    /// JSON output, optionally constrained by a schema.
    Json {
        schema: Option<Value>,
        name: Option<String>,
        description: Option<String>,
    },
}

impl ResponseFormat {
    pub fn json() -> Self {
        Self::Json {
            schema: None,
            name: None,
            description: None,
        }
    }

    pub fn json_schema(name: impl Into<String>, schema: Value) -> Self {
        Self::Json {
            schema: Some(schema),
            name: Some(name.into()),
            description: None,
        }
    }
}

/// Options for a single `generate`/`stream` call. These take precedence over every
/// model- and provider-level setting.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    pub prompt: Prompt,
    pub max_output_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub top_k: Option<u32>,
    pub frequency_penalty: Option<f64>,
    pub presence_penalty: Option<f64>,
    pub seed: Option<i64>,
    pub stop_sequences: Option<Vec<String>>,
    pub response_format: Option<ResponseFormat>,
    pub tools: Vec<ToolDefinition>,
    pub tool_choice: Option<ToolChoice>,
    /// Extra request headers; they override provider-level headers.
    pub headers: HashMap<String, String>,
    /// Provider-specific body fields keyed by provider id (`"openrouter"`).
    pub provider_options: Map<String, Value>,
    pub abort_signal: Option<CancellationToken>,
}

impl CallOptions {
    pub fn new(prompt: Prompt) -> Self {
        Self {
            prompt,
            ..Default::default()
        }
    }

    /// Shorthand for a single user message.
    pub fn from_user_text(text: impl Into<String>) -> Self {
        Self::new(vec![Message::user(text)])
    }

    pub fn with_max_output_tokens(mut self, max_output_tokens: u32) -> Self {
        self.max_output_tokens = Some(max_output_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_top_k(mut self, top_k: u32) -> Self {
        self.top_k = Some(top_k);
        self
    }

    pub fn with_frequency_penalty(mut self, penalty: f64) -> Self {
        self.frequency_penalty = Some(penalty);
        self
    }

    pub fn with_presence_penalty(mut self, penalty: f64) -> Self {
        self.presence_penalty = Some(penalty);
        self
    }

    pub fn with_seed(mut self, seed: i64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_stop_sequences(mut self, stop: Vec<String>) -> Self {
        self.stop_sequences = Some(stop);
        self
    }

    pub fn with_response_format(mut self, format: ResponseFormat) -> Self {
        self.response_format = Some(format);
        self
    }

    pub fn with_tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.tools = tools;
        self
    }

    pub fn with_tool_choice(mut self, choice: ToolChoice) -> Self {
        self.tool_choice = Some(choice);
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Set body fields for one provider, e.g. `with_provider_options("openrouter", json!({...}))`.
    /// Non-object values are ignored.
    pub fn with_provider_options(mut self, provider: impl Into<String>, options: Value) -> Self {
        if options.is_object() {
            self.provider_options.insert(provider.into(), options);
        }
        self
    }

    pub fn with_abort_signal(mut self, token: CancellationToken) -> Self {
        self.abort_signal = Some(token);
        self
    }
}
