//! OpenRouter model settings.
//!
//! Field names follow the OpenRouter API reference. Each settings value renders into a
//! flat JSON layer via [`OpenRouterChatSettings::to_layer`]; layering itself lives in
//! the request builder.

use crate::error::LlmError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReasoningEffort {
    Minimal,
    Low,
    Medium,
    High,
}

/// The `reasoning` request object. Always replaced as a whole when settings are layered.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReasoningDirective {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effort: Option<ReasoningEffort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Reason internally but leave reasoning out of the response.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
}

impl ReasoningDirective {
    pub fn effort(effort: ReasoningEffort) -> Self {
        Self {
            effort: Some(effort),
            ..Default::default()
        }
    }

    pub fn max_tokens(max_tokens: u32) -> Self {
        Self {
            max_tokens: Some(max_tokens),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataCollection {
    Allow,
    Deny,
}

/// Provider routing preferences (the `provider` request object).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderPreferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allow_fallbacks: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_parameters: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_collection: Option<DataCollection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub only: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ignore: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantizations: Option<Vec<String>>,
    /// `price`, `throughput` or `latency`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<String>,
    #[serde(default, flatten, skip_serializing_if = "Map::is_empty")]
    pub extra: Map<String, Value>,
}

/// The `usage` request object. `include: true` makes OpenRouter report cost.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageConfig {
    pub include: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Logprobs {
    /// `logprobs: true` without alternatives.
    Enabled,
    /// `logprobs: true` plus `top_logprobs: n`.
    TopN(u32),
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OpenRouterChatSettings {
    /// Fallback models tried in order when the primary model fails.
    pub models: Option<Vec<String>>,
    pub logit_bias: Option<HashMap<String, f64>>,
    pub logprobs: Option<Logprobs>,
    pub user: Option<String>,
    pub parallel_tool_calls: Option<bool>,
    pub include_reasoning: Option<bool>,
    pub reasoning: Option<ReasoningDirective>,
    pub usage: Option<UsageConfig>,
    pub provider: Option<ProviderPreferences>,
    pub plugins: Option<Vec<Value>>,
    pub web_search_options: Option<Value>,
    /// Arbitrary body fields; they override the typed fields above.
    pub extra_body: Map<String, Value>,
}

impl OpenRouterChatSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.models = Some(models);
        self
    }

    pub fn with_logit_bias(mut self, bias: HashMap<String, f64>) -> Self {
        self.logit_bias = Some(bias);
        self
    }

    pub fn with_logprobs(mut self, logprobs: Logprobs) -> Self {
        self.logprobs = Some(logprobs);
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    pub fn with_parallel_tool_calls(mut self, enabled: bool) -> Self {
        self.parallel_tool_calls = Some(enabled);
        self
    }

    pub fn with_include_reasoning(mut self, include: bool) -> Self {
        self.include_reasoning = Some(include);
        self
    }

    pub fn with_reasoning(mut self, reasoning: ReasoningDirective) -> Self {
        self.reasoning = Some(reasoning);
        self
    }

    pub fn with_usage_accounting(mut self, include: bool) -> Self {
        self.usage = Some(UsageConfig { include });
        self
    }

    pub fn with_provider(mut self, provider: ProviderPreferences) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_plugins(mut self, plugins: Vec<Value>) -> Self {
        self.plugins = Some(plugins);
        self
    }

    pub fn with_web_search_options(mut self, options: Value) -> Self {
        self.web_search_options = Some(options);
        self
    }

    pub fn with_extra_body(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra_body.insert(key.into(), value);
        self
    }

    /// Render the non-empty settings as a flat body layer.
    pub fn to_layer(&self) -> Result<Map<String, Value>, LlmError> {
        let mut layer = Map::new();
        insert_opt(&mut layer, "models", &self.models)?;
        insert_opt(&mut layer, "logit_bias", &self.logit_bias)?;
        match self.logprobs {
            Some(Logprobs::Enabled) => {
                layer.insert("logprobs".to_string(), Value::Bool(true));
                layer.insert("top_logprobs".to_string(), Value::from(0));
            }
            Some(Logprobs::TopN(n)) => {
                layer.insert("logprobs".to_string(), Value::Bool(true));
                layer.insert("top_logprobs".to_string(), Value::from(n));
            }
            None => {}
        }
        insert_opt(&mut layer, "user", &self.user)?;
        insert_opt(&mut layer, "parallel_tool_calls", &self.parallel_tool_calls)?;
        insert_opt(&mut layer, "include_reasoning", &self.include_reasoning)?;
        insert_opt(&mut layer, "reasoning", &self.reasoning)?;
        insert_opt(&mut layer, "usage", &self.usage)?;
        insert_opt(&mut layer, "provider", &self.provider)?;
        insert_opt(&mut layer, "plugins", &self.plugins)?;
        insert_opt(&mut layer, "web_search_options", &self.web_search_options)?;
        for (key, value) in &self.extra_body {
            layer.insert(key.clone(), value.clone());
        }
        Ok(layer)
    }
}

fn insert_opt<T: Serialize>(
    layer: &mut Map<String, Value>,
    key: &str,
    value: &Option<T>,
) -> Result<(), LlmError> {
    if let Some(value) = value {
        layer.insert(key.to_string(), serde_json::to_value(value)?);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn layer_contains_only_set_fields() {
        let layer = OpenRouterChatSettings::new()
            .with_reasoning(ReasoningDirective::effort(ReasoningEffort::High))
            .with_usage_accounting(true)
            .with_logprobs(Logprobs::TopN(3))
            .to_layer()
            .unwrap();
        assert_eq!(
            Value::Object(layer),
            json!({
                "reasoning": {"effort": "high"},
                "usage": {"include": true},
                "logprobs": true,
                "top_logprobs": 3
            })
        );
    }

    #[test]
    fn extra_body_overrides_typed_fields() {
        let layer = OpenRouterChatSettings::new()
            .with_user("typed")
            .with_extra_body("user", json!("extra"))
            .with_extra_body("transforms", json!(["middle-out"]))
            .to_layer()
            .unwrap();
        assert_eq!(layer["user"], json!("extra"));
        assert_eq!(layer["transforms"], json!(["middle-out"]));
    }

    #[test]
    fn provider_preferences_keep_unknown_fields() {
        let prefs: ProviderPreferences = serde_json::from_value(json!({
            "order": ["anthropic"],
            "data_collection": "deny",
            "max_price": {"prompt": 1}
        }))
        .unwrap();
        assert_eq!(prefs.data_collection, Some(DataCollection::Deny));
        assert_eq!(prefs.extra["max_price"], json!({"prompt": 1}));
        assert_eq!(
            serde_json::to_value(&prefs).unwrap(),
            json!({"order": ["anthropic"], "data_collection": "deny", "max_price": {"prompt": 1}})
        );
    }
}
