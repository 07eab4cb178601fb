//! Token and cost accounting.
//!
//! Upstreams and callers name the same counters three different ways:
//! schema B (`inputTokens`/`outputTokens`), schema A (`promptTokens`/`completionTokens`)
//! and the wire's snake_case (`prompt_tokens`/`completion_tokens`).
//! [`UsageAccounting::normalize`] reconciles them into one shape.
//!
//! Counts are `f64` so that "usage unknown" can be signalled with `NaN`
//! (see [`UsageAccounting::unknown`]). `NaN` serializes as JSON `null`.

use crate::error::LlmError;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

const INPUT_KEYS: [&str; 3] = ["inputTokens", "promptTokens", "prompt_tokens"];
const OUTPUT_KEYS: [&str; 3] = ["outputTokens", "completionTokens", "completion_tokens"];
const TOTAL_KEYS: [&str; 2] = ["totalTokens", "total_tokens"];
const INPUT_DETAIL_KEYS: [&str; 3] = ["inputDetails", "promptTokensDetails", "prompt_tokens_details"];
const OUTPUT_DETAIL_KEYS: [&str; 3] = [
    "outputDetails",
    "completionTokensDetails",
    "completion_tokens_details",
];
const COST_KEY: &str = "cost";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageAccounting {
    #[serde(serialize_with = "serialize_token_count")]
    pub input_tokens: f64,
    #[serde(serialize_with = "serialize_token_count")]
    pub output_tokens: f64,
    #[serde(serialize_with = "serialize_token_count")]
    pub total_tokens: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_details: Option<Map<String, Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_details: Option<Map<String, Value>>,
    /// Billed cost in credits, when the upstream reports it (`usage: {include: true}`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
    /// Top-level fields this adapter does not know about, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Default for UsageAccounting {
    fn default() -> Self {
        Self::zero()
    }
}

impl UsageAccounting {
    pub fn new(input_tokens: f64, output_tokens: f64) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            input_details: None,
            output_details: None,
            cost: None,
            extra: Map::new(),
        }
    }

    pub fn zero() -> Self {
        Self::new(0.0, 0.0)
    }

    /// Usage attached to the synthetic finish emitted after a stream error.
    pub fn unknown() -> Self {
        Self::new(f64::NAN, f64::NAN)
    }

    pub fn is_unknown(&self) -> bool {
        self.input_tokens.is_nan() || self.output_tokens.is_nan() || self.total_tokens.is_nan()
    }

    pub fn with_total_tokens(mut self, total_tokens: f64) -> Self {
        self.total_tokens = total_tokens;
        self
    }

    pub fn with_cost(mut self, cost: f64) -> Self {
        self.cost = Some(cost);
        self
    }

    pub fn with_input_details(mut self, details: Map<String, Value>) -> Self {
        self.input_details = Some(details);
        self
    }

    pub fn with_output_details(mut self, details: Map<String, Value>) -> Self {
        self.output_details = Some(details);
        self
    }

    /// Normalize a raw usage object written in any of the supported naming schemes.
    ///
    /// Resolution per counter: schema B name, then schema A name, then wire snake_case,
    /// then `0`. `totalTokens` falls back to `input + output`. Non-object input yields zero usage.
    pub fn normalize(raw: &Value) -> Self {
        let Some(obj) = raw.as_object() else {
            return Self::zero();
        };

        let input_tokens = first_number(obj, &INPUT_KEYS).unwrap_or(0.0);
        let output_tokens = first_number(obj, &OUTPUT_KEYS).unwrap_or(0.0);
        let total_tokens =
            first_number(obj, &TOTAL_KEYS).unwrap_or(input_tokens + output_tokens);

        let extra = obj
            .iter()
            .filter(|(k, _)| !is_known_key(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Self {
            input_tokens,
            output_tokens,
            total_tokens,
            input_details: first_object(obj, &INPUT_DETAIL_KEYS),
            output_details: first_object(obj, &OUTPUT_DETAIL_KEYS),
            cost: obj.get(COST_KEY).and_then(Value::as_f64),
            extra,
        }
    }

    /// Strict variant of [`normalize`](Self::normalize) for API boundaries: both token
    /// counts must be present under one of their names and be non-negative numbers.
    pub fn from_value_strict(raw: &Value) -> Result<Self, LlmError> {
        let obj = raw
            .as_object()
            .ok_or_else(|| LlmError::ValidationError("usage must be a JSON object".to_string()))?;
        if first_number(obj, &INPUT_KEYS).is_none() {
            return Err(LlmError::ValidationError(
                "usage is missing a numeric input token count".to_string(),
            ));
        }
        if first_number(obj, &OUTPUT_KEYS).is_none() {
            return Err(LlmError::ValidationError(
                "usage is missing a numeric output token count".to_string(),
            ));
        }
        let usage = Self::normalize(raw);
        usage.validate()?;
        Ok(usage)
    }

    /// Check the non-negativity invariant. Unknown (`NaN`) usage fails validation.
    pub fn validate(&self) -> Result<(), LlmError> {
        for (name, value) in [
            ("inputTokens", self.input_tokens),
            ("outputTokens", self.output_tokens),
            ("totalTokens", self.total_tokens),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(LlmError::ValidationError(format!(
                    "{name} must be a non-negative number, got {value}"
                )));
            }
        }
        if let Some(cost) = self.cost
            && (!cost.is_finite() || cost < 0.0)
        {
            return Err(LlmError::ValidationError(format!(
                "cost must be a non-negative number, got {cost}"
            )));
        }
        Ok(())
    }

    /// Sum two records. Totals are recomputed from the summed counts; detail maps and
    /// extra fields are merged key-by-key, summing numeric leaves only.
    pub fn add(&self, other: &Self) -> Self {
        let input_tokens = self.input_tokens + other.input_tokens;
        let output_tokens = self.output_tokens + other.output_tokens;
        Self {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            input_details: merge_optional_maps(&self.input_details, &other.input_details),
            output_details: merge_optional_maps(&self.output_details, &other.output_details),
            cost: match (self.cost, other.cost) {
                (Some(a), Some(b)) => Some(a + b),
                (a, b) => a.or(b),
            },
            extra: merge_numeric_maps(&self.extra, &other.extra),
        }
    }

    /// `completion_tokens_details.reasoning_tokens` (or its schema B spelling).
    pub fn reasoning_tokens(&self) -> Option<f64> {
        detail_number(&self.output_details, &["reasoningTokens", "reasoning_tokens"])
            .or_else(|| self.extra.get("reasoningTokens").and_then(Value::as_f64))
    }

    /// `prompt_tokens_details.cached_tokens` (or its schema B spelling).
    pub fn cached_input_tokens(&self) -> Option<f64> {
        detail_number(&self.input_details, &["cachedTokens", "cached_tokens"])
            .or_else(|| self.extra.get("cachedInputTokens").and_then(Value::as_f64))
    }
}

impl std::ops::Add for &UsageAccounting {
    type Output = UsageAccounting;

    fn add(self, rhs: Self) -> UsageAccounting {
        UsageAccounting::add(self, rhs)
    }
}

impl std::iter::Sum for UsageAccounting {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::zero(), |acc, u| acc.add(&u))
    }
}

/// Whole counts render as integers, `NaN`/infinity render as `null`.
pub(crate) fn serialize_token_count<S: Serializer>(value: &f64, s: S) -> Result<S::Ok, S::Error> {
    if !value.is_finite() {
        return s.serialize_none();
    }
    if value.fract() == 0.0 && *value >= 0.0 && *value <= u64::MAX as f64 {
        return s.serialize_u64(*value as u64);
    }
    s.serialize_f64(*value)
}

fn is_known_key(key: &str) -> bool {
    key == COST_KEY
        || INPUT_KEYS.contains(&key)
        || OUTPUT_KEYS.contains(&key)
        || TOTAL_KEYS.contains(&key)
        || INPUT_DETAIL_KEYS.contains(&key)
        || OUTPUT_DETAIL_KEYS.contains(&key)
}

fn first_number(obj: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| obj.get(*k).and_then(Value::as_f64))
}

fn first_object(obj: &Map<String, Value>, keys: &[&str]) -> Option<Map<String, Value>> {
    keys.iter()
        .find_map(|k| obj.get(*k).and_then(Value::as_object))
        .cloned()
}

fn detail_number(details: &Option<Map<String, Value>>, keys: &[&str]) -> Option<f64> {
    let details = details.as_ref()?;
    keys.iter().find_map(|k| details.get(*k).and_then(Value::as_f64))
}

fn merge_optional_maps(
    a: &Option<Map<String, Value>>,
    b: &Option<Map<String, Value>>,
) -> Option<Map<String, Value>> {
    match (a, b) {
        (Some(a), Some(b)) => Some(merge_numeric_maps(a, b)),
        (Some(m), None) | (None, Some(m)) => Some(m.clone()),
        (None, None) => None,
    }
}

fn merge_numeric_maps(a: &Map<String, Value>, b: &Map<String, Value>) -> Map<String, Value> {
    let mut out = a.clone();
    for (key, right) in b {
        let merged = match out.get(key) {
            None => right.clone(),
            Some(left) => merge_leaf(left, right),
        };
        out.insert(key.clone(), merged);
    }
    out
}

// A numeric leaf survives when the other side is absent or non-numeric.
fn merge_leaf(left: &Value, right: &Value) -> Value {
    match (left, right) {
        (Value::Number(l), Value::Number(r)) => sum_numbers(l, r),
        (Value::Object(l), Value::Object(r)) => Value::Object(merge_numeric_maps(l, r)),
        (Value::Number(_), _) => left.clone(),
        (_, Value::Number(_)) => right.clone(),
        _ => left.clone(),
    }
}

fn sum_numbers(l: &serde_json::Number, r: &serde_json::Number) -> Value {
    if let (Some(a), Some(b)) = (l.as_u64(), r.as_u64())
        && let Some(sum) = a.checked_add(b)
    {
        return Value::from(sum);
    }
    let sum = l.as_f64().unwrap_or(0.0) + r.as_f64().unwrap_or(0.0);
    serde_json::Number::from_f64(sum)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn normalizes_wire_usage() {
        let usage = UsageAccounting::normalize(&json!({
            "prompt_tokens": 4,
            "completion_tokens": 30,
            "total_tokens": 34
        }));
        assert_eq!(usage.input_tokens, 4.0);
        assert_eq!(usage.output_tokens, 30.0);
        assert_eq!(usage.total_tokens, 34.0);
        assert!(usage.extra.is_empty());
    }

    #[test]
    fn schema_b_names_win_over_schema_a() {
        let usage = UsageAccounting::normalize(&json!({
            "inputTokens": 10,
            "promptTokens": 99,
            "outputTokens": 5,
            "completionTokens": 77
        }));
        assert_eq!(usage.input_tokens, 10.0);
        assert_eq!(usage.output_tokens, 5.0);
        assert_eq!(usage.total_tokens, 15.0);
    }

    #[test]
    fn schema_a_wins_over_snake_case() {
        let usage = UsageAccounting::normalize(&json!({
            "promptTokens": 3,
            "prompt_tokens": 300,
            "completion_tokens": 2
        }));
        assert_eq!(usage.input_tokens, 3.0);
        assert_eq!(usage.output_tokens, 2.0);
        assert_eq!(usage.total_tokens, 5.0);
    }

    #[test]
    fn authoritative_total_is_kept() {
        let usage = UsageAccounting::normalize(&json!({
            "prompt_tokens": 10,
            "completion_tokens": 20,
            "total_tokens": 35
        }));
        assert_eq!(usage.total_tokens, 35.0);
    }

    #[test]
    fn missing_fields_default_to_zero() {
        let usage = UsageAccounting::normalize(&json!({}));
        assert_eq!(usage, UsageAccounting::zero());
        assert_eq!(UsageAccounting::normalize(&Value::Null), UsageAccounting::zero());
    }

    #[test]
    fn keeps_details_cost_and_unknown_fields() {
        let usage = UsageAccounting::normalize(&json!({
            "prompt_tokens": 194,
            "completion_tokens": 2,
            "total_tokens": 196,
            "cost": 0.000_95,
            "is_byok": false,
            "prompt_tokens_details": {"cached_tokens": 128},
            "completion_tokens_details": {"reasoning_tokens": 1},
            "cost_details": {"upstream_inference_cost": 0.0009}
        }));
        assert_eq!(usage.cost, Some(0.000_95));
        assert_eq!(usage.cached_input_tokens(), Some(128.0));
        assert_eq!(usage.reasoning_tokens(), Some(1.0));
        assert_eq!(usage.extra["is_byok"], json!(false));
        assert_eq!(
            usage.extra["cost_details"],
            json!({"upstream_inference_cost": 0.0009})
        );
        assert!(!usage.extra.contains_key("prompt_tokens"));
    }

    #[test]
    fn add_sums_numeric_detail_leaves_only() {
        let a = UsageAccounting::normalize(&json!({
            "prompt_tokens": 10,
            "completion_tokens": 5,
            "prompt_tokens_details": {"cached_tokens": 4, "audio_tokens": null}
        }));
        let b = UsageAccounting::normalize(&json!({
            "prompt_tokens": 1,
            "completion_tokens": 2,
            "total_tokens": 1000,
            "prompt_tokens_details": {"cached_tokens": 6, "audio_tokens": 3}
        }));
        let sum = a.add(&b);
        assert_eq!(sum.input_tokens, 11.0);
        assert_eq!(sum.output_tokens, 7.0);
        assert_eq!(sum.total_tokens, 18.0);
        let details = sum.input_details.unwrap();
        assert_eq!(details["cached_tokens"], json!(10));
        assert_eq!(details["audio_tokens"], json!(3));
    }

    #[test]
    fn add_sums_cost_when_present_on_either_side() {
        let a = UsageAccounting::new(1.0, 1.0).with_cost(0.5);
        let b = UsageAccounting::new(1.0, 1.0);
        assert_eq!(a.add(&b).cost, Some(0.5));
        assert_eq!(a.add(&a).cost, Some(1.0));
        assert_eq!(b.add(&b).cost, None);
    }

    #[test]
    fn nan_usage_serializes_as_null() {
        let value = serde_json::to_value(UsageAccounting::unknown()).unwrap();
        assert_eq!(
            value,
            json!({"inputTokens": null, "outputTokens": null, "totalTokens": null})
        );
    }

    #[test]
    fn whole_counts_serialize_as_integers() {
        let value = serde_json::to_value(UsageAccounting::new(4.0, 30.0)).unwrap();
        assert_eq!(
            value,
            json!({"inputTokens": 4, "outputTokens": 30, "totalTokens": 34})
        );
    }

    #[test]
    fn strict_parse_rejects_missing_and_negative_counts() {
        match UsageAccounting::from_value_strict(&json!({"prompt_tokens": 1})) {
            Err(LlmError::ValidationError(msg)) => assert!(msg.contains("output")),
            other => panic!("unexpected result: {other:?}"),
        }
        match UsageAccounting::from_value_strict(&json!({"inputTokens": -1, "outputTokens": 2})) {
            Err(LlmError::ValidationError(msg)) => assert!(msg.contains("inputTokens")),
            other => panic!("unexpected result: {other:?}"),
        }
        let ok = UsageAccounting::from_value_strict(&json!({"promptTokens": 1, "completionTokens": 2}))
            .unwrap();
        assert_eq!(ok.total_tokens, 3.0);
    }

    #[test]
    fn unknown_usage_fails_validation() {
        assert!(UsageAccounting::unknown().validate().is_err());
        assert!(UsageAccounting::unknown().is_unknown());
    }

    fn usage_strategy() -> impl Strategy<Value = UsageAccounting> {
        (0u32..1_000_000, 0u32..1_000_000, 0u32..10_000).prop_map(|(i, o, cached)| {
            let mut details = Map::new();
            details.insert("cached_tokens".to_string(), Value::from(cached));
            UsageAccounting::new(f64::from(i), f64::from(o)).with_input_details(details)
        })
    }

    proptest! {
        #[test]
        fn add_is_commutative(a in usage_strategy(), b in usage_strategy()) {
            prop_assert_eq!(a.add(&b), b.add(&a));
        }

        #[test]
        fn add_is_associative(a in usage_strategy(), b in usage_strategy(), c in usage_strategy()) {
            prop_assert_eq!(a.add(&b).add(&c), a.add(&b.add(&c)));
        }

        #[test]
        fn add_preserves_consistent_totals(a in usage_strategy(), b in usage_strategy()) {
            prop_assert_eq!(a.add(&b).total_tokens, a.total_tokens + b.total_tokens);
        }
    }
}
