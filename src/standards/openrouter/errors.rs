use crate::error::{ErrorEnvelope, LlmError};

/// Classify a non-2xx OpenRouter response.
///
/// OpenRouter returns the OpenAI-style envelope, usually with a numeric `code`
/// and an optional `metadata` object describing the upstream failure:
/// `{ "error": { "message": "...", "code": 429, "metadata": { ... } } }`
///
/// Bodies that are empty or do not carry the envelope keep the raw text and fall
/// back to `fallback_message` (typically the canonical status reason).
pub fn classify_openrouter_http_error(
    status: u16,
    body_text: &str,
    fallback_message: Option<&str>,
) -> LlmError {
    let mut envelope = ErrorEnvelope::from_body(body_text);
    if envelope.message == ErrorEnvelope::UNKNOWN_MESSAGE
        && let Some(fallback) = fallback_message.filter(|m| !m.is_empty())
    {
        envelope.message = fallback.to_string();
    }

    tracing::debug!(
        target: "siumai::openrouter",
        status,
        error_type = envelope.error_type.as_deref().unwrap_or(""),
        message = %envelope.message,
        "OpenRouter request failed"
    );

    LlmError::HttpError {
        status,
        envelope,
        body: body_text.to_string(),
    }
}
