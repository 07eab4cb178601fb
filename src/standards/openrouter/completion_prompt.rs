//! Flattening a chat prompt for the raw `/completions` endpoint.

use crate::error::LlmError;
use crate::types::{ContentPart, Message, MessageContent, Role};

const USER_PREFIX: &str = "user";
const ASSISTANT_PREFIX: &str = "assistant";

/// A flattened prompt and the stop sequences that keep the model from writing the next user turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionPrompt {
    pub prompt: String,
    pub stop_sequences: Vec<String>,
}

/// Render `user:`/`assistant:` turns, ending with an open `assistant:` turn.
///
/// Only a leading system message is allowed; it becomes a preamble.
pub fn to_completion_prompt(prompt: &[Message]) -> Result<CompletionPrompt, LlmError> {
    let Some(first) = prompt.first() else {
        return Err(LlmError::ValidationError(
            "prompt must contain at least one message".to_string(),
        ));
    };

    let mut text = String::new();
    let rest = if first.role == Role::System {
        text.push_str(&plain_text(first)?);
        text.push_str("\n\n");
        &prompt[1..]
    } else {
        prompt
    };

    for message in rest {
        let prefix = match message.role {
            Role::User => USER_PREFIX,
            Role::Assistant => ASSISTANT_PREFIX,
            Role::System => {
                return Err(LlmError::UnsupportedContent(
                    "system messages are only supported at the start of a completion prompt"
                        .to_string(),
                ));
            }
            Role::Tool => {
                return Err(LlmError::UnsupportedContent(
                    "tool messages are not supported by the completion endpoint".to_string(),
                ));
            }
        };
        text.push_str(prefix);
        text.push_str(":\n");
        text.push_str(&plain_text(message)?);
        text.push_str("\n\n");
    }

    text.push_str(ASSISTANT_PREFIX);
    text.push_str(":\n");

    Ok(CompletionPrompt {
        prompt: text,
        stop_sequences: vec![format!("\n{USER_PREFIX}:")],
    })
}

fn plain_text(message: &Message) -> Result<String, LlmError> {
    match &message.content {
        MessageContent::Text(text) => Ok(text.clone()),
        MessageContent::Parts(parts) => {
            let mut text = String::new();
            for part in parts {
                match part {
                    ContentPart::Text { text: t, .. } => text.push_str(t),
                    other => {
                        return Err(LlmError::UnsupportedContent(format!(
                            "{} parts are not supported by the completion endpoint",
                            other.kind()
                        )));
                    }
                }
            }
            Ok(text)
        }
    }
}
