//! Prompt <-> wire message conversion.

use super::types::WireMessage;
use crate::error::LlmError;
use crate::tools::{from_typed_wire_call, to_wire_call};
use crate::types::{
    CacheControl, ContentPart, MediaData, Message, MessageContent, ReasoningBlock,
    ReasoningDetail, Role,
};
use serde_json::{Value, json};

const DEFAULT_IMAGE_MEDIA_TYPE: &str = "image/jpeg";
const DEFAULT_FILE_MEDIA_TYPE: &str = "application/octet-stream";

/// Convert a normalized prompt into the upstream `messages` array.
pub fn to_wire_messages(prompt: &[Message]) -> Result<Vec<WireMessage>, LlmError> {
    if prompt.is_empty() {
        return Err(LlmError::ValidationError(
            "prompt must contain at least one message".to_string(),
        ));
    }

    let mut out = Vec::with_capacity(prompt.len());
    for message in prompt {
        match message.role {
            Role::System => out.push(convert_system(message)?),
            Role::User => out.push(convert_user(message)?),
            Role::Assistant => out.push(convert_assistant(message)?),
            Role::Tool => out.extend(convert_tool(message)?),
        }
    }
    Ok(out)
}

fn convert_system(message: &Message) -> Result<WireMessage, LlmError> {
    let (text, part_hint) = match &message.content {
        MessageContent::Text(text) => (text.clone(), None),
        MessageContent::Parts(parts) => {
            let mut text = String::new();
            for part in parts {
                match part {
                    ContentPart::Text { text: t, .. } => text.push_str(t),
                    other => return Err(unsupported_part(other, Role::System)),
                }
            }
            let hint = match parts.as_slice() {
                [single] => single.cache_control().cloned(),
                _ => None,
            };
            (text, hint)
        }
    };
    Ok(WireMessage {
        role: Role::System.as_str().to_string(),
        content: Some(Value::String(text)),
        name: message.name.clone(),
        cache_control: part_hint.or_else(|| message.cache_control.clone()),
        ..Default::default()
    })
}

fn convert_user(message: &Message) -> Result<WireMessage, LlmError> {
    let mut wire = WireMessage {
        role: Role::User.as_str().to_string(),
        name: message.name.clone(),
        ..Default::default()
    };

    match &message.content {
        MessageContent::Text(text) => {
            wire.content = Some(Value::String(text.clone()));
            wire.cache_control = message.cache_control.clone();
        }
        MessageContent::Parts(parts) => match parts.as_slice() {
            // Single text part: bare string, resolved hint moves to the message.
            [ContentPart::Text {
                text,
                cache_control,
            }] => {
                wire.content = Some(Value::String(text.clone()));
                wire.cache_control = cache_control
                    .clone()
                    .or_else(|| message.cache_control.clone());
            }
            _ => {
                let converted = parts
                    .iter()
                    .map(|part| convert_user_part(part, message.cache_control.as_ref()))
                    .collect::<Result<Vec<_>, _>>()?;
                wire.content = Some(Value::Array(converted));
            }
        },
    }
    Ok(wire)
}

fn convert_user_part(
    part: &ContentPart,
    message_hint: Option<&CacheControl>,
) -> Result<Value, LlmError> {
    let resolved = part.cache_control().or(message_hint);
    let mut value = match part {
        // Text parts keep only their own hint.
        ContentPart::Text {
            text,
            cache_control,
        } => {
            let mut value = json!({"type": "text", "text": text});
            insert_cache_control(&mut value, cache_control.as_ref());
            return Ok(value);
        }
        ContentPart::Image {
            data, media_type, ..
        } => {
            let media_type = media_type.as_deref().unwrap_or(DEFAULT_IMAGE_MEDIA_TYPE);
            json!({"type": "image_url", "image_url": {"url": data.to_url(media_type)}})
        }
        ContentPart::File {
            data,
            filename,
            media_type,
            ..
        } => {
            if media_type.trim().is_empty() {
                return Err(LlmError::ValidationError(
                    "file parts require a media type".to_string(),
                ));
            }
            json!({
                "type": "file",
                "file": {
                    "filename": filename.as_deref().unwrap_or("file"),
                    "file_data": data.to_url(media_type),
                }
            })
        }
        other => return Err(unsupported_part(other, Role::User)),
    };
    insert_cache_control(&mut value, resolved);
    Ok(value)
}

fn convert_assistant(message: &Message) -> Result<WireMessage, LlmError> {
    let mut text = String::new();
    let mut reasoning = String::new();
    let mut details: Vec<ReasoningDetail> = Vec::new();
    let mut tool_calls = Vec::new();

    match &message.content {
        MessageContent::Text(t) => text.push_str(t),
        MessageContent::Parts(parts) => {
            for part in parts {
                match part {
                    ContentPart::Text { text: t, .. } => text.push_str(t),
                    ContentPart::Reasoning(block) => {
                        reasoning.push_str(&block.text);
                        details.extend(block.details.iter().cloned());
                    }
                    ContentPart::ToolCall(call) => tool_calls.push(to_wire_call(call)),
                    other => return Err(unsupported_part(other, Role::Assistant)),
                }
            }
        }
    }

    let reasoning_details = if details.is_empty() {
        None
    } else {
        Some(serde_json::to_value(&details)?)
    };

    Ok(WireMessage {
        role: Role::Assistant.as_str().to_string(),
        content: Some(Value::String(text)),
        name: message.name.clone(),
        tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
        reasoning: (!reasoning.is_empty()).then_some(reasoning),
        reasoning_details,
        cache_control: message.cache_control.clone(),
        ..Default::default()
    })
}

fn convert_tool(message: &Message) -> Result<Vec<WireMessage>, LlmError> {
    let MessageContent::Parts(parts) = &message.content else {
        return Err(LlmError::UnsupportedContent(
            "tool messages must contain tool-result parts".to_string(),
        ));
    };

    parts
        .iter()
        .map(|part| match part {
            ContentPart::ToolResult {
                tool_call_id,
                result,
                cache_control,
                ..
            } => {
                Ok(WireMessage {
                    role: Role::Tool.as_str().to_string(),
                    content: Some(Value::String(result.to_string())),
                    tool_call_id: Some(tool_call_id.clone()),
                    cache_control: cache_control
                        .clone()
                        .or_else(|| message.cache_control.clone()),
                    ..Default::default()
                })
            }
            other => Err(unsupported_part(other, Role::Tool)),
        })
        .collect()
}

/// Convert an upstream message back into a normalized [`Message`].
pub fn from_wire_message(wire: &WireMessage) -> Result<Message, LlmError> {
    let role: Role = wire.role.parse()?;
    let mut message = match role {
        Role::System | Role::User => Message::new(role, read_content(wire.content.as_ref())?),
        Role::Assistant => read_assistant(wire)?,
        Role::Tool => read_tool(wire)?,
    };
    message.name = wire.name.clone();
    if role != Role::Tool {
        message.cache_control = wire.cache_control.clone();
    }
    Ok(message)
}

fn read_content(content: Option<&Value>) -> Result<MessageContent, LlmError> {
    match content {
        None | Some(Value::Null) => Ok(MessageContent::Text(String::new())),
        Some(Value::String(text)) => Ok(MessageContent::Text(text.clone())),
        Some(Value::Array(items)) => items
            .iter()
            .map(read_part)
            .collect::<Result<Vec<_>, _>>()
            .map(MessageContent::Parts),
        Some(other) => Err(LlmError::UnsupportedContent(format!(
            "message content must be a string or an array, got {other}"
        ))),
    }
}

fn read_part(item: &Value) -> Result<ContentPart, LlmError> {
    let cache_control = item
        .get("cache_control")
        .and_then(|v| serde_json::from_value::<CacheControl>(v.clone()).ok());
    let kind = item.get("type").and_then(Value::as_str).unwrap_or_default();
    match kind {
        "text" => Ok(ContentPart::Text {
            text: str_field(item, "text").to_string(),
            cache_control,
        }),
        "image_url" => {
            let image_url = item.get("image_url");
            let url = image_url
                .and_then(|v| v.get("url").or(Some(v)))
                .and_then(Value::as_str)
                .unwrap_or_default();
            let (data, media_type) = MediaData::from_url(url);
            Ok(ContentPart::Image {
                data,
                media_type,
                cache_control,
            })
        }
        "file" => {
            let file = item.get("file").cloned().unwrap_or(Value::Null);
            let (data, media_type) = MediaData::from_url(str_field(&file, "file_data"));
            Ok(ContentPart::File {
                data,
                filename: file
                    .get("filename")
                    .and_then(Value::as_str)
                    .map(str::to_string),
                media_type: media_type.unwrap_or_else(|| DEFAULT_FILE_MEDIA_TYPE.to_string()),
                cache_control,
            })
        }
        other => Err(LlmError::UnsupportedContent(format!(
            "unknown content part type '{other}'"
        ))),
    }
}

fn read_assistant(wire: &WireMessage) -> Result<Message, LlmError> {
    let text = match read_content(wire.content.as_ref())? {
        MessageContent::Text(text) => text,
        MessageContent::Parts(parts) => parts
            .iter()
            .filter_map(|p| match p {
                ContentPart::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect(),
    };

    let details = wire
        .reasoning_details
        .as_ref()
        .map(ReasoningDetail::parse_list)
        .unwrap_or_default();
    let reasoning = match &wire.reasoning {
        Some(text) => Some(ReasoningBlock::new(text.clone()).with_details(details)),
        None if !details.is_empty() => Some(ReasoningBlock::from_details(details)),
        None => None,
    };

    let mut tool_calls = Vec::new();
    for (index, call) in wire.tool_calls.iter().flatten().enumerate() {
        tool_calls.push(from_typed_wire_call(call, || format!("call_{index}"))?);
    }

    if reasoning.is_none() && tool_calls.is_empty() {
        return Ok(Message::assistant(text));
    }

    let mut parts = Vec::new();
    if !text.is_empty() {
        parts.push(ContentPart::text(text));
    }
    if let Some(reasoning) = reasoning {
        parts.push(ContentPart::Reasoning(reasoning));
    }
    parts.extend(tool_calls.into_iter().map(ContentPart::ToolCall));
    Ok(Message::assistant_parts(parts))
}

fn read_tool(wire: &WireMessage) -> Result<Message, LlmError> {
    let tool_call_id = wire
        .tool_call_id
        .clone()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| {
            LlmError::ValidationError("tool messages require a tool_call_id".to_string())
        })?;
    let result = match &wire.content {
        Some(Value::String(s)) => {
            serde_json::from_str(s).unwrap_or_else(|_| Value::String(s.clone()))
        }
        Some(other) => other.clone(),
        None => Value::Null,
    };
    let part = ContentPart::tool_result(tool_call_id, result);
    let part = match &wire.cache_control {
        Some(hint) => part.with_cache_control(hint.clone()),
        None => part,
    };
    Ok(Message::new(Role::Tool, MessageContent::Parts(vec![part])))
}

fn insert_cache_control(value: &mut Value, hint: Option<&CacheControl>) {
    if let (Some(hint), Some(obj)) = (hint, value.as_object_mut())
        && let Ok(hint) = serde_json::to_value(hint)
    {
        obj.insert("cache_control".to_string(), hint);
    }
}

fn str_field<'a>(value: &'a Value, key: &str) -> &'a str {
    value.get(key).and_then(Value::as_str).unwrap_or_default()
}

fn unsupported_part(part: &ContentPart, role: Role) -> LlmError {
    LlmError::UnsupportedContent(format!(
        "{} parts are not supported in {role} messages",
        part.kind()
    ))
}
