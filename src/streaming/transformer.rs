//! Stream transformer: OpenRouter SSE chunks to [`StreamPart`]s.
//!
//! One instance per request. Blocks are opened lazily on the first fragment that
//! needs them and closed, in the order reasoning, text, tool calls, before the
//! stream ends. Parts are emitted strictly in arrival order.

use super::sse::SseChunk;
use super::stream_part::{StreamError, StreamPart};
use crate::error::ErrorEnvelope;
use crate::standards::openrouter::response::{provider_metadata, timestamp_from_secs};
use crate::standards::openrouter::types::{WireChunk, WireToolCall};
use crate::tools::{ToolCallBuilder, generate_tool_call_id};
use crate::types::{FinishReason, ReasoningDetail, UsageAccounting};
use serde_json::Value;

const TEXT_BLOCK_ID: &str = "text-0";
const REASONING_BLOCK_ID: &str = "reasoning-0";

/// Which endpoint the stream comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamMode {
    /// `/chat/completions`: content in `choices[0].delta`.
    #[default]
    Chat,
    /// `/completions`: content in `choices[0].text`.
    Completion,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Streaming,
    /// A finish reason arrived; waiting for the usage chunk.
    AwaitingUsage(FinishReason),
    Finished,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum ToolKey {
    Index(u32),
    Id(String),
}

#[derive(Debug)]
struct ToolSlot {
    key: ToolKey,
    id: Option<String>,
    name: Option<String>,
    input: String,
    started: bool,
}

#[derive(Debug)]
pub struct StreamTransformer {
    mode: StreamMode,
    phase: Phase,
    text_open: bool,
    reasoning_open: bool,
    reasoning_details: Vec<ReasoningDetail>,
    tools: Vec<ToolSlot>,
    response_id: Option<String>,
    model_id: Option<String>,
    provider: Option<String>,
}

impl StreamTransformer {
    pub fn new(mode: StreamMode) -> Self {
        Self {
            mode,
            phase: Phase::Streaming,
            text_open: false,
            reasoning_open: false,
            reasoning_details: Vec::new(),
            tools: Vec::new(),
            response_id: None,
            model_id: None,
            provider: None,
        }
    }

    pub fn chat() -> Self {
        Self::new(StreamMode::Chat)
    }

    pub fn completion() -> Self {
        Self::new(StreamMode::Completion)
    }

    /// Whether the stream reached a terminal state. Later input is ignored.
    pub fn is_finished(&self) -> bool {
        self.phase == Phase::Finished
    }

    pub fn process(&mut self, chunk: SseChunk) -> Vec<StreamPart> {
        match chunk {
            _ if self.is_finished() => Vec::new(),
            SseChunk::Done => self.finish(),
            SseChunk::Data(data) => self.process_data(&data),
        }
    }

    /// End of input, either `[DONE]` or the byte stream closing.
    ///
    /// A pending finish reason is emitted with zeroed usage. Without one, open
    /// blocks are closed and no `finish` is synthesized.
    pub fn finish(&mut self) -> Vec<StreamPart> {
        match self.phase {
            Phase::Finished => Vec::new(),
            Phase::AwaitingUsage(reason) => {
                let parts = vec![self.finish_part(reason, UsageAccounting::zero())];
                self.phase = Phase::Finished;
                parts
            }
            Phase::Streaming => {
                let mut parts = Vec::new();
                self.close_blocks(&mut parts);
                if !parts.is_empty() {
                    tracing::debug!(
                        target: "siumai::openrouter",
                        "stream ended without finish; closed open blocks"
                    );
                }
                self.phase = Phase::Finished;
                parts
            }
        }
    }

    /// The byte stream failed after the response started.
    pub fn fail_transport(&mut self, message: impl Into<String>) -> Vec<StreamPart> {
        self.fail_with(StreamError::Transport {
            message: message.into(),
        })
    }

    /// Terminate with an error raised outside chunk processing (framing or reads).
    pub fn fail_with(&mut self, error: StreamError) -> Vec<StreamPart> {
        if self.is_finished() {
            return Vec::new();
        }
        self.fail(error)
    }

    fn process_data(&mut self, data: &str) -> Vec<StreamPart> {
        let data = data.trim();
        if data.is_empty() {
            return Vec::new();
        }
        tracing::trace!(target: "siumai::openrouter", chunk = data, "sse chunk");

        let value: Value = match serde_json::from_str(data) {
            Ok(value) => value,
            Err(e) => {
                return self.fail(StreamError::Parse {
                    message: format!("invalid JSON in stream chunk: {e}"),
                    raw: data.to_string(),
                });
            }
        };
        if let Some(envelope) = ErrorEnvelope::from_value(&value) {
            tracing::warn!(
                target: "siumai::openrouter",
                message = %envelope.message,
                "error envelope in stream"
            );
            return self.fail(StreamError::Upstream(envelope));
        }
        let chunk: WireChunk = match serde_json::from_value(value) {
            Ok(chunk) => chunk,
            Err(e) => {
                return self.fail(StreamError::Parse {
                    message: format!("unexpected stream chunk shape: {e}"),
                    raw: data.to_string(),
                });
            }
        };

        let mut parts = Vec::new();
        if let Phase::AwaitingUsage(reason) = self.phase {
            // Content after the finish reason is dropped; only usage matters now.
            if let Some(usage) = &chunk.usage {
                self.capture_provider(&chunk);
                parts.push(self.finish_part(reason, UsageAccounting::normalize(usage)));
                self.phase = Phase::Finished;
            }
            return parts;
        }

        self.capture_provider(&chunk);
        self.push_metadata(&chunk, &mut parts);

        let choice = chunk.choices.first();
        if let Some(choice) = choice {
            match self.mode {
                StreamMode::Chat => {
                    if let Some(delta) = &choice.delta {
                        self.push_reasoning(
                            delta.reasoning.as_deref(),
                            delta.reasoning_details.as_ref(),
                            &mut parts,
                        );
                        self.push_text(delta.content.as_deref(), &mut parts);
                        for (position, call) in delta.tool_calls.iter().flatten().enumerate() {
                            self.push_tool_fragment(position, call, &mut parts);
                        }
                    }
                }
                StreamMode::Completion => self.push_text(choice.text.as_deref(), &mut parts),
            }
        }

        let finish_reason = choice.and_then(|c| c.finish_reason.as_deref());
        match (finish_reason, &chunk.usage) {
            (reason, Some(usage)) => {
                self.close_blocks(&mut parts);
                let reason = FinishReason::from_wire(reason);
                parts.push(self.finish_part(reason, UsageAccounting::normalize(usage)));
                self.phase = Phase::Finished;
            }
            (Some(reason), None) => {
                self.close_blocks(&mut parts);
                self.phase = Phase::AwaitingUsage(FinishReason::from_wire(Some(reason)));
            }
            (None, None) => {}
        }
        parts
    }

    fn fail(&mut self, error: StreamError) -> Vec<StreamPart> {
        let mut parts = Vec::new();
        self.close_blocks(&mut parts);
        parts.push(StreamPart::Error { error });
        parts.push(StreamPart::Finish {
            reason: FinishReason::Error,
            usage: UsageAccounting::unknown(),
            provider_metadata: None,
        });
        self.phase = Phase::Finished;
        parts
    }

    fn capture_provider(&mut self, chunk: &WireChunk) {
        if let Some(provider) = &chunk.provider {
            self.provider = Some(provider.clone());
        }
    }

    /// Emitted for the first identifiers seen and again whenever they change.
    fn push_metadata(&mut self, chunk: &WireChunk, parts: &mut Vec<StreamPart>) {
        let id_changed = chunk.id.is_some() && chunk.id != self.response_id;
        let model_changed = chunk.model.is_some() && chunk.model != self.model_id;
        if !id_changed && !model_changed {
            return;
        }
        if chunk.id.is_some() {
            self.response_id = chunk.id.clone();
        }
        if chunk.model.is_some() {
            self.model_id = chunk.model.clone();
        }
        parts.push(StreamPart::ResponseMetadata {
            id: self.response_id.clone(),
            model_id: self.model_id.clone(),
            timestamp: chunk.created.and_then(timestamp_from_secs),
        });
    }

    fn push_text(&mut self, text: Option<&str>, parts: &mut Vec<StreamPart>) {
        let Some(text) = text.filter(|t| !t.is_empty()) else {
            return;
        };
        if !self.text_open {
            self.text_open = true;
            parts.push(StreamPart::TextStart {
                id: TEXT_BLOCK_ID.to_string(),
            });
        }
        parts.push(StreamPart::TextDelta {
            id: TEXT_BLOCK_ID.to_string(),
            delta: text.to_string(),
        });
    }

    /// The flat `reasoning` string wins; details supply the text only without it.
    /// Same precedence as the non-streaming parser.
    fn push_reasoning(
        &mut self,
        reasoning: Option<&str>,
        details: Option<&Value>,
        parts: &mut Vec<StreamPart>,
    ) {
        let details = details.map(ReasoningDetail::parse_list).unwrap_or_default();
        let text = match reasoning.filter(|r| !r.is_empty()) {
            Some(reasoning) => reasoning.to_string(),
            None => details
                .iter()
                .filter_map(ReasoningDetail::visible_text)
                .collect::<String>(),
        };
        let keep: Vec<ReasoningDetail> = details.into_iter().filter(is_opaque).collect();

        if text.is_empty() && keep.is_empty() {
            return;
        }
        if !self.reasoning_open {
            self.reasoning_open = true;
            parts.push(StreamPart::ReasoningStart {
                id: REASONING_BLOCK_ID.to_string(),
            });
        }
        self.reasoning_details.extend(keep);
        if !text.is_empty() {
            parts.push(StreamPart::ReasoningDelta {
                id: REASONING_BLOCK_ID.to_string(),
                delta: text,
            });
        }
    }

    fn push_tool_fragment(
        &mut self,
        position: usize,
        call: &WireToolCall,
        parts: &mut Vec<StreamPart>,
    ) {
        let key = match (call.index, call.id.as_deref().filter(|id| !id.is_empty())) {
            (Some(index), _) => ToolKey::Index(index),
            (None, Some(id)) => ToolKey::Id(id.to_string()),
            (None, None) => ToolKey::Index(position as u32),
        };
        let slot_index = match self.tools.iter().position(|slot| slot.key == key) {
            Some(i) => i,
            None => {
                self.tools.push(ToolSlot {
                    key,
                    id: None,
                    name: None,
                    input: String::new(),
                    started: false,
                });
                self.tools.len() - 1
            }
        };
        let slot = &mut self.tools[slot_index];

        if slot.id.is_none()
            && let Some(id) = call.id.as_deref().filter(|id| !id.is_empty())
        {
            slot.id = Some(id.to_string());
        }
        if slot.name.is_none()
            && let Some(name) = call.function.name.as_deref().filter(|n| !n.is_empty())
        {
            slot.name = Some(name.to_string());
        }
        let fragment = match &call.function.arguments {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        };

        if slot.started {
            if !fragment.is_empty() {
                slot.input.push_str(&fragment);
                push_tool_delta(slot, fragment, parts);
            }
            return;
        }

        slot.input.push_str(&fragment);
        if slot.id.is_some() && slot.name.is_some() {
            start_tool(slot, parts);
        }
    }

    fn close_blocks(&mut self, parts: &mut Vec<StreamPart>) {
        if self.reasoning_open {
            self.reasoning_open = false;
            parts.push(StreamPart::ReasoningEnd {
                id: REASONING_BLOCK_ID.to_string(),
                details: std::mem::take(&mut self.reasoning_details),
            });
        }
        if self.text_open {
            self.text_open = false;
            parts.push(StreamPart::TextEnd {
                id: TEXT_BLOCK_ID.to_string(),
            });
        }
        for mut slot in std::mem::take(&mut self.tools) {
            if !slot.started {
                if slot.name.is_none() {
                    tracing::warn!(
                        target: "siumai::openrouter",
                        "dropping streamed tool call without a name"
                    );
                    continue;
                }
                if slot.id.is_none() {
                    slot.id = Some(generate_tool_call_id());
                }
                start_tool(&mut slot, parts);
            }
            let (Some(id), Some(name)) = (slot.id, slot.name) else {
                continue;
            };
            let input = match ToolCallBuilder::new(id.clone(), name)
                .set_input(slot.input.clone())
                .build()
            {
                Ok(call) => call.input,
                Err(e) => {
                    tracing::warn!(target: "siumai::openrouter", "invalid streamed tool call: {e}");
                    slot.input
                }
            };
            parts.push(StreamPart::ToolInputEnd {
                id: id.clone(),
                call_id: id,
                input,
            });
        }
    }

    fn finish_part(&self, reason: FinishReason, usage: UsageAccounting) -> StreamPart {
        let metadata = provider_metadata(&usage, self.provider.as_deref());
        StreamPart::Finish {
            reason,
            usage,
            provider_metadata: Some(metadata),
        }
    }
}

/// Emit the start for a slot whose id and name are known, flushing buffered input.
fn start_tool(slot: &mut ToolSlot, parts: &mut Vec<StreamPart>) {
    let (Some(id), Some(name)) = (&slot.id, &slot.name) else {
        return;
    };
    parts.push(StreamPart::ToolInputStart {
        id: id.clone(),
        call_id: id.clone(),
        name: name.clone(),
    });
    slot.started = true;
    if !slot.input.is_empty() {
        let buffered = slot.input.clone();
        push_tool_delta(slot, buffered, parts);
    }
}

fn push_tool_delta(slot: &ToolSlot, delta: String, parts: &mut Vec<StreamPart>) {
    if let Some(id) = &slot.id {
        parts.push(StreamPart::ToolInputDelta {
            id: id.clone(),
            call_id: id.clone(),
            delta,
        });
    }
}

fn is_opaque(detail: &ReasoningDetail) -> bool {
    matches!(
        detail,
        ReasoningDetail::Encrypted { .. }
            | ReasoningDetail::Text {
                signature: Some(_),
                ..
            }
    )
}
