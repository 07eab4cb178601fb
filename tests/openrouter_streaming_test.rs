//! Streaming tests: SSE fixtures driven through the provider, over wiremock and over a
//! scripted transport.

mod support;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{StreamExt, stream};
use serde_json::{Value, json};
use siumai_provider_openrouter::encoding::encode_part_stream_as_sse;
use siumai_provider_openrouter::execution::http::{
    ByteStream, HttpTransport, HttpTransportRequest, HttpTransportResponse,
    HttpTransportStreamResponse,
};
use siumai_provider_openrouter::prelude::*;
use siumai_provider_openrouter::standards::openrouter::parse_chat_response;
use siumai_provider_openrouter::streaming::{StreamTransformer, into_part_stream};
use std::sync::{Arc, Mutex};
use support::{collect_parts, load_sse_fixture, load_sse_fixture_as_bytes, part_types, provider_for};
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_sse(server: &MockServer, endpoint: &str, fixture: &str) {
    Mock::given(method("POST"))
        .and(path(format!("/api/v1{endpoint}")))
        .and(header("accept", "text/event-stream"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/event-stream")
                .set_body_raw(load_sse_fixture(fixture), "text/event-stream"),
        )
        .mount(server)
        .await;
}

fn finish_of(parts: &[StreamPart]) -> (&FinishReason, &UsageAccounting) {
    match parts.last() {
        Some(StreamPart::Finish { reason, usage, .. }) => (reason, usage),
        other => panic!("unexpected last part: {other:?}"),
    }
}

fn text_of(parts: &[StreamPart]) -> String {
    parts
        .iter()
        .filter_map(|part| match part {
            StreamPart::TextDelta { delta, .. } => Some(delta.as_str()),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn chat_stream_text_fixture() {
    let server = MockServer::start().await;
    mount_sse(&server, "/chat/completions", "chat_text.sse").await;

    let model = provider_for(&server)
        .chat("openai/gpt-4o-mini", OpenRouterChatSettings::new())
        .unwrap();
    let parts = collect_parts(model.stream(CallOptions::from_user_text("Hi")).await.unwrap()).await;

    assert_eq!(
        part_types(&parts),
        vec![
            "response-metadata",
            "text-start",
            "text-delta",
            "text-delta",
            "text-end",
            "finish"
        ]
    );
    assert_eq!(text_of(&parts), "Hello, world");
    match &parts[0] {
        StreamPart::ResponseMetadata {
            id,
            model_id,
            timestamp,
        } => {
            assert_eq!(id.as_deref(), Some("gen-1700000000-abc"));
            assert_eq!(model_id.as_deref(), Some("openai/gpt-4o-mini"));
            assert_eq!(timestamp.map(|t| t.timestamp()), Some(1_700_000_000));
        }
        other => panic!("unexpected part: {other:?}"),
    }
    match parts.last() {
        Some(StreamPart::Finish {
            reason,
            usage,
            provider_metadata: Some(metadata),
        }) => {
            assert_eq!(*reason, FinishReason::Stop);
            assert_eq!(usage.input_tokens, 12.0);
            assert_eq!(usage.output_tokens, 4.0);
            assert_eq!(usage.total_tokens, 16.0);
            assert_eq!(usage.cost, Some(0.00012));
            assert_eq!(metadata["openrouter"]["provider"], json!("OpenAI"));
        }
        other => panic!("unexpected last part: {other:?}"),
    }

    let body = support::sent_body(&server).await;
    assert_eq!(body["stream"], json!(true));
    assert_eq!(body["stream_options"], json!({"include_usage": true}));
}

#[tokio::test]
async fn chat_stream_tool_call_fixture() {
    let server = MockServer::start().await;
    mount_sse(&server, "/chat/completions", "chat_tool_call.sse").await;

    let model = provider_for(&server)
        .chat("anthropic/claude-3.5-sonnet", OpenRouterChatSettings::new())
        .unwrap();
    let options = CallOptions::from_user_text("Weather?").with_tools(vec![ToolDefinition::function(
        "get_weather",
        json!({"type": "object", "properties": {"location": {"type": "string"}}}),
    )]);
    let parts = collect_parts(model.stream(options).await.unwrap()).await;

    assert_eq!(
        part_types(&parts),
        vec![
            "response-metadata",
            "tool-input-start",
            "tool-input-delta",
            "tool-input-delta",
            "tool-input-end",
            "finish"
        ]
    );
    match &parts[1] {
        StreamPart::ToolInputStart { id, call_id, name } => {
            assert_eq!(id, "toolu_01");
            assert_eq!(call_id, "toolu_01");
            assert_eq!(name, "get_weather");
        }
        other => panic!("unexpected part: {other:?}"),
    }
    match &parts[4] {
        StreamPart::ToolInputEnd { input, .. } => {
            let input: Value = serde_json::from_str(input).unwrap();
            assert_eq!(input, json!({"location": "Paris"}));
        }
        other => panic!("unexpected part: {other:?}"),
    }
    let (reason, usage) = finish_of(&parts);
    assert_eq!(*reason, FinishReason::ToolCalls);
    assert_eq!(usage.total_tokens, 70.0);
}

#[tokio::test]
async fn chat_stream_reasoning_fixture() {
    let server = MockServer::start().await;
    mount_sse(&server, "/chat/completions", "chat_reasoning.sse").await;

    let model = provider_for(&server)
        .chat("deepseek/deepseek-r1", OpenRouterChatSettings::new())
        .unwrap();
    let parts = collect_parts(model.stream(CallOptions::from_user_text("?")).await.unwrap()).await;

    assert_eq!(
        part_types(&parts),
        vec![
            "response-metadata",
            "reasoning-start",
            "reasoning-delta",
            "reasoning-delta",
            "text-start",
            "text-delta",
            "reasoning-end",
            "text-end",
            "finish"
        ]
    );
    let reasoning: String = parts
        .iter()
        .filter_map(|part| match part {
            StreamPart::ReasoningDelta { id, delta } => {
                assert_eq!(id, "reasoning-0");
                Some(delta.as_str())
            }
            _ => None,
        })
        .collect();
    assert_eq!(reasoning, "The user asks for a number.");
    assert_eq!(text_of(&parts), "42");
    let (_, usage) = finish_of(&parts);
    assert_eq!(usage.reasoning_tokens(), Some(26.0));
}

#[tokio::test]
async fn mid_stream_error_closes_blocks_and_ends_stream() {
    let server = MockServer::start().await;
    mount_sse(&server, "/chat/completions", "chat_midstream_error.sse").await;

    let model = provider_for(&server)
        .chat("openai/gpt-4o", OpenRouterChatSettings::new())
        .unwrap();
    let parts = collect_parts(model.stream(CallOptions::from_user_text("Hi")).await.unwrap()).await;

    assert_eq!(
        part_types(&parts),
        vec![
            "response-metadata",
            "text-start",
            "text-delta",
            "text-end",
            "error",
            "finish"
        ]
    );
    assert_eq!(text_of(&parts), "Partial");
    match &parts[4] {
        StreamPart::Error {
            error: StreamError::Upstream(envelope),
        } => assert_eq!(envelope.message, "Provider disconnected unexpectedly"),
        other => panic!("unexpected part: {other:?}"),
    }
    let (reason, usage) = finish_of(&parts);
    assert_eq!(*reason, FinishReason::Error);
    assert!(usage.is_unknown());
}

#[tokio::test]
async fn http_error_before_stream_is_returned_directly() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"code": 401, "message": "No auth credentials found"}
        })))
        .mount(&server)
        .await;

    let model = provider_for(&server)
        .chat("openai/gpt-4o", OpenRouterChatSettings::new())
        .unwrap();
    let err = match model.stream(CallOptions::from_user_text("Hi")).await {
        Ok(_) => panic!("expected an error before the stream started"),
        Err(err) => err,
    };
    assert_eq!(err.status_code(), Some(401));
    assert_eq!(err.category(), ErrorCategory::Authentication);
}

#[tokio::test]
async fn completion_stream_fixture() {
    let server = MockServer::start().await;
    mount_sse(&server, "/completions", "completion_text.sse").await;

    let model = provider_for(&server)
        .completion("mistralai/mistral-7b-instruct", OpenRouterChatSettings::new())
        .unwrap();
    let parts =
        collect_parts(model.stream(CallOptions::from_user_text("Tell a story")).await.unwrap())
            .await;

    assert_eq!(
        part_types(&parts),
        vec![
            "response-metadata",
            "text-start",
            "text-delta",
            "text-delta",
            "text-end",
            "finish"
        ]
    );
    assert_eq!(text_of(&parts), "Once upon a time");
    let (reason, usage) = finish_of(&parts);
    assert_eq!(*reason, FinishReason::Length);
    assert_eq!(usage.total_tokens, 9.0);
}

#[tokio::test]
async fn fixture_split_by_event_matches_single_read() {
    let split = into_part_stream(
        stream::iter(load_sse_fixture_as_bytes("chat_tool_call.sse")),
        StreamTransformer::chat(),
        None,
    );
    let whole = into_part_stream(
        stream::iter(vec![Ok::<_, std::io::Error>(
            load_sse_fixture("chat_tool_call.sse").into_bytes(),
        )]),
        StreamTransformer::chat(),
        None,
    );
    assert_eq!(collect_parts(split).await, collect_parts(whole).await);
}

#[tokio::test]
async fn schema_a_sse_reencoding() {
    let parts = into_part_stream(
        stream::iter(load_sse_fixture_as_bytes("chat_text.sse")),
        StreamTransformer::chat(),
        None,
    );
    let frames: Vec<Bytes> = encode_part_stream_as_sse(parts, SchemaVersion::A)
        .map(|frame| frame.unwrap())
        .collect()
        .await;

    let last = frames.last().unwrap();
    assert_eq!(last.as_ref(), b"data: [DONE]\n\n");
    let values: Vec<Value> = frames[..frames.len() - 1]
        .iter()
        .map(|frame| {
            let text = std::str::from_utf8(frame).unwrap();
            let payload = text
                .strip_prefix("data: ")
                .and_then(|t| t.strip_suffix("\n\n"))
                .unwrap();
            serde_json::from_str(payload).unwrap()
        })
        .collect();

    let types: Vec<&str> = values.iter().map(|v| v["type"].as_str().unwrap()).collect();
    assert_eq!(
        types,
        vec!["response-metadata", "text-delta", "text-delta", "finish"]
    );
    assert_eq!(values[1]["textDelta"], json!("Hello"));
    assert_eq!(
        values[3]["usage"],
        json!({"promptTokens": 12, "completionTokens": 4})
    );
}

/// Fold a chat fixture's deltas into the equivalent non-streaming response body.
fn non_streaming_body(fixture: &str) -> Value {
    let mut content = String::new();
    let mut reasoning = String::new();
    let mut details = Vec::new();
    let mut finish_reason = Value::Null;
    let mut usage = Value::Null;
    for line in load_sse_fixture(fixture).lines() {
        let Some(payload) = line.strip_prefix("data: ") else {
            continue;
        };
        if payload == "[DONE]" {
            continue;
        }
        let chunk: Value = serde_json::from_str(payload).unwrap();
        if let Some(choice) = chunk["choices"].get(0) {
            let delta = &choice["delta"];
            content.push_str(delta["content"].as_str().unwrap_or_default());
            reasoning.push_str(delta["reasoning"].as_str().unwrap_or_default());
            if let Some(items) = delta["reasoning_details"].as_array() {
                details.extend(items.iter().cloned());
            }
            if !choice["finish_reason"].is_null() {
                finish_reason = choice["finish_reason"].clone();
            }
        }
        if !chunk["usage"].is_null() {
            usage = chunk["usage"].clone();
        }
    }
    let reasoning = if reasoning.is_empty() {
        Value::Null
    } else {
        Value::String(reasoning)
    };
    json!({
        "id": "gen-folded",
        "choices": [{
            "message": {
                "role": "assistant",
                "content": content,
                "reasoning": reasoning,
                "reasoning_details": details,
            },
            "finish_reason": finish_reason,
        }],
        "usage": usage,
    })
}

#[tokio::test]
async fn stream_and_generate_agree_on_text_and_reasoning() {
    for fixture in ["chat_text.sse", "chat_reasoning.sse", "chat_reasoning_encrypted.sse"] {
        let parts = collect_parts(into_part_stream(
            stream::iter(load_sse_fixture_as_bytes(fixture)),
            StreamTransformer::chat(),
            None,
        ))
        .await;
        let result = parse_chat_response(&non_streaming_body(fixture)).unwrap();

        assert_eq!(text_of(&parts), result.text().unwrap_or_default(), "{fixture}: text");

        let streamed_reasoning: String = parts
            .iter()
            .filter_map(|part| match part {
                StreamPart::ReasoningDelta { delta, .. } => Some(delta.as_str()),
                _ => None,
            })
            .collect();
        let streamed_details = parts
            .iter()
            .find_map(|part| match part {
                StreamPart::ReasoningEnd { details, .. } => Some(details.clone()),
                _ => None,
            })
            .unwrap_or_default();
        let parsed = result.reasoning().cloned().unwrap_or_default();
        assert_eq!(streamed_reasoning, parsed.text, "{fixture}: reasoning text");
        assert_eq!(streamed_details, parsed.details, "{fixture}: reasoning details");

        let (reason, usage) = finish_of(&parts);
        assert_eq!(*reason, result.finish_reason, "{fixture}: finish reason");
        assert_eq!(*usage, result.usage, "{fixture}: usage");
    }
}

#[tokio::test]
async fn flat_reasoning_with_encrypted_detail_streams_text() {
    let parts = collect_parts(into_part_stream(
        stream::iter(load_sse_fixture_as_bytes("chat_reasoning_encrypted.sse")),
        StreamTransformer::chat(),
        None,
    ))
    .await;
    assert_eq!(
        part_types(&parts),
        vec![
            "response-metadata",
            "reasoning-start",
            "reasoning-delta",
            "reasoning-delta",
            "text-start",
            "text-delta",
            "reasoning-end",
            "text-end",
            "finish"
        ]
    );
    match &parts[6] {
        StreamPart::ReasoningEnd { details, .. } => {
            assert_eq!(details, &vec![ReasoningDetail::encrypted("EqQBCkYIBBgCKkDz")]);
        }
        other => panic!("unexpected part: {other:?}"),
    }
}

/// Transport that replays scripted byte chunks and records requests.
struct ScriptedTransport {
    chunks: Mutex<Option<ByteStream>>,
    requests: Mutex<Vec<HttpTransportRequest>>,
}

impl ScriptedTransport {
    fn new(chunks: ByteStream) -> Arc<Self> {
        Arc::new(Self {
            chunks: Mutex::new(Some(chunks)),
            requests: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl HttpTransport for ScriptedTransport {
    async fn execute_json(
        &self,
        _request: HttpTransportRequest,
    ) -> Result<HttpTransportResponse, LlmError> {
        Err(LlmError::transport("scripted transport only streams"))
    }

    async fn execute_stream(
        &self,
        request: HttpTransportRequest,
    ) -> Result<HttpTransportStreamResponse, LlmError> {
        self.requests.lock().unwrap().push(request);
        let body = self
            .chunks
            .lock()
            .unwrap()
            .take()
            .ok_or_else(|| LlmError::transport("script already consumed"))?;
        Ok(HttpTransportStreamResponse {
            status: 200,
            headers: reqwest::header::HeaderMap::new(),
            body,
        })
    }
}

fn scripted_provider(transport: Arc<ScriptedTransport>) -> OpenRouterProvider {
    create_openrouter(
        OpenRouterProviderSettings::new()
            .with_api_key(support::TEST_KEY)
            .with_transport(transport),
    )
    .unwrap()
}

const TEXT_FRAME: &str =
    "data: {\"id\":\"gen-x\",\"model\":\"m\",\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n\n";

#[tokio::test]
async fn read_failure_mid_stream_is_delivered_in_band() {
    let chunks: ByteStream = Box::pin(stream::iter(vec![
        Ok(Bytes::from_static(TEXT_FRAME.as_bytes())),
        Err(LlmError::transport("connection reset by peer")),
    ]));
    let transport = ScriptedTransport::new(chunks);
    let model = scripted_provider(transport.clone())
        .chat("m", OpenRouterChatSettings::new())
        .unwrap();

    let parts = collect_parts(model.stream(CallOptions::from_user_text("Hi")).await.unwrap()).await;
    assert_eq!(
        part_types(&parts),
        vec![
            "response-metadata",
            "text-start",
            "text-delta",
            "text-end",
            "error",
            "finish"
        ]
    );
    match &parts[4] {
        StreamPart::Error {
            error: StreamError::Transport { message },
        } => assert!(message.contains("connection reset")),
        other => panic!("unexpected part: {other:?}"),
    }

    let requests = transport.requests.lock().unwrap();
    assert_eq!(requests[0].url, "https://openrouter.ai/api/v1/chat/completions");
    assert_eq!(requests[0].body["stream"], json!(true));
}

#[tokio::test]
async fn abort_mid_stream_ends_without_further_parts() {
    let chunks: ByteStream = Box::pin(
        stream::iter(vec![Ok::<_, LlmError>(Bytes::from_static(TEXT_FRAME.as_bytes()))])
            .chain(stream::pending()),
    );
    let model = scripted_provider(ScriptedTransport::new(chunks))
        .chat("m", OpenRouterChatSettings::new())
        .unwrap();
    let token = CancellationToken::new();
    let mut parts = model
        .stream(CallOptions::from_user_text("Hi").with_abort_signal(token.clone()))
        .await
        .unwrap();

    let mut seen = Vec::new();
    while let Some(part) = parts.next().await {
        let is_delta = matches!(part, StreamPart::TextDelta { .. });
        seen.push(part);
        if is_delta {
            break;
        }
    }
    assert_eq!(part_types(&seen), vec!["response-metadata", "text-start", "text-delta"]);

    token.cancel();
    assert!(parts.next().await.is_none());
}
