//! Mock API tests for the OpenRouter raw completion endpoint.

mod support;

use serde_json::json;
use siumai_provider_openrouter::prelude::*;
use support::{provider_for, sent_body};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[tokio::test]
async fn completion_generate_flattens_prompt() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "gen-cmpl",
            "model": "mistralai/mistral-7b-instruct",
            "created": 1700000400,
            "choices": [{"index": 0, "text": "Paris.", "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 20, "completion_tokens": 2, "total_tokens": 22}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let model = provider_for(&server)
        .completion("mistralai/mistral-7b-instruct", OpenRouterChatSettings::new())
        .unwrap();
    let result = model
        .generate(
            CallOptions::new(vec![
                Message::system("Answer in one word."),
                Message::user("Capital of France?"),
            ])
            .with_stop_sequences(vec!["###".to_string()]),
        )
        .await
        .unwrap();

    assert_eq!(result.text(), Some("Paris."));
    assert_eq!(result.finish_reason, FinishReason::Stop);
    assert_eq!(result.usage.total_tokens, 22.0);

    let body = sent_body(&server).await;
    assert_eq!(body["model"], json!("mistralai/mistral-7b-instruct"));
    assert_eq!(
        body["prompt"],
        json!("Answer in one word.\n\nuser:\nCapital of France?\n\nassistant:\n")
    );
    assert_eq!(body["stop"], json!(["###", "\nuser:"]));
    assert!(body.get("messages").is_none());
}

#[tokio::test]
async fn completion_rejects_tools_without_sending() {
    let server = MockServer::start().await;
    let model = provider_for(&server)
        .completion("mistralai/mistral-7b-instruct", OpenRouterChatSettings::new())
        .unwrap();

    let err = model
        .generate(
            CallOptions::from_user_text("Hi")
                .with_tools(vec![ToolDefinition::function("noop", json!({"type": "object"}))]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::UnsupportedContent(_)));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn completion_missing_choices_is_no_choice() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v1/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "gen", "choices": []})))
        .mount(&server)
        .await;

    let model = provider_for(&server)
        .completion("m", OpenRouterChatSettings::new())
        .unwrap();
    let err = model
        .generate(CallOptions::from_user_text("Hi"))
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::NoChoice));
}
