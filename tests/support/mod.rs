//! Shared helpers for the wiremock-backed integration tests.
#![allow(dead_code)]

use futures_util::StreamExt;
use siumai_provider_openrouter::prelude::*;
use std::path::{Path, PathBuf};
use wiremock::MockServer;

pub const TEST_KEY: &str = "sk-or-test-key";

pub fn fixtures_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join("openrouter")
}

/// Read an `.sse` fixture, normalizing line endings.
pub fn load_sse_fixture(name: &str) -> String {
    std::fs::read_to_string(fixtures_dir().join(name))
        .expect("read fixture text")
        .replace("\r\n", "\n")
}

/// Split an `.sse` fixture into one byte chunk per event, as a server flushing
/// frame by frame would deliver it.
pub fn load_sse_fixture_as_bytes(name: &str) -> Vec<Result<Vec<u8>, std::io::Error>> {
    load_sse_fixture(name)
        .split("\n\n")
        .map(|chunk| chunk.trim_end_matches('\n'))
        .filter(|chunk| !chunk.is_empty())
        .map(|chunk| Ok(format!("{chunk}\n\n").into_bytes()))
        .collect()
}

pub fn provider_for(server: &MockServer) -> OpenRouterProvider {
    create_openrouter(
        OpenRouterProviderSettings::new()
            .with_api_key(TEST_KEY)
            .with_base_url(format!("{}/api/v1", server.uri())),
    )
    .expect("provider")
}

pub async fn collect_parts(stream: PartStream) -> Vec<StreamPart> {
    stream.collect().await
}

pub fn part_types(parts: &[StreamPart]) -> Vec<&'static str> {
    parts.iter().map(StreamPart::type_name).collect()
}

/// Body of the single request the server received.
pub async fn sent_body(server: &MockServer) -> serde_json::Value {
    let requests = server.received_requests().await.expect("request recording");
    assert_eq!(requests.len(), 1, "expected exactly one request");
    serde_json::from_slice(&requests[0].body).expect("json request body")
}
