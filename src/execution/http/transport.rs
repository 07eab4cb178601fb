//! HTTP transport abstraction.
//!
//! The adapter never talks to `reqwest` directly; it hands a fully built request
//! to an [`HttpTransport`]. [`ReqwestTransport`] is the default. Tests and callers
//! with their own HTTP stack inject a custom transport through the provider settings.

use crate::error::LlmError;
use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{Stream, StreamExt, TryStreamExt};
use reqwest::header::{ACCEPT, CACHE_CONTROL, HeaderMap, HeaderValue};
use std::fmt;
use std::pin::Pin;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, LlmError>> + Send>>;

/// Transport-level request data for JSON POST requests.
#[derive(Debug, Clone)]
pub struct HttpTransportRequest {
    pub url: String,
    pub headers: HeaderMap,
    pub body: serde_json::Value,
}

/// Transport-level response data.
#[derive(Debug, Clone)]
pub struct HttpTransportResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// Streaming response: status and headers are known, the body arrives incrementally.
pub struct HttpTransportStreamResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: ByteStream,
}

impl fmt::Debug for HttpTransportStreamResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpTransportStreamResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .finish_non_exhaustive()
    }
}

impl HttpTransportStreamResponse {
    /// Drain the body, e.g. to read an error envelope from a failed stream request.
    pub async fn collect_body(self) -> Result<Vec<u8>, LlmError> {
        self.body
            .try_fold(Vec::new(), |mut acc, chunk| async move {
                acc.extend_from_slice(&chunk);
                Ok(acc)
            })
            .await
    }
}

#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn execute_json(
        &self,
        request: HttpTransportRequest,
    ) -> Result<HttpTransportResponse, LlmError>;

    async fn execute_stream(
        &self,
        request: HttpTransportRequest,
    ) -> Result<HttpTransportStreamResponse, LlmError>;
}

/// Default transport backed by a shared `reqwest::Client`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    async fn send(&self, request: HttpTransportRequest) -> Result<reqwest::Response, LlmError> {
        Ok(self
            .client
            .post(&request.url)
            .headers(request.headers)
            .json(&request.body)
            .send()
            .await?)
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn execute_json(
        &self,
        request: HttpTransportRequest,
    ) -> Result<HttpTransportResponse, LlmError> {
        let response = self.send(request).await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();
        Ok(HttpTransportResponse {
            status,
            headers,
            body,
        })
    }

    async fn execute_stream(
        &self,
        mut request: HttpTransportRequest,
    ) -> Result<HttpTransportStreamResponse, LlmError> {
        request
            .headers
            .insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        request
            .headers
            .insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        let response = self.send(request).await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes_stream().map(|chunk| chunk.map_err(LlmError::from));
        Ok(HttpTransportStreamResponse {
            status,
            headers,
            body: Box::pin(body),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    #[tokio::test]
    async fn collect_body_concatenates_chunks() {
        let response = HttpTransportStreamResponse {
            status: 400,
            headers: HeaderMap::new(),
            body: Box::pin(stream::iter(vec![
                Ok(Bytes::from_static(b"{\"error\":")),
                Ok(Bytes::from_static(b"\"bad\"}")),
            ])),
        };
        let body = response.collect_body().await.unwrap();
        assert_eq!(body, b"{\"error\":\"bad\"}");
    }

    #[tokio::test]
    async fn collect_body_propagates_read_errors() {
        let response = HttpTransportStreamResponse {
            status: 500,
            headers: HeaderMap::new(),
            body: Box::pin(stream::iter(vec![
                Ok(Bytes::from_static(b"partial")),
                Err(LlmError::transport("reset")),
            ])),
        };
        let err = response.collect_body().await.unwrap_err();
        assert!(matches!(err, LlmError::TransportError { .. }));
    }
}
