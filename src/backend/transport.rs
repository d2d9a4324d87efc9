//! Network transport for backend calls

use super::types::{BackendError, RequestConfig};
use async_trait::async_trait;
use std::time::Instant;

/// Raw HTTP reply, before any status classification
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,

    /// Value of the `Retry-After` header, if present
    pub retry_after: Option<String>,

    pub body: String,
}

impl HttpReply {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            retry_after: None,
            body: body.into(),
        }
    }

    pub fn with_retry_after(mut self, value: impl Into<String>) -> Self {
        self.retry_after = Some(value.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Sends one request and returns whatever came back
///
/// Only transport-level failures are errors here; every HTTP status,
/// including 4xx and 5xx, is a successful `HttpReply`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: &RequestConfig) -> Result<HttpReply, BackendError>;
}

/// Transport backed by a shared reqwest client
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: &RequestConfig) -> Result<HttpReply, BackendError> {
        let start = Instant::now();

        let mut http_request = self
            .client
            .post(&request.url)
            .timeout(request.timeout)
            .json(&request.body);

        for (name, value) in &request.headers {
            http_request = http_request.header(name.as_str(), value.as_str());
        }

        let response = http_request.send().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::timeout(start.elapsed())
            } else if e.is_connect() {
                BackendError::network(format!("connection failed: {}", e))
            } else if e.is_builder() {
                BackendError::Config {
                    message: format!("invalid request: {}", e),
                }
            } else {
                BackendError::network(format!("request failed: {}", e))
            }
        })?;

        let status = response.status().as_u16();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::timeout(start.elapsed())
            } else {
                BackendError::network(format!("failed to read body: {}", e))
            }
        })?;

        Ok(HttpReply {
            status,
            retry_after,
            body,
        })
    }
}
