//! Core types for backend invocation

use crate::config::RetrySettings;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Error types that can occur while calling a backend
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// Request timed out
    #[error("timeout after {elapsed:?}")]
    Timeout { elapsed: Duration },

    /// Rate limited by the provider
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimit { retry_after: Option<Duration> },

    /// Credentials rejected
    #[error("authentication failed (HTTP {status}): {message}")]
    Auth { status: u16, message: String },

    /// Any other non-success status
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// Connection or transport failure
    #[error("network error: {message}")]
    Network { message: String },

    /// Response envelope could not be parsed
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Request could not be built
    #[error("invalid configuration: {message}")]
    Config { message: String },
}

impl BackendError {
    /// Check if the invoker may retry this error against the same backend
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BackendError::Timeout { .. }
                | BackendError::RateLimit { .. }
                | BackendError::Http { .. }
                | BackendError::Network { .. }
        )
    }

    /// HTTP status code, when one was received
    pub fn status_code(&self) -> Option<u16> {
        match self {
            BackendError::Auth { status, .. } | BackendError::Http { status, .. } => Some(*status),
            BackendError::RateLimit { .. } => Some(429),
            _ => None,
        }
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self, BackendError::Auth { .. })
    }

    pub fn is_rate_limit_error(&self) -> bool {
        matches!(self, BackendError::RateLimit { .. })
    }

    /// Get suggested retry delay for rate limit errors
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            BackendError::RateLimit { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Create a timeout error
    pub fn timeout(elapsed: Duration) -> Self {
        Self::Timeout { elapsed }
    }

    /// Create a rate limit error
    pub fn rate_limit(retry_after: Option<Duration>) -> Self {
        Self::RateLimit { retry_after }
    }

    /// Create an auth error
    pub fn auth(status: u16, message: impl Into<String>) -> Self {
        Self::Auth {
            status,
            message: message.into(),
        }
    }

    /// Create a generic status error
    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            body: body.into(),
        }
    }

    /// Create a network error
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a parse error
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }
}

/// Everything needed for one HTTP call to one backend
///
/// Built fresh by an adapter for every call and never mutated afterwards.
#[derive(Clone)]
pub struct RequestConfig {
    /// Endpoint URL
    pub url: String,

    /// Headers, including credentials
    pub headers: Vec<(String, String)>,

    /// JSON request body
    pub body: serde_json::Value,

    /// Per-call timeout
    pub timeout: Duration,

    /// Same-backend retries after the first try
    pub max_retries: u32,
}

impl RequestConfig {
    /// Create a POST request config with default timeout and retries
    pub fn post(url: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
            body,
            timeout: Duration::from_secs(30),
            max_retries: 2,
        }
    }

    /// Add a header
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set max retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Look up a header value by case-insensitive name
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

// Header values carry API keys, so only names are printed.
impl fmt::Debug for RequestConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header_names: Vec<&str> = self.headers.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("RequestConfig")
            .field("url", &self.url)
            .field("headers", &header_names)
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

/// Successful response from the invoker
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawResponse {
    /// HTTP status
    pub status: u16,

    /// Backend name that produced this response
    pub backend: String,

    /// Parsed JSON envelope
    pub body: serde_json::Value,

    /// Time taken by the successful try
    pub elapsed: Duration,
}

/// Backoff policy shared by every invocation
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Floor for transient errors
    pub base_delay: Duration,

    /// Floor for 429 responses
    pub rate_limit_delay: Duration,

    /// Upper bound on the random jitter
    pub jitter_cap: Duration,

    /// Cap on the exponential part
    pub max_delay: Duration,

    /// Whether to add jitter to delays
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(1),
            rate_limit_delay: Duration::from_secs(5),
            jitter_cap: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Create a policy from retry settings
    pub fn from_settings(settings: &RetrySettings) -> Self {
        Self {
            base_delay: Duration::from_millis(settings.base_delay_ms),
            rate_limit_delay: Duration::from_millis(settings.rate_limit_delay_ms),
            jitter_cap: Duration::from_millis(settings.jitter_cap_ms),
            max_delay: Duration::from_millis(settings.max_delay_ms),
            jitter: true,
        }
    }

    /// Delay before retrying a transient failure
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff(self.base_delay, attempt)
    }

    /// Computed delay before retrying a 429, ignoring any server hint
    pub fn rate_limit_delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff(self.rate_limit_delay, attempt)
    }

    fn backoff(&self, floor: Duration, attempt: u32) -> Duration {
        let base_delay = floor.as_secs_f64() * 2f64.powi(attempt as i32);
        let capped_delay = base_delay.min(self.max_delay.as_secs_f64());

        let final_delay = if self.jitter {
            let jitter_bound = (capped_delay * 0.1).min(self.jitter_cap.as_secs_f64());
            capped_delay + rand::random::<f64>() * jitter_bound
        } else {
            capped_delay
        };

        Duration::from_secs_f64(final_delay)
    }
}
