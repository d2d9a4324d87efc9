//! Resilient single-backend invocation with timeout, retry and backoff

use super::transport::{HttpReply, Transport};
use super::types::{BackendError, RawResponse, RequestConfig, RetryPolicy};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Longest error body kept in an error message
const MAX_ERROR_BODY: usize = 500;

/// Wraps a transport with per-call timeout and same-backend retries
///
/// This loop is scoped to one backend. Choosing another backend after a
/// failure is the orchestrator's job.
pub struct ResilientInvoker {
    transport: Arc<dyn Transport>,
    policy: RetryPolicy,
}

impl ResilientInvoker {
    /// Create a new invoker
    pub fn new(transport: Arc<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Call `backend` until it succeeds, fails terminally or runs out of retries
    pub async fn invoke(
        &self,
        backend: &str,
        config: &RequestConfig,
    ) -> Result<RawResponse, BackendError> {
        let mut last_error = None;

        for attempt in 0..=config.max_retries {
            let is_last = attempt == config.max_retries;
            let start = Instant::now();

            let outcome =
                match tokio::time::timeout(config.timeout, self.transport.send(config)).await {
                    Ok(result) => result,
                    Err(_) => Err(BackendError::timeout(start.elapsed())),
                };

            let error = match outcome {
                Ok(reply) if reply.is_success() => {
                    return parse_success(backend, reply, start.elapsed());
                }
                Ok(reply) if reply.status == 401 => {
                    // Credentials won't fix themselves within this call
                    return Err(BackendError::auth(401, truncate(&reply.body)));
                }
                Ok(reply) if reply.status == 429 => {
                    let computed = self.policy.rate_limit_delay_for_attempt(attempt);
                    // Hints past max_delay are clamped to it
                    let delay = match parse_retry_after(&reply) {
                        Some(hint) => hint.min(self.policy.max_delay).max(computed),
                        None => computed,
                    };

                    if is_last {
                        return Err(BackendError::rate_limit(Some(delay)));
                    }

                    tracing::warn!(
                        backend,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "rate limited, backing off"
                    );
                    last_error = Some(BackendError::rate_limit(Some(delay)));
                    tokio::time::sleep(delay).await;
                    continue;
                }
                Ok(reply) => BackendError::http(reply.status, truncate(&reply.body)),
                Err(e) => e,
            };

            if !error.is_retryable() || is_last {
                return Err(error);
            }

            let delay = self.policy.delay_for_attempt(attempt);
            tracing::warn!(
                backend,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %error,
                "transient failure, retrying"
            );
            last_error = Some(error);
            tokio::time::sleep(delay).await;
        }

        // Should never reach here, but just in case
        Err(last_error.unwrap_or_else(|| BackendError::network("unknown error after retries")))
    }
}

fn parse_success(
    backend: &str,
    reply: HttpReply,
    elapsed: Duration,
) -> Result<RawResponse, BackendError> {
    let body = serde_json::from_str(&reply.body).map_err(|e| {
        BackendError::parse(format!("{} returned a non-JSON envelope: {}", backend, e))
    })?;

    Ok(RawResponse {
        status: reply.status,
        backend: backend.to_string(),
        body,
        elapsed,
    })
}

/// Read the server's backoff hint: `Retry-After` seconds or HTTP date,
/// else a `retry_after` field in a JSON body
fn parse_retry_after(reply: &HttpReply) -> Option<Duration> {
    if let Some(ref value) = reply.retry_after {
        let value = value.trim();
        if let Ok(seconds) = value.parse::<f64>() {
            return seconds_to_duration(seconds);
        }
        if let Ok(date) = chrono::DateTime::parse_from_rfc2822(value) {
            let wait = date.with_timezone(&chrono::Utc) - chrono::Utc::now();
            return Some(wait.to_std().unwrap_or(Duration::ZERO));
        }
    }

    let json = serde_json::from_str::<serde_json::Value>(&reply.body).ok()?;
    let seconds = json
        .get("retry_after")
        .or_else(|| json.pointer("/error/retry_after"))
        .and_then(|v| v.as_f64())?;
    seconds_to_duration(seconds)
}

/// Negative or NaN hints are ignored, values beyond `Duration::MAX` saturate
fn seconds_to_duration(seconds: f64) -> Option<Duration> {
    if seconds.is_nan() || seconds < 0.0 {
        return None;
    }
    Some(Duration::try_from_secs_f64(seconds).unwrap_or(Duration::MAX))
}

fn truncate(body: &str) -> String {
    match body.char_indices().nth(MAX_ERROR_BODY) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
