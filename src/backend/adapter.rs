//! Backend adapter trait

use super::types::{BackendError, RequestConfig};
use crate::config::{BackendConfig, QuizMuxConfig};
use crate::question::Prompt;
use std::fmt;
use std::time::Duration;

/// A single external generation backend
///
/// Adapters only translate: a prompt into a request, and a response
/// envelope into raw text. Retries, validation and caching live elsewhere.
pub trait BackendAdapter: Send + Sync {
    /// Backend name, stable for the lifetime of the process
    fn name(&self) -> &str;

    /// Whether a non-empty secret is configured
    fn has_credentials(&self) -> bool;

    /// Build the request for one call
    fn build_request(&self, prompt: &Prompt) -> Result<RequestConfig, BackendError>;

    /// Extract the generated text from the response envelope
    fn parse_response(&self, body: &serde_json::Value) -> Result<String, BackendError>;
}

/// Static settings shared by the HTTP adapters
#[derive(Clone)]
pub struct AdapterSettings {
    /// Backend name
    pub name: String,

    /// Base URL for the API
    pub base_url: String,

    /// Model ID to use
    pub model: String,

    /// API key (empty or missing disables the backend)
    pub api_key: Option<String>,

    /// Per-call timeout
    pub timeout: Duration,

    /// Same-backend retries
    pub max_retries: u32,

    pub temperature: f32,

    pub max_tokens: u32,
}

impl AdapterSettings {
    /// Create settings with explicit parameters and default limits
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            model: model.into(),
            api_key: None,
            timeout: Duration::from_secs(30),
            max_retries: 2,
            temperature: 0.7,
            max_tokens: 1024,
        }
    }

    /// Resolve settings for one configured backend
    pub fn from_config(
        name: impl Into<String>,
        backend: &BackendConfig,
        config: &QuizMuxConfig,
        api_key: Option<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: backend.base_url().to_string(),
            model: backend.model().to_string(),
            api_key,
            timeout: config.timeout_for(backend),
            max_retries: config.max_retries_for(backend),
            temperature: backend.temperature(),
            max_tokens: backend.max_tokens(),
        }
    }

    /// Set the API key
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set same-backend retries
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn has_credentials(&self) -> bool {
        self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }

    /// The API key, or a config error naming the backend
    pub fn require_api_key(&self) -> Result<&str, BackendError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| BackendError::Config {
                message: format!("{}: no API key configured", self.name),
            })
    }

    /// Join a path onto the base URL
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    /// Start a request carrying this backend's timeout and retry budget
    pub fn request(&self, url: String, body: serde_json::Value) -> RequestConfig {
        RequestConfig::post(url, body)
            .with_timeout(self.timeout)
            .with_max_retries(self.max_retries)
    }
}

impl fmt::Debug for AdapterSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterSettings")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("has_api_key", &self.has_credentials())
            .field("timeout", &self.timeout)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

/// Pull a string out of an envelope, erroring with the path on a miss
pub(crate) fn text_at<'a>(
    body: &'a serde_json::Value,
    pointer: &str,
    backend: &str,
) -> Result<&'a str, BackendError> {
    body.pointer(pointer)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| BackendError::parse(format!("{}: no text at {}", backend, pointer)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_settings_credentials() {
        let settings = AdapterSettings::new("openai", "https://api.openai.com/v1", "gpt-4o");
        assert!(!settings.has_credentials());
        assert!(settings.require_api_key().is_err());

        let settings = settings.with_api_key("   ");
        assert!(!settings.has_credentials());

        let settings = settings.with_api_key("sk-test");
        assert!(settings.has_credentials());
        assert_eq!(settings.require_api_key().unwrap(), "sk-test");
        assert!(!format!("{:?}", settings).contains("sk-test"));
    }

    #[test]
    fn test_settings_from_config() {
        let config = QuizMuxConfig::default();
        let backend = &config.backends["mistral"];
        let settings = AdapterSettings::from_config("mistral", backend, &config, None);

        assert_eq!(settings.base_url, "https://api.mistral.ai/v1");
        assert_eq!(settings.model, "mistral-small-latest");
        assert_eq!(settings.timeout, Duration::from_secs(30));
        assert_eq!(settings.max_retries, 2);
    }

    #[test]
    fn test_endpoint_join() {
        let settings = AdapterSettings::new("test", "https://api.example.com/v1/", "m");
        assert_eq!(
            settings.endpoint("chat/completions"),
            "https://api.example.com/v1/chat/completions"
        );

        let request = settings
            .with_timeout(Duration::from_secs(5))
            .request("https://x".into(), json!({}));
        assert_eq!(request.timeout, Duration::from_secs(5));
        assert_eq!(request.max_retries, 2);
    }

    #[test]
    fn test_text_at_found() {
        let body = json!({"choices": [{"message": {"content": "hi"}}]});
        assert_eq!(
            text_at(&body, "/choices/0/message/content", "openai").unwrap(),
            "hi"
        );
    }

    #[test]
    fn test_text_at_missing_or_blank() {
        let body = json!({"choices": []});
        let err = text_at(&body, "/choices/0/message/content", "openai").unwrap_err();
        assert!(matches!(err, BackendError::Parse { .. }));
        assert!(err.to_string().contains("openai"));

        let body = json!({"choices": [{"message": {"content": "   "}}]});
        assert!(text_at(&body, "/choices/0/message/content", "openai").is_err());
    }
}
