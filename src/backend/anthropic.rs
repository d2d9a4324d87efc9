//! Anthropic messages API adapter

use super::adapter::{AdapterSettings, BackendAdapter};
use super::types::{BackendError, RequestConfig};
use crate::question::Prompt;
use serde::Deserialize;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Adapter for the Anthropic messages API
#[derive(Debug, Clone)]
pub struct AnthropicBackend {
    settings: AdapterSettings,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    stop_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    text: Option<String>,
}

impl AnthropicBackend {
    pub fn new(settings: AdapterSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &AdapterSettings {
        &self.settings
    }
}

impl BackendAdapter for AnthropicBackend {
    fn name(&self) -> &str {
        &self.settings.name
    }

    fn has_credentials(&self) -> bool {
        self.settings.has_credentials()
    }

    fn build_request(&self, prompt: &Prompt) -> Result<RequestConfig, BackendError> {
        let api_key = self.settings.require_api_key()?;

        let body = serde_json::json!({
            "model": self.settings.model,
            "max_tokens": self.settings.max_tokens,
            "temperature": self.settings.temperature,
            "system": prompt.system,
            "messages": [
                {
                    "role": "user",
                    "content": prompt.user
                }
            ]
        });

        Ok(self
            .settings
            .request(self.settings.endpoint("v1/messages"), body)
            .with_header("x-api-key", api_key)
            .with_header("anthropic-version", ANTHROPIC_VERSION))
    }

    fn parse_response(&self, body: &serde_json::Value) -> Result<String, BackendError> {
        let response = MessagesResponse::deserialize(body).map_err(|e| {
            BackendError::parse(format!("{}: unexpected response shape: {}", self.name(), e))
        })?;

        let text = response
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n");

        if text.trim().is_empty() {
            return Err(BackendError::parse(format!(
                "{}: no text content (stop_reason: {})",
                self.name(),
                response.stop_reason.as_deref().unwrap_or("unknown")
            )));
        }

        Ok(text)
    }
}
