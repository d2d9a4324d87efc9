//! OpenAI-compatible chat completions adapter (OpenAI, Mistral, Groq)

use super::adapter::{AdapterSettings, BackendAdapter};
use super::types::{BackendError, RequestConfig};
use crate::question::Prompt;
use serde::{Deserialize, Serialize};

/// Adapter for OpenAI-compatible chat completion APIs
#[derive(Debug, Clone)]
pub struct OpenAiCompatBackend {
    settings: AdapterSettings,

    /// Ask for `response_format: json_object`
    json_mode: bool,
}

/// OpenAI-compatible chat completion request
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

/// OpenAI-compatible chat completion response
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

impl OpenAiCompatBackend {
    pub fn new(settings: AdapterSettings) -> Self {
        Self {
            settings,
            json_mode: true,
        }
    }

    /// Toggle JSON response mode for servers that reject `response_format`
    pub fn with_json_mode(mut self, json_mode: bool) -> Self {
        self.json_mode = json_mode;
        self
    }

    pub fn settings(&self) -> &AdapterSettings {
        &self.settings
    }

    /// Build the chat completion URL
    fn chat_completion_url(&self) -> String {
        self.settings.endpoint("chat/completions")
    }
}

impl BackendAdapter for OpenAiCompatBackend {
    fn name(&self) -> &str {
        &self.settings.name
    }

    fn has_credentials(&self) -> bool {
        self.settings.has_credentials()
    }

    fn build_request(&self, prompt: &Prompt) -> Result<RequestConfig, BackendError> {
        let api_key = self.settings.require_api_key()?;

        let body = ChatCompletionRequest {
            model: &self.settings.model,
            messages: vec![
                Message {
                    role: "system",
                    content: &prompt.system,
                },
                Message {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            response_format: self.json_mode.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let body = serde_json::to_value(&body).map_err(|e| BackendError::Config {
            message: format!("failed to serialize request: {}", e),
        })?;

        Ok(self
            .settings
            .request(self.chat_completion_url(), body)
            .with_header("Authorization", format!("Bearer {}", api_key)))
    }

    fn parse_response(&self, body: &serde_json::Value) -> Result<String, BackendError> {
        let completion = ChatCompletionResponse::deserialize(body).map_err(|e| {
            BackendError::parse(format!("{}: unexpected response shape: {}", self.name(), e))
        })?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::parse(format!("{}: response has no choices", self.name())))?;

        match choice.message.content {
            Some(text) if !text.trim().is_empty() => Ok(text),
            _ => Err(BackendError::parse(format!(
                "{}: empty completion (finish_reason: {})",
                self.name(),
                choice.finish_reason.as_deref().unwrap_or("unknown")
            ))),
        }
    }
}
