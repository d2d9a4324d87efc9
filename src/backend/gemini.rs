//! Google Gemini generateContent adapter

use super::adapter::{AdapterSettings, BackendAdapter, text_at};
use super::types::{BackendError, RequestConfig};
use crate::question::Prompt;

/// Adapter for the Gemini generateContent API
#[derive(Debug, Clone)]
pub struct GeminiBackend {
    settings: AdapterSettings,
}

impl GeminiBackend {
    pub fn new(settings: AdapterSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &AdapterSettings {
        &self.settings
    }

    fn generate_url(&self) -> String {
        self.settings.endpoint(&format!(
            "v1beta/models/{}:generateContent",
            self.settings.model
        ))
    }
}

impl BackendAdapter for GeminiBackend {
    fn name(&self) -> &str {
        &self.settings.name
    }

    fn has_credentials(&self) -> bool {
        self.settings.has_credentials()
    }

    fn build_request(&self, prompt: &Prompt) -> Result<RequestConfig, BackendError> {
        let api_key = self.settings.require_api_key()?;

        let body = serde_json::json!({
            "systemInstruction": {
                "parts": [{ "text": prompt.system }]
            },
            "contents": [
                {
                    "role": "user",
                    "parts": [{ "text": prompt.user }]
                }
            ],
            "generationConfig": {
                "temperature": self.settings.temperature,
                "maxOutputTokens": self.settings.max_tokens,
                "responseMimeType": "application/json"
            }
        });

        Ok(self
            .settings
            .request(self.generate_url(), body)
            .with_header("x-goog-api-key", api_key))
    }

    fn parse_response(&self, body: &serde_json::Value) -> Result<String, BackendError> {
        // A blocked prompt comes back with feedback instead of candidates
        if let Some(reason) = body
            .pointer("/promptFeedback/blockReason")
            .and_then(|v| v.as_str())
        {
            return Err(BackendError::parse(format!(
                "{}: prompt blocked ({})",
                self.name(),
                reason
            )));
        }

        text_at(body, "/candidates/0/content/parts/0/text", self.name()).map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn backend() -> GeminiBackend {
        GeminiBackend::new(
            AdapterSettings::new(
                "gemini",
                "https://generativelanguage.googleapis.com",
                "gemini-1.5-flash",
            )
            .with_api_key("g-test"),
        )
    }

    #[test]
    fn test_build_request() {
        let prompt = Prompt {
            system: "Reply in JSON".into(),
            user: "A question about Rust".into(),
        };
        let request = backend().build_request(&prompt).unwrap();

        assert_eq!(
            request.url,
            "https://generativelanguage.googleapis.com/v1beta/models/gemini-1.5-flash:generateContent"
        );
        assert_eq!(request.header("x-goog-api-key"), Some("g-test"));
        assert_eq!(
            request.body["contents"][0]["parts"][0]["text"],
            "A question about Rust"
        );
        assert_eq!(
            request.body["systemInstruction"]["parts"][0]["text"],
            "Reply in JSON"
        );
        assert_eq!(
            request.body["generationConfig"]["responseMimeType"],
            "application/json"
        );
    }

    #[test]
    fn test_parse_response() {
        let body = json!({
            "candidates": [{
                "content": {"role": "model", "parts": [{"text": "{\"question\": \"Q?\"}"}]},
                "finishReason": "STOP"
            }]
        });
        assert_eq!(backend().parse_response(&body).unwrap(), "{\"question\": \"Q?\"}");
    }

    #[test]
    fn test_parse_blocked_prompt() {
        let body = json!({"promptFeedback": {"blockReason": "SAFETY"}});
        let err = backend().parse_response(&body).unwrap_err();
        assert!(err.to_string().contains("SAFETY"));
    }

    #[test]
    fn test_parse_missing_candidates() {
        let err = backend().parse_response(&json!({})).unwrap_err();
        assert!(matches!(err, BackendError::Parse { .. }));
    }
}
