//! Backend configuration for question generation providers

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Wire protocol a backend speaks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// OpenAI-compatible chat completions
    OpenAi,
    /// Anthropic messages API
    Anthropic,
    /// Google Gemini generateContent
    Gemini,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::OpenAi => "openai",
            BackendKind::Anthropic => "anthropic",
            BackendKind::Gemini => "gemini",
        }
    }

    fn default_base_url(&self) -> &'static str {
        match self {
            BackendKind::OpenAi => "https://api.openai.com/v1",
            BackendKind::Anthropic => "https://api.anthropic.com",
            BackendKind::Gemini => "https://generativelanguage.googleapis.com",
        }
    }

    fn default_model(&self) -> &'static str {
        match self {
            BackendKind::OpenAi => "gpt-4o-mini",
            BackendKind::Anthropic => "claude-3-5-haiku-latest",
            BackendKind::Gemini => "gemini-1.5-flash",
        }
    }

    fn default_api_key_env(&self) -> &'static str {
        match self {
            BackendKind::OpenAi => "OPENAI_API_KEY",
            BackendKind::Anthropic => "ANTHROPIC_API_KEY",
            BackendKind::Gemini => "GEMINI_API_KEY",
        }
    }
}

/// Configuration for a single backend
///
/// Every field is optional so that a config layer can override just one
/// setting of a built-in backend.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BackendConfig {
    /// Wire protocol (defaults to openai)
    pub kind: Option<BackendKind>,

    /// Whether this backend is enabled
    pub enabled: Option<bool>,

    /// Model name
    pub model: Option<String>,

    /// Environment variable holding the API key
    pub api_key_env: Option<String>,

    /// API base URL
    pub base_url: Option<String>,

    /// Timeout in seconds for requests
    pub timeout: Option<u64>,

    /// Same-backend retries for transient failures
    pub max_retries: Option<u32>,

    /// Sampling temperature
    pub temperature: Option<f32>,

    /// Maximum tokens to generate
    pub max_tokens: Option<u32>,
}

impl BackendConfig {
    fn preset(kind: BackendKind, model: &str, api_key_env: &str, base_url: &str) -> Self {
        Self {
            kind: Some(kind),
            model: Some(model.into()),
            api_key_env: Some(api_key_env.into()),
            base_url: Some(base_url.into()),
            ..Default::default()
        }
    }

    pub fn kind(&self) -> BackendKind {
        self.kind.unwrap_or(BackendKind::OpenAi)
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.unwrap_or(true)
    }

    pub fn model(&self) -> &str {
        self.model
            .as_deref()
            .unwrap_or_else(|| self.kind().default_model())
    }

    pub fn api_key_env(&self) -> &str {
        self.api_key_env
            .as_deref()
            .unwrap_or_else(|| self.kind().default_api_key_env())
    }

    pub fn base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.kind().default_base_url())
    }

    pub fn temperature(&self) -> f32 {
        self.temperature.unwrap_or(0.7)
    }

    pub fn max_tokens(&self) -> u32 {
        self.max_tokens.unwrap_or(1024)
    }

    /// Overlay the fields set in `other`
    pub fn merge(&mut self, other: BackendConfig) {
        macro_rules! overlay {
            ($($field:ident),*) => {
                $(if other.$field.is_some() {
                    self.$field = other.$field;
                })*
            };
        }
        overlay!(
            kind,
            enabled,
            model,
            api_key_env,
            base_url,
            timeout,
            max_retries,
            temperature,
            max_tokens
        );
    }
}

/// The five providers available out of the box
pub fn builtin_backends() -> BTreeMap<String, BackendConfig> {
    let mut backends = BTreeMap::new();
    backends.insert(
        "openai".into(),
        BackendConfig::preset(
            BackendKind::OpenAi,
            "gpt-4o-mini",
            "OPENAI_API_KEY",
            "https://api.openai.com/v1",
        ),
    );
    backends.insert(
        "anthropic".into(),
        BackendConfig::preset(
            BackendKind::Anthropic,
            "claude-3-5-haiku-latest",
            "ANTHROPIC_API_KEY",
            "https://api.anthropic.com",
        ),
    );
    backends.insert(
        "gemini".into(),
        BackendConfig::preset(
            BackendKind::Gemini,
            "gemini-1.5-flash",
            "GEMINI_API_KEY",
            "https://generativelanguage.googleapis.com",
        ),
    );
    backends.insert(
        "mistral".into(),
        BackendConfig::preset(
            BackendKind::OpenAi,
            "mistral-small-latest",
            "MISTRAL_API_KEY",
            "https://api.mistral.ai/v1",
        ),
    );
    backends.insert(
        "groq".into(),
        BackendConfig::preset(
            BackendKind::OpenAi,
            "llama-3.1-8b-instant",
            "GROQ_API_KEY",
            "https://api.groq.com/openai/v1",
        ),
    );
    backends
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal() {
        let config: BackendConfig = toml::from_str("").unwrap();
        assert_eq!(config.kind(), BackendKind::OpenAi);
        assert!(config.is_enabled());
        assert_eq!(config.model(), "gpt-4o-mini");
        assert_eq!(config.api_key_env(), "OPENAI_API_KEY");
        assert_eq!(config.base_url(), "https://api.openai.com/v1");
    }

    #[test]
    fn test_deserialize_full() {
        let toml = r#"
            kind = "gemini"
            enabled = false
            model = "gemini-2.0-flash"
            api_key_env = "MY_GEMINI_KEY"
            base_url = "http://localhost:8080"
            timeout = 60
            max_retries = 5
            temperature = 0.2
            max_tokens = 512
        "#;
        let config: BackendConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.kind(), BackendKind::Gemini);
        assert!(!config.is_enabled());
        assert_eq!(config.model(), "gemini-2.0-flash");
        assert_eq!(config.api_key_env(), "MY_GEMINI_KEY");
        assert_eq!(config.timeout, Some(60));
        assert_eq!(config.max_retries, Some(5));
        assert_eq!(config.max_tokens(), 512);
    }

    #[test]
    fn test_reject_unknown_fields() {
        let toml = r#"
            kind = "openai"
            unknown_field = "value"
        "#;
        let result: Result<BackendConfig, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_merge_overlays_only_set_fields() {
        let mut base = builtin_backends().remove("groq").unwrap();
        base.merge(BackendConfig {
            enabled: Some(false),
            model: Some("llama-3.3-70b-versatile".into()),
            ..Default::default()
        });

        assert!(!base.is_enabled());
        assert_eq!(base.model(), "llama-3.3-70b-versatile");
        assert_eq!(base.base_url(), "https://api.groq.com/openai/v1");
        assert_eq!(base.api_key_env(), "GROQ_API_KEY");
    }

    #[test]
    fn test_builtin_backends() {
        let backends = builtin_backends();
        let names: Vec<_> = backends.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["anthropic", "gemini", "groq", "mistral", "openai"]);
        assert_eq!(backends["anthropic"].kind(), BackendKind::Anthropic);
        assert_eq!(backends["mistral"].kind(), BackendKind::OpenAi);
    }
}
