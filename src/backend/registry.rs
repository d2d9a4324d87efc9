//! Build the active backend set from configuration and credentials

use super::adapter::{AdapterSettings, BackendAdapter};
use super::anthropic::AnthropicBackend;
use super::gemini::GeminiBackend;
use super::openai_compat::OpenAiCompatBackend;
use crate::config::{BackendConfig, BackendKind, QuizMuxConfig};
use crate::events::{EventSink, GenerationEvent};
use std::sync::Arc;

/// Create an adapter for a backend config
pub fn create_adapter(
    name: &str,
    backend: &BackendConfig,
    config: &QuizMuxConfig,
    api_key: Option<String>,
) -> Arc<dyn BackendAdapter> {
    let settings = AdapterSettings::from_config(name, backend, config, api_key);
    match backend.kind() {
        BackendKind::OpenAi => Arc::new(OpenAiCompatBackend::new(settings)),
        BackendKind::Anthropic => Arc::new(AnthropicBackend::new(settings)),
        BackendKind::Gemini => Arc::new(GeminiBackend::new(settings)),
    }
}

/// Build every enabled backend that has credentials
///
/// `lookup` resolves an environment variable name to its value. Backends
/// whose secret is missing or empty are left out and reported as
/// `config-missing`.
pub fn build_backends<F>(
    config: &QuizMuxConfig,
    lookup: F,
    events: &dyn EventSink,
) -> Vec<Arc<dyn BackendAdapter>>
where
    F: Fn(&str) -> Option<String>,
{
    let mut active = Vec::new();

    for (name, backend) in config.enabled_backends() {
        let env_var = backend.api_key_env();
        let adapter = create_adapter(name, backend, config, lookup(env_var));

        if adapter.has_credentials() {
            active.push(adapter);
        } else {
            events.emit(GenerationEvent::ConfigMissing {
                backend: name.clone(),
                env_var: env_var.to_string(),
            });
        }
    }

    active
}

/// Build backends from the process environment
pub fn backends_from_env(
    config: &QuizMuxConfig,
    events: &dyn EventSink,
) -> Vec<Arc<dyn BackendAdapter>> {
    build_backends(config, |var| std::env::var(var).ok(), events)
}
