//! Cross-backend question generation
//!
//! The orchestrator rotates through the active backends round-robin. Each
//! attempt is one backend selection plus that backend's own retry loop in
//! the [`ResilientInvoker`]; a failed attempt moves on to the next backend
//! until the attempt budget runs out.

use crate::backend::{BackendAdapter, BackendError, ResilientInvoker, RetryPolicy, Transport};
use crate::cache::{CacheOutcome, CacheStats, DuplicateCache};
use crate::config::QuizMuxConfig;
use crate::events::{EventSink, GenerationEvent, TracingSink};
use crate::health::{HealthTracker, ProviderHealth, ProviderStats};
use crate::question::{
    normalize, Difficulty, NormalizeError, PromptBuilder, PromptError, Question,
    TemplatePromptBuilder,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use thiserror::Error;
use tokio::time::Instant;

/// Default cross-backend retries (three attempts in total)
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Why a single attempt failed
#[derive(Debug, Error)]
pub enum AttemptError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Normalize(#[from] NormalizeError),

    #[error(transparent)]
    Prompt(#[from] PromptError),
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("no generation backends available (no backend has credentials configured)")]
    NoBackendsAvailable,

    #[error("failed to generate a {difficulty} question about '{topic}' after {attempts} attempts: {source}")]
    Exhausted {
        topic: String,
        difficulty: Difficulty,
        attempts: u32,
        #[source]
        source: AttemptError,
    },
}

impl GenerationError {
    /// The error from the final attempt, if any attempt was made
    pub fn last_error(&self) -> Option<&AttemptError> {
        match self {
            GenerationError::NoBackendsAvailable => None,
            GenerationError::Exhausted { source, .. } => Some(source),
        }
    }
}

/// Generates questions across a fixed set of backends
pub struct Orchestrator {
    backends: Vec<Arc<dyn BackendAdapter>>,
    cursor: AtomicUsize,
    invoker: ResilientInvoker,
    prompts: Arc<dyn PromptBuilder>,
    health: HealthTracker,
    cache: DuplicateCache,
    events: Arc<dyn EventSink>,
    max_retries: u32,
}

impl Orchestrator {
    /// Create an orchestrator with default prompts, cache and tracing events
    pub fn new(backends: Vec<Arc<dyn BackendAdapter>>, invoker: ResilientInvoker) -> Self {
        let health = HealthTracker::new(backends.iter().map(|b| b.name().to_string()));
        Self {
            backends,
            cursor: AtomicUsize::new(0),
            invoker,
            prompts: Arc::new(TemplatePromptBuilder::default()),
            health,
            cache: DuplicateCache::new(1000, None),
            events: Arc::new(TracingSink),
            max_retries: DEFAULT_MAX_RETRIES,
        }
    }

    /// Build from loaded configuration
    ///
    /// `backends` is usually the output of
    /// [`build_backends`](crate::backend::build_backends).
    pub fn from_config(
        config: &QuizMuxConfig,
        backends: Vec<Arc<dyn BackendAdapter>>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, PromptError> {
        let invoker = ResilientInvoker::new(transport, RetryPolicy::from_settings(&config.retry));
        let prompts = TemplatePromptBuilder::from_settings(&config.prompt)?;

        Ok(Self::new(backends, invoker)
            .with_prompt_builder(Arc::new(prompts))
            .with_cache(DuplicateCache::from_settings(&config.cache))
            .with_max_retries(config.defaults.attempts))
    }

    pub fn with_prompt_builder(mut self, prompts: Arc<dyn PromptBuilder>) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_cache(mut self, cache: DuplicateCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Generate one validated question
    ///
    /// Fails only when there are no backends or every attempt failed.
    pub async fn generate(
        &self,
        topic: &str,
        difficulty: &Difficulty,
        exclude: &[String],
    ) -> Result<Question, GenerationError> {
        if self.backends.is_empty() {
            return Err(GenerationError::NoBackendsAvailable);
        }

        let mut attempt = 0;
        let source = loop {
            let backend = self.next_backend();
            let name = backend.name();

            self.health.record_request(name);
            self.events.emit(GenerationEvent::Request {
                backend: name.to_string(),
                attempt,
                topic: topic.to_string(),
            });

            let start = Instant::now();
            match self.attempt(backend.as_ref(), topic, difficulty, exclude).await {
                Ok(question) => {
                    let elapsed = start.elapsed();
                    self.health.record_success(name, elapsed);
                    self.check_duplicate(name, &question);
                    self.events.emit(GenerationEvent::Success {
                        backend: name.to_string(),
                        attempt,
                        duration_ms: elapsed.as_millis() as u64,
                    });
                    return Ok(question);
                }
                Err(e) => {
                    self.health.record_failure(name);
                    self.events.emit(GenerationEvent::Fallback {
                        backend: name.to_string(),
                        attempt,
                        error: e.to_string(),
                    });

                    if attempt >= self.max_retries {
                        break e;
                    }
                    attempt += 1;
                }
            }
        };

        self.events.emit(GenerationEvent::Error {
            topic: topic.to_string(),
            difficulty: difficulty.to_string(),
            attempts: attempt + 1,
            error: source.to_string(),
        });

        Err(GenerationError::Exhausted {
            topic: topic.to_string(),
            difficulty: difficulty.clone(),
            attempts: attempt + 1,
            source,
        })
    }

    fn next_backend(&self) -> &Arc<dyn BackendAdapter> {
        let cursor = self.cursor.fetch_add(1, Ordering::Relaxed);
        &self.backends[cursor % self.backends.len()]
    }

    async fn attempt(
        &self,
        backend: &dyn BackendAdapter,
        topic: &str,
        difficulty: &Difficulty,
        exclude: &[String],
    ) -> Result<Question, AttemptError> {
        let prompt = self.prompts.build(topic, difficulty, exclude)?;
        let request = backend.build_request(&prompt)?;
        let response = self.invoker.invoke(backend.name(), &request).await?;
        let text = backend.parse_response(&response.body)?;
        Ok(normalize(&text, topic, difficulty)?)
    }

    fn check_duplicate(&self, backend: &str, question: &Question) {
        if let CacheOutcome::Duplicate { access_count } = self.cache.record(question) {
            self.events.emit(GenerationEvent::Duplicate {
                backend: backend.to_string(),
                question: question.question_text.clone(),
                access_count,
            });
        }
    }

    /// Names of the active backends in rotation order
    pub fn backend_names(&self) -> Vec<&str> {
        self.backends.iter().map(|b| b.name()).collect()
    }

    pub fn provider_stats(&self) -> Vec<ProviderStats> {
        self.health.stats()
    }

    pub fn provider_health(&self) -> Vec<ProviderHealth> {
        self.health.health()
    }

    pub fn best_provider(&self) -> Option<String> {
        self.health.best_backend()
    }

    /// Number of backends with credentials, regardless of health
    pub fn available_providers_count(&self) -> usize {
        self.backends.len()
    }

    pub fn reset_provider_stats(&self) {
        self.health.reset();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
