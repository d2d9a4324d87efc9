//! CLI command implementations

use super::output::{BackendRow, OutputEvent, OutputHandler};
use crate::config::QuizMuxConfig;
use crate::orchestrator::{GenerationError, Orchestrator};
use crate::question::Difficulty;

/// Arguments for the `generate` command
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub topic: String,
    pub difficulty: Difficulty,
    pub exclude: Vec<String>,
    pub count: usize,
    pub show_stats: bool,
}

/// Generate `count` questions one after another
///
/// Each generated question is added to the exclude list for the rest of
/// the batch. Returns the process exit code.
pub async fn generate(
    orchestrator: &Orchestrator,
    request: &GenerateRequest,
    handler: &dyn OutputHandler,
) -> i32 {
    handler.emit(OutputEvent::GenerateStart {
        topic: request.topic.clone(),
        difficulty: request.difficulty.to_string(),
        count: request.count,
    });

    let mut exclude = request.exclude.clone();
    let mut generated = 0;
    let mut failed = false;

    for index in 1..=request.count {
        match orchestrator
            .generate(&request.topic, &request.difficulty, &exclude)
            .await
        {
            Ok(question) => {
                generated += 1;
                exclude.push(question.question_text.clone());
                handler.emit(OutputEvent::QuestionGenerated {
                    index,
                    total: request.count,
                    question,
                });
            }
            Err(e) => {
                failed = true;
                let no_backends = matches!(e, GenerationError::NoBackendsAvailable);
                handler.emit(OutputEvent::GenerateError {
                    index,
                    error: e.to_string(),
                });

                // Nothing will change for the remaining questions
                if no_backends {
                    handler.emit(OutputEvent::Info {
                        message: "Set an API key for at least one backend (see `quiz-mux backends`)"
                            .into(),
                    });
                    break;
                }
            }
        }
    }

    if request.show_stats {
        handler.emit(OutputEvent::Stats {
            providers: orchestrator.provider_stats(),
            cache: orchestrator.cache_stats(),
        });
    }

    handler.result(!failed, generated);

    if failed { 1 } else { 0 }
}

/// List configured backends with their credential status
///
/// `lookup` resolves an environment variable name to its value.
pub fn list_backends<F>(config: &QuizMuxConfig, lookup: F, handler: &dyn OutputHandler)
where
    F: Fn(&str) -> Option<String>,
{
    if config.backends.is_empty() {
        handler.emit(OutputEvent::Info {
            message: "(no backends configured)".into(),
        });
        return;
    }

    for (name, backend) in &config.backends {
        let env_var = backend.api_key_env();
        let credentials = lookup(env_var).is_some_and(|key| !key.trim().is_empty());

        handler.emit(OutputEvent::Backend(BackendRow {
            name: name.clone(),
            kind: backend.kind().as_str().to_string(),
            model: backend.model().to_string(),
            env_var: env_var.to_string(),
            enabled: backend.is_enabled(),
            credentials,
        }));
    }
}
