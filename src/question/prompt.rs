//! Prompt construction for question generation

use super::types::Difficulty;
use crate::config::PromptSettings;
use minijinja::{Environment, context};
use thiserror::Error;

const DEFAULT_SYSTEM: &str = "You write multiple-choice quiz questions. \
Reply with a single JSON object and nothing else, shaped as \
{\"question\": string, \"answers\": [string, ...], \"correctAnswerIndex\": number}. \
If you cannot write a suitable question, reply with {\"question\": null}.";

const DEFAULT_USER: &str = "Write one {{ difficulty }} question about {{ topic }} \
with four answer options, exactly one of them correct.\
{% if exclude %}\nDo not repeat any of these questions:\
{% for q in exclude %}\n- {{ q }}{% endfor %}{% endif %}";

/// Prompt rendering errors
#[derive(Debug, Error)]
pub enum PromptError {
    #[error("invalid prompt template '{name}': {source}")]
    Template {
        name: String,
        #[source]
        source: minijinja::Error,
    },

    #[error("failed to render prompt: {0}")]
    Render(#[from] minijinja::Error),
}

/// Prompt handed to a backend adapter
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Builds prompts from a generation request
pub trait PromptBuilder: Send + Sync {
    fn build(
        &self,
        topic: &str,
        difficulty: &Difficulty,
        exclude: &[String],
    ) -> Result<Prompt, PromptError>;
}

/// Prompt builder backed by minijinja templates
///
/// Templates see `topic`, `difficulty` and `exclude`. Undefined variables
/// are errors.
pub struct TemplatePromptBuilder {
    env: Environment<'static>,
}

impl Default for TemplatePromptBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_SYSTEM, DEFAULT_USER).expect("built-in prompt templates are valid")
    }
}

impl TemplatePromptBuilder {
    /// Create a builder from system and user templates
    pub fn new(system: &str, user: &str) -> Result<Self, PromptError> {
        let mut env = Environment::new();
        env.set_undefined_behavior(minijinja::UndefinedBehavior::Strict);

        for (name, source) in [("system", system), ("user", user)] {
            env.add_template_owned(name, source.to_string())
                .map_err(|source| PromptError::Template {
                    name: name.to_string(),
                    source,
                })?;
        }

        Ok(Self { env })
    }

    /// Create a builder, using configured overrides where present
    pub fn from_settings(settings: &PromptSettings) -> Result<Self, PromptError> {
        Self::new(
            settings.system.as_deref().unwrap_or(DEFAULT_SYSTEM),
            settings.user.as_deref().unwrap_or(DEFAULT_USER),
        )
    }
}

impl PromptBuilder for TemplatePromptBuilder {
    fn build(
        &self,
        topic: &str,
        difficulty: &Difficulty,
        exclude: &[String],
    ) -> Result<Prompt, PromptError> {
        let ctx = context! {
            topic => topic.trim(),
            difficulty => difficulty.describe(),
            exclude => exclude,
        };

        Ok(Prompt {
            system: self.env.get_template("system")?.render(&ctx)?,
            user: self.env.get_template("user")?.render(&ctx)?,
        })
    }
}
