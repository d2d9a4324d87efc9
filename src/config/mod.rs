//! Configuration types and loading for quiz-mux

mod backend;
mod loader;

pub use backend::{BackendConfig, BackendKind, builtin_backends};
pub use loader::{
    CacheLayer, CacheSettings, ConfigLayer, Defaults, DefaultsLayer, PromptSettings, QuizMuxConfig,
    RetryLayer, RetrySettings,
};
