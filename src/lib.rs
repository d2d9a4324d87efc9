//! quiz-mux: generate validated multiple-choice questions across LLM backends
//!
//! The [`Orchestrator`] rotates requests across every backend that has
//! credentials, retries transient failures, normalizes the backend's JSON
//! into a [`Question`] and keeps per-backend health statistics.

pub mod backend;
pub mod cache;
pub mod cli;
pub mod config;
pub mod events;
pub mod health;
pub mod logging;
pub mod orchestrator;
pub mod question;

#[cfg(test)]
pub(crate) mod testing;

pub use config::QuizMuxConfig;
pub use events::{EventSink, GenerationEvent, JsonSink, TracingSink};
pub use orchestrator::{AttemptError, GenerationError, Orchestrator};
pub use question::{Difficulty, Question};
