//! Generation events and the sinks that receive them
//!
//! The orchestrator reports what it does through an [`EventSink`]; where the
//! events end up (tracing, JSON lines, a test buffer) is the sink's business.

use serde::{Deserialize, Serialize};
use std::io::Write;

/// Events emitted while generating a question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum GenerationEvent {
    Request {
        backend: String,
        attempt: u32,
        topic: String,
    },
    Success {
        backend: String,
        attempt: u32,
        duration_ms: u64,
    },
    Fallback {
        backend: String,
        attempt: u32,
        error: String,
    },
    Error {
        topic: String,
        difficulty: String,
        attempts: u32,
        error: String,
    },
    ConfigMissing {
        backend: String,
        env_var: String,
    },
    Duplicate {
        backend: String,
        question: String,
        access_count: u32,
    },
}

impl GenerationEvent {
    /// Event name as it appears in serialized output
    pub fn kind(&self) -> &'static str {
        match self {
            GenerationEvent::Request { .. } => "request",
            GenerationEvent::Success { .. } => "success",
            GenerationEvent::Fallback { .. } => "fallback",
            GenerationEvent::Error { .. } => "error",
            GenerationEvent::ConfigMissing { .. } => "config-missing",
            GenerationEvent::Duplicate { .. } => "duplicate",
        }
    }
}

/// Logging port for the orchestrator
pub trait EventSink: Send + Sync {
    fn emit(&self, event: GenerationEvent);
}

/// Forwards events to `tracing`
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: GenerationEvent) {
        match event {
            GenerationEvent::Request {
                backend,
                attempt,
                topic,
            } => {
                tracing::debug!(%backend, attempt, %topic, "requesting question");
            }
            GenerationEvent::Success {
                backend,
                attempt,
                duration_ms,
            } => {
                tracing::info!(%backend, attempt, duration_ms, "question generated");
            }
            GenerationEvent::Fallback {
                backend,
                attempt,
                error,
            } => {
                tracing::warn!(%backend, attempt, %error, "backend failed, falling back");
            }
            GenerationEvent::Error {
                topic,
                difficulty,
                attempts,
                error,
            } => {
                tracing::error!(%topic, %difficulty, attempts, %error, "question generation failed");
            }
            GenerationEvent::ConfigMissing { backend, env_var } => {
                tracing::warn!(%backend, %env_var, "missing credentials, backend disabled");
            }
            GenerationEvent::Duplicate {
                backend,
                question,
                access_count,
            } => {
                tracing::info!(%backend, %question, access_count, "duplicate question generated");
            }
        }
    }
}

/// Writes one JSON object per event to stderr
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSink;

impl EventSink for JsonSink {
    fn emit(&self, event: GenerationEvent) {
        if let Ok(json) = serde_json::to_string(&event) {
            let _ = writeln!(std::io::stderr().lock(), "{}", json);
        }
    }
}
