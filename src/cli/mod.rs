//! CLI module for quiz-mux
//!
//! This module provides:
//! - Command implementations (generate, backends)
//! - Output handlers (console, JSON, quiet)
//!
//! # Example
//!
//! ```ignore
//! use quiz_mux::cli::{commands, output};
//!
//! let handler = output::create_handler(output::OutputMode::Console, false);
//! let exit_code = commands::generate(&orchestrator, &request, &*handler).await;
//! ```

pub mod commands;
pub mod output;

pub use commands::{GenerateRequest, generate, list_backends};
pub use output::{BackendRow, OutputEvent, OutputHandler, OutputMode, create_handler};
