//! Output handlers for CLI commands
//!
//! Supports console (pretty), JSON, and quiet output modes.

use crate::cache::CacheStats;
use crate::health::ProviderStats;
use crate::question::Question;
use serde::Serialize;
use std::io::Write;

/// Output mode for CLI
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputMode {
    #[default]
    Console,
    Json,
    Quiet,
}

impl OutputMode {
    /// Pick a mode from the global flags; JSON wins over quiet
    pub fn from_flags(json: bool, quiet: bool) -> Self {
        if json {
            Self::Json
        } else if quiet {
            Self::Quiet
        } else {
            Self::Console
        }
    }
}

/// One row of the `backends` listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BackendRow {
    pub name: String,
    pub kind: String,
    pub model: String,
    pub env_var: String,
    pub enabled: bool,
    pub credentials: bool,
}

/// Events emitted by CLI commands
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutputEvent {
    GenerateStart {
        topic: String,
        difficulty: String,
        count: usize,
    },
    QuestionGenerated {
        index: usize,
        total: usize,
        question: Question,
    },
    GenerateError {
        index: usize,
        error: String,
    },
    Backend(BackendRow),
    Stats {
        providers: Vec<ProviderStats>,
        cache: CacheStats,
    },
    Info {
        message: String,
    },
    Debug {
        message: String,
    },
}

/// Output handler trait
pub trait OutputHandler: Send + Sync {
    /// Emit an event
    fn emit(&self, event: OutputEvent);

    /// Write the final summary
    fn result(&self, success: bool, generated: usize);
}

/// Console output handler
pub struct ConsoleHandler {
    debug: bool,
}

impl ConsoleHandler {
    /// Create a new console handler
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    fn format_duration(ms: f64) -> String {
        if ms < 1000.0 {
            format!("{:.0}ms", ms)
        } else {
            format!("{:.1}s", ms / 1000.0)
        }
    }

    fn format_question(index: usize, question: &Question) -> String {
        let mut out = format!(
            "{}. {}  [{}]\n",
            index, question.question_text, question.difficulty
        );
        for (i, answer) in question.answers.iter().enumerate() {
            let letter = (b'a' + (i % 26) as u8) as char;
            let mark = if answer.is_correct { " ✓" } else { "" };
            out.push_str(&format!("   {}) {}{}\n", letter, answer.text, mark));
        }
        out
    }
}

impl OutputHandler for ConsoleHandler {
    fn emit(&self, event: OutputEvent) {
        match event {
            OutputEvent::GenerateStart {
                topic,
                difficulty,
                count,
            } => {
                eprintln!(
                    "Generating {} {} question(s) about '{}'",
                    count, difficulty, topic
                );
            }
            OutputEvent::QuestionGenerated {
                index, question, ..
            } => {
                let mut stdout = std::io::stdout().lock();
                let _ = writeln!(stdout, "{}", Self::format_question(index, &question));
            }
            OutputEvent::GenerateError { index, error } => {
                eprintln!("✗ Question {} failed: {}", index, error);
            }
            OutputEvent::Backend(row) => {
                let enabled = if row.enabled { "✓" } else { "✗" };
                let credentials = if row.credentials {
                    "key set"
                } else {
                    "key missing"
                };
                println!(
                    "{} {} - {} {} ({}: {})",
                    enabled, row.name, row.kind, row.model, row.env_var, credentials
                );
            }
            OutputEvent::Stats { providers, cache } => {
                eprintln!();
                eprintln!("Providers:");
                for p in providers {
                    eprintln!(
                        "  {} [{}] {} requests, {} ok, {} failed, avg {}",
                        p.name,
                        p.status,
                        p.requests,
                        p.successes,
                        p.failures,
                        Self::format_duration(p.average_response_time_ms)
                    );
                }
                eprintln!(
                    "Cache: {}/{} entries, {} duplicates, {} evictions",
                    cache.entries, cache.capacity, cache.duplicates, cache.evictions
                );
            }
            OutputEvent::Info { message } => {
                eprintln!("{}", message);
            }
            OutputEvent::Debug { message } => {
                if self.debug {
                    eprintln!("[debug] {}", message);
                }
            }
        }
    }

    fn result(&self, success: bool, generated: usize) {
        if success {
            eprintln!("✓ Generated {} question(s)", generated);
        } else {
            eprintln!("✗ Generated {} question(s) with errors", generated);
        }
    }
}

/// JSON output handler
pub struct JsonHandler {
    pretty: bool,
}

impl JsonHandler {
    /// Create a new JSON handler
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn print_json<T: Serialize>(&self, value: &T) {
        let json = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };

        if let Ok(s) = json {
            println!("{}", s);
        }
    }
}

impl OutputHandler for JsonHandler {
    fn emit(&self, event: OutputEvent) {
        self.print_json(&event);
    }

    fn result(&self, success: bool, generated: usize) {
        #[derive(Serialize)]
        struct FinalResult {
            success: bool,
            generated: usize,
        }

        self.print_json(&FinalResult { success, generated });
    }
}

/// Quiet handler that prints only generated questions and backend rows
pub struct QuietHandler;

impl OutputHandler for QuietHandler {
    fn emit(&self, event: OutputEvent) {
        match event {
            OutputEvent::QuestionGenerated {
                index, question, ..
            } => {
                println!("{}", ConsoleHandler::format_question(index, &question));
            }
            OutputEvent::Backend(row) => println!("{}", row.name),
            _ => {}
        }
    }

    fn result(&self, _success: bool, _generated: usize) {}
}

/// Create an output handler based on mode
pub fn create_handler(mode: OutputMode, debug: bool) -> Box<dyn OutputHandler> {
    match mode {
        OutputMode::Console => Box::new(ConsoleHandler::new(debug)),
        OutputMode::Json => Box::new(JsonHandler::new(false)),
        OutputMode::Quiet => Box::new(QuietHandler),
    }
}
