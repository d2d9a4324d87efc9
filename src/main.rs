use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use quiz_mux::backend::{ReqwestTransport, backends_from_env};
use quiz_mux::cli::{self, GenerateRequest, OutputMode};
use quiz_mux::config::QuizMuxConfig;
use quiz_mux::events::{EventSink, JsonSink, TracingSink};
use quiz_mux::logging::{self, LogOptions};
use quiz_mux::{Difficulty, Orchestrator};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "quiz-mux")]
#[command(about = "Multiplexer for question generation - route quiz prompts across LLM backends")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project directory for .quiz-mux/config.toml (defaults to current)
    #[arg(long, global = true)]
    dir: Option<PathBuf>,

    /// Enable debug output
    #[arg(long, global = true)]
    debug: bool,

    /// Suppress normal output
    #[arg(long, global = true)]
    quiet: bool,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Emit generation events as JSON lines on stderr
    #[arg(long, global = true)]
    json_events: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate multiple-choice questions
    Generate {
        /// Question topic
        topic: String,

        /// easy, medium, hard or custom:<description>
        #[arg(long, short, default_value = "medium")]
        difficulty: Difficulty,

        /// Question text to avoid (repeatable)
        #[arg(long = "exclude", short = 'x')]
        exclude: Vec<String>,

        /// Number of questions
        #[arg(long, short = 'n', default_value_t = 1)]
        count: usize,

        /// Print questions as JSON
        #[arg(long)]
        json: bool,

        /// Print provider and cache statistics afterwards
        #[arg(long)]
        stats: bool,
    },

    /// List configured backends and whether their API keys are set
    Backends,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let project_dir = cli.dir.as_deref();
    let config = QuizMuxConfig::load(project_dir)?;

    let log_file = cli.log_file.clone().or_else(|| config.log_file());
    let log_guard = logging::init_logging(&LogOptions {
        debug: cli.debug,
        quiet: cli.quiet,
        json: cli.json_events,
        log_file,
    })?;

    let code = match cli.command {
        Commands::Backends => {
            let handler = cli::create_handler(OutputMode::from_flags(false, cli.quiet), cli.debug);
            cli::list_backends(&config, |var| std::env::var(var).ok(), &*handler);
            0
        }

        Commands::Generate {
            topic,
            difficulty,
            exclude,
            count,
            json,
            stats,
        } => {
            let events: Arc<dyn EventSink> = if cli.json_events {
                Arc::new(JsonSink)
            } else {
                Arc::new(TracingSink)
            };

            let backends = backends_from_env(&config, events.as_ref());
            let orchestrator =
                Orchestrator::from_config(&config, backends, Arc::new(ReqwestTransport::new()))
                    .context("Invalid prompt template in config")?
                    .with_events(events);

            let handler = cli::create_handler(OutputMode::from_flags(json, cli.quiet), cli.debug);
            let request = GenerateRequest {
                topic,
                difficulty,
                exclude,
                count,
                show_stats: stats,
            };

            cli::generate(&orchestrator, &request, &*handler).await
        }
    };

    // Flush the file log before exiting
    drop(log_guard);
    if code != 0 {
        std::process::exit(code);
    }

    Ok(())
}
