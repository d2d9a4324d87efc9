use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable that overrides the computed filter
pub const LOG_ENV: &str = "QUIZ_MUX_LOG";

/// Logging options from the command line
#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub debug: bool,
    pub quiet: bool,

    /// Emit stderr logs as JSON lines
    pub json: bool,

    pub log_file: Option<PathBuf>,
}

/// Filter directive for the given verbosity
pub fn default_filter(debug: bool, quiet: bool) -> &'static str {
    if debug {
        "quiz_mux=debug"
    } else if quiet {
        "quiz_mux=error"
    } else {
        "quiz_mux=info"
    }
}

/// Initialize logging to stderr and, optionally, a log file
///
/// The returned guard flushes the file writer on drop and must be held
/// for the life of the process.
pub fn init_logging(options: &LogOptions) -> anyhow::Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_filter(options.debug, options.quiet)));

    let text_layer = (!options.json).then(|| {
        fmt::layer()
            .with_target(false)
            .with_line_number(options.debug)
            .with_file(options.debug)
            .with_writer(std::io::stderr)
    });

    let json_layer = options.json.then(|| {
        fmt::layer()
            .json()
            .with_current_span(false)
            .with_writer(std::io::stderr)
    });

    let (file_layer, guard) = match &options.log_file {
        Some(path) => {
            let (writer, guard) = file_writer(path)?;
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_target(true)
                .with_line_number(true)
                .with_file(true);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(text_layer)
        .with(json_layer)
        .with(file_layer)
        .init();

    Ok(guard)
}

fn file_writer(
    path: &Path,
) -> anyhow::Result<(tracing_appender::non_blocking::NonBlocking, WorkerGuard)> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let file_name = path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("Log path has no file name: {}", path.display()))?;

    let appender = tracing_appender::rolling::never(dir, file_name);
    Ok(tracing_appender::non_blocking(appender))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_filter() {
        assert_eq!(default_filter(true, false), "quiz_mux=debug");
        assert_eq!(default_filter(true, true), "quiz_mux=debug");
        assert_eq!(default_filter(false, true), "quiz_mux=error");
        assert_eq!(default_filter(false, false), "quiz_mux=info");
    }

    #[test]
    fn test_file_writer_creates_directory() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("nested").join("run.log");

        let (_writer, _guard) = file_writer(&path).unwrap();
        assert!(temp.path().join("nested").is_dir());
    }
}
