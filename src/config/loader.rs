//! Configuration loading with multi-layer merge

use super::backend::{BackendConfig, builtin_backends};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Resolved quiz-mux configuration after all layers are merged
#[derive(Debug, Clone, Serialize)]
pub struct QuizMuxConfig {
    /// Global defaults
    pub defaults: Defaults,

    /// Backoff tuning
    pub retry: RetrySettings,

    /// Duplicate cache bounds
    pub cache: CacheSettings,

    /// Prompt template overrides
    pub prompt: PromptSettings,

    /// Backend definitions, keyed by name
    pub backends: BTreeMap<String, BackendConfig>,
}

impl Default for QuizMuxConfig {
    fn default() -> Self {
        Self {
            defaults: Defaults::default(),
            retry: RetrySettings::default(),
            cache: CacheSettings::default(),
            prompt: PromptSettings::default(),
            backends: builtin_backends(),
        }
    }
}

/// Global default settings
#[derive(Debug, Clone, Serialize)]
pub struct Defaults {
    /// Default timeout in seconds per backend call
    pub timeout: u64,

    /// Default same-backend retries
    pub max_retries: u32,

    /// Cross-backend retries after the first attempt
    pub attempts: u32,

    /// Log file path (tilde expanded)
    pub log_file: Option<String>,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: 30,
            max_retries: 2,
            attempts: 2,
            log_file: None,
        }
    }
}

/// Backoff settings in milliseconds
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RetrySettings {
    pub base_delay_ms: u64,
    pub rate_limit_delay_ms: u64,
    pub jitter_cap_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            rate_limit_delay_ms: 5000,
            jitter_cap_ms: 1000,
            max_delay_ms: 60_000,
        }
    }
}

/// Duplicate cache bounds
#[derive(Debug, Clone, Serialize)]
pub struct CacheSettings {
    /// Maximum number of remembered questions
    pub capacity: usize,

    /// Forget questions older than this many seconds
    pub ttl_secs: Option<u64>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            capacity: 1000,
            ttl_secs: None,
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_secs.map(Duration::from_secs)
    }
}

/// Optional minijinja templates replacing the built-in prompt
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PromptSettings {
    pub system: Option<String>,
    pub user: Option<String>,
}

/// One config file as written
///
/// Every key is optional so that merging only touches what the file sets.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigLayer {
    #[serde(default)]
    pub defaults: DefaultsLayer,

    #[serde(default)]
    pub retry: RetryLayer,

    #[serde(default)]
    pub cache: CacheLayer,

    #[serde(default)]
    pub prompt: PromptSettings,

    #[serde(default)]
    pub backends: BTreeMap<String, BackendConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultsLayer {
    pub timeout: Option<u64>,
    pub max_retries: Option<u32>,
    pub attempts: Option<u32>,
    pub log_file: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryLayer {
    pub base_delay_ms: Option<u64>,
    pub rate_limit_delay_ms: Option<u64>,
    pub jitter_cap_ms: Option<u64>,
    pub max_delay_ms: Option<u64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CacheLayer {
    pub capacity: Option<usize>,
    pub ttl_secs: Option<u64>,
}

/// Copy each key the layer sets onto the resolved section
macro_rules! overlay {
    ($target:expr, $layer:expr, $($field:ident),*) => {
        $(if let Some(value) = $layer.$field {
            $target.$field = value;
        })*
    };
}

impl QuizMuxConfig {
    /// Load configuration from the standard hierarchy
    ///
    /// Load order (later overrides earlier):
    /// 1. Built-in defaults
    /// 2. ~/.config/quiz-mux/config.toml
    /// 3. .quiz-mux/config.toml (project)
    pub fn load(project_dir: Option<&Path>) -> Result<Self> {
        let project_config_path = project_dir
            .map(|p| p.join(".quiz-mux/config.toml"))
            .unwrap_or_else(|| PathBuf::from(".quiz-mux/config.toml"));

        let layers: Vec<PathBuf> = Self::user_config_path()
            .into_iter()
            .chain(std::iter::once(project_config_path))
            .collect();

        Self::load_layers(&layers)
    }

    /// Merge the files that exist in `paths` over the built-in defaults, in order
    pub fn load_layers(paths: &[PathBuf]) -> Result<Self> {
        let mut config = Self::default();

        for path in paths.iter().filter(|p| p.exists()) {
            let layer = Self::load_file(path)
                .with_context(|| format!("loading {}", path.display()))?;
            config.merge(layer);
        }

        Ok(config)
    }

    /// Load a single config layer from a file
    ///
    /// The result holds only what the file sets; it has no built-in backends.
    pub fn load_file(path: &Path) -> Result<ConfigLayer> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let layer: ConfigLayer = toml::from_str(&contents)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(layer)
    }

    /// Get the user config path (~/.config/quiz-mux/config.toml)
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("quiz-mux/config.toml"))
    }

    /// Merge a config layer into this one, key by key (layer takes precedence)
    pub fn merge(&mut self, other: ConfigLayer) {
        overlay!(self.defaults, other.defaults, timeout, max_retries, attempts);
        if other.defaults.log_file.is_some() {
            self.defaults.log_file = other.defaults.log_file;
        }

        overlay!(
            self.retry,
            other.retry,
            base_delay_ms,
            rate_limit_delay_ms,
            jitter_cap_ms,
            max_delay_ms
        );

        overlay!(self.cache, other.cache, capacity);
        if other.cache.ttl_secs.is_some() {
            self.cache.ttl_secs = other.cache.ttl_secs;
        }

        if other.prompt.system.is_some() {
            self.prompt.system = other.prompt.system;
        }
        if other.prompt.user.is_some() {
            self.prompt.user = other.prompt.user;
        }

        // Backends merge field by field so a layer can tweak one setting
        for (name, backend) in other.backends {
            match self.backends.get_mut(&name) {
                Some(existing) => existing.merge(backend),
                None => {
                    self.backends.insert(name, backend);
                }
            }
        }
    }

    /// Get a backend by name
    pub fn get_backend(&self, name: &str) -> Option<&BackendConfig> {
        self.backends.get(name)
    }

    /// Get all enabled backends, in name order
    pub fn enabled_backends(&self) -> impl Iterator<Item = (&String, &BackendConfig)> {
        self.backends.iter().filter(|(_, b)| b.is_enabled())
    }

    /// Timeout for a backend, falling back to the global default
    pub fn timeout_for(&self, backend: &BackendConfig) -> Duration {
        Duration::from_secs(backend.timeout.unwrap_or(self.defaults.timeout))
    }

    /// Same-backend retries for a backend, falling back to the global default
    pub fn max_retries_for(&self, backend: &BackendConfig) -> u32 {
        backend.max_retries.unwrap_or(self.defaults.max_retries)
    }

    /// Expanded log file path, if configured
    pub fn log_file(&self) -> Option<PathBuf> {
        self.defaults
            .log_file
            .as_deref()
            .map(|p| PathBuf::from(shellexpand::tilde(p).into_owned()))
    }
}
