//! Configuration loading, validation, and management for parley.
//!
//! Loads configuration from `~/.parley/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound on `engine.max_context`.
pub const MAX_CONTEXT: usize = 10;

/// The root configuration structure.
///
/// Maps directly to `~/.parley/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Orchestration engine settings
    #[serde(default)]
    pub engine: EngineConfig,

    /// Chat persistence
    #[serde(default)]
    pub store: StoreConfig,

    /// History replay
    #[serde(default)]
    pub projection: ProjectionConfig,

    /// Committed chat metadata
    #[serde(default)]
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Most recent turns sent to reasoning collaborators
    #[serde(default = "default_max_context")]
    pub max_context: usize,

    /// Pause between a successful answer and appending it
    #[serde(default = "default_answer_delay_ms")]
    pub answer_delay_ms: u64,

    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_max_context() -> usize {
    MAX_CONTEXT
}
fn default_answer_delay_ms() -> u64 {
    500
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_context: default_max_context(),
            answer_delay_ms: default_answer_delay_ms(),
            retry: RetryConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn answer_delay(&self) -> Duration {
        Duration::from_millis(self.answer_delay_ms)
    }
}

/// Executor retry loop settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempt cap; ignored when `unbounded` is set
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Retry until an answer or an unrecoverable error, however long it takes
    #[serde(default)]
    pub unbounded: bool,

    /// Per-attempt timeout
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attempt_timeout_secs: Option<u64>,

    /// Pause between attempts
    #[serde(default)]
    pub backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    5
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            unbounded: false,
            attempt_timeout_secs: None,
            backoff_ms: 0,
        }
    }
}

/// Storage backend names accepted in `[store].backend`.
pub const STORE_BACKENDS: &[&str] = &["sqlite", "file", "memory", "none"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_store_backend")]
    pub backend: String,

    /// Database / file location (defaults under `~/.parley/`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

fn default_store_backend() -> String {
    "sqlite".into()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: None,
        }
    }
}

impl StoreConfig {
    /// The configured path, or the backend's default location.
    pub fn resolved_path(&self) -> PathBuf {
        if let Some(path) = &self.path {
            return PathBuf::from(path);
        }
        match self.backend.as_str() {
            "file" => AppConfig::config_dir().join("chats.jsonl"),
            _ => AppConfig::config_dir().join("chats.sqlite"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectionConfig {
    /// Tools whose results are replayed as tool-result entries
    #[serde(default = "default_presentable_tools")]
    pub presentable_tools: Vec<String>,
}

fn default_presentable_tools() -> Vec<String> {
    vec!["retrieve".into()]
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            presentable_tools: default_presentable_tools(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Characters of the first input kept as the chat title
    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,
}

fn default_title_max_chars() -> usize {
    100
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            title_max_chars: default_title_max_chars(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.parley/config.toml).
    ///
    /// Environment overrides:
    /// - `PARLEY_STORE_BACKEND`
    /// - `PARLEY_STORE_PATH`
    /// - `PARLEY_MAX_ATTEMPTS`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;

        if let Ok(backend) = std::env::var("PARLEY_STORE_BACKEND") {
            config.store.backend = backend;
        }

        if let Ok(path) = std::env::var("PARLEY_STORE_PATH") {
            config.store.path = Some(path);
        }

        if let Ok(attempts) = std::env::var("PARLEY_MAX_ATTEMPTS") {
            config.engine.retry.max_attempts = attempts.parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "PARLEY_MAX_ATTEMPTS must be a positive integer, got '{attempts}'"
                ))
            })?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".parley")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_CONTEXT).contains(&self.engine.max_context) {
            return Err(ConfigError::ValidationError(format!(
                "engine.max_context must be between 1 and {MAX_CONTEXT}, got {}",
                self.engine.max_context
            )));
        }

        if self.engine.retry.max_attempts == 0 && !self.engine.retry.unbounded {
            return Err(ConfigError::ValidationError(
                "engine.retry.max_attempts must be at least 1 (or set unbounded = true)".into(),
            ));
        }

        if self.engine.retry.attempt_timeout_secs == Some(0) {
            return Err(ConfigError::ValidationError(
                "engine.retry.attempt_timeout_secs must be > 0".into(),
            ));
        }

        if !STORE_BACKENDS.contains(&self.store.backend.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "store.backend '{}' is not one of {}",
                self.store.backend,
                STORE_BACKENDS.join(", ")
            )));
        }

        if self.chat.title_max_chars == 0 {
            return Err(ConfigError::ValidationError(
                "chat.title_max_chars must be at least 1".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
