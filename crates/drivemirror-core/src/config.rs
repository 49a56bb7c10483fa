//! Configuration module for DriveMirror.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for DriveMirror.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub sync: SyncConfig,
    pub readiness: ReadinessConfig,
    pub remote: RemoteConfig,
    pub logging: LoggingConfig,
}

/// Mirroring settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Local directory treated as the source of truth.
    pub local_dir: Option<PathBuf>,
    /// Display name of the remote folder to mirror into.
    pub remote_folder: Option<String>,
    /// Clear the debounce ledger entry of a path when it is deleted locally.
    pub forget_on_delete: bool,
    /// Filesystem events buffered while the startup reconciliation runs.
    pub event_buffer: usize,
}

/// Bounded retry policy used before reading a freshly written file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Open attempts before giving up and uploading anyway.
    pub max_attempts: u32,
    /// Fixed delay between attempts, in milliseconds.
    pub retry_delay_ms: u64,
}

/// Remote store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Base URL of the Drive REST API.
    pub api_base_url: String,
    /// Environment variable holding a bearer access token.
    pub access_token_env: String,
    /// File holding a bearer access token; takes precedence over the env var.
    pub access_token_file: Option<PathBuf>,
    /// Per-request timeout, in seconds.
    pub request_timeout_secs: u64,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/drivemirror/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("drivemirror")
            .join("config.yaml")
    }
}

impl ReadinessConfig {
    /// The retry delay as a [`Duration`].
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

impl RemoteConfig {
    /// The request timeout as a [`Duration`].
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            local_dir: None,
            remote_folder: None,
            forget_on_delete: true,
            event_buffer: 1024,
        }
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            retry_delay_ms: 100,
        }
    }
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            api_base_url: "https://www.googleapis.com".to_string(),
            access_token_env: "DRIVEMIRROR_ACCESS_TOKEN".to_string(),
            access_token_file: None,
            request_timeout_secs: 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"readiness.max_attempts"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid. Whether the local
    /// directory actually exists is checked at startup, not here.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- sync ---
        if self.sync.local_dir.is_none() {
            errors.push(ValidationError {
                field: "sync.local_dir".into(),
                message: "a local directory is required".into(),
            });
        }
        match self.sync.remote_folder.as_deref() {
            None => errors.push(ValidationError {
                field: "sync.remote_folder".into(),
                message: "a remote folder name is required".into(),
            }),
            Some(name) if name.trim().is_empty() => errors.push(ValidationError {
                field: "sync.remote_folder".into(),
                message: "must not be blank".into(),
            }),
            Some(_) => {}
        }
        if self.sync.event_buffer == 0 {
            errors.push(ValidationError {
                field: "sync.event_buffer".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- readiness ---
        if self.readiness.max_attempts == 0 {
            errors.push(ValidationError {
                field: "readiness.max_attempts".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- remote ---
        if !(self.remote.api_base_url.starts_with("http://")
            || self.remote.api_base_url.starts_with("https://"))
        {
            errors.push(ValidationError {
                field: "remote.api_base_url".into(),
                message: format!(
                    "must be an http(s) URL, got '{}'",
                    self.remote.api_base_url
                ),
            });
        }
        if self.remote.access_token_env.trim().is_empty() {
            errors.push(ValidationError {
                field: "remote.access_token_env".into(),
                message: "must not be blank".into(),
            });
        }
        if self.remote.request_timeout_secs == 0 {
            errors.push(ValidationError {
                field: "remote.request_timeout_secs".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Builder for constructing a [`Config`] programmatically.
///
/// Starts from [`Config::default`] (or an existing config) and allows
/// selective overrides, e.g. from command-line arguments.
///
/// # Example
///
/// ```rust,no_run
/// use drivemirror_core::config::ConfigBuilder;
/// use std::path::PathBuf;
///
/// let config = ConfigBuilder::new()
///     .local_dir(PathBuf::from("/home/user/Outbox"))
///     .remote_folder("Sync")
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder initialised with [`Config::default`] values.
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Create a builder that starts from an already loaded configuration.
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    // --- sync ---

    pub fn local_dir(mut self, dir: PathBuf) -> Self {
        self.config.sync.local_dir = Some(dir);
        self
    }

    pub fn remote_folder(mut self, name: impl Into<String>) -> Self {
        self.config.sync.remote_folder = Some(name.into());
        self
    }

    pub fn forget_on_delete(mut self, forget: bool) -> Self {
        self.config.sync.forget_on_delete = forget;
        self
    }

    pub fn event_buffer(mut self, capacity: usize) -> Self {
        self.config.sync.event_buffer = capacity;
        self
    }

    // --- readiness ---

    pub fn readiness_max_attempts(mut self, attempts: u32) -> Self {
        self.config.readiness.max_attempts = attempts;
        self
    }

    pub fn readiness_retry_delay_ms(mut self, ms: u64) -> Self {
        self.config.readiness.retry_delay_ms = ms;
        self
    }

    // --- remote ---

    pub fn api_base_url(mut self, url: impl Into<String>) -> Self {
        self.config.remote.api_base_url = url.into();
        self
    }

    pub fn access_token_file(mut self, file: PathBuf) -> Self {
        self.config.remote.access_token_file = Some(file);
        self
    }

    // --- logging ---

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_json(mut self, json: bool) -> Self {
        self.config.logging.json = json;
        self
    }

    // --- build ---

    /// Consume the builder and return the finished [`Config`].
    pub fn build(self) -> Config {
        self.config
    }

    /// Build and validate in one step. Returns `Err` with the list of
    /// validation errors if the configuration is invalid.
    pub fn build_validated(self) -> Result<Config, Vec<ValidationError>> {
        let config = self.build();
        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(errors)
        }
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
