//! Configuration module for balsync.
//!
//! Typed view of `config.yaml`: database location, deposit service endpoint
//! and token, scheduler interval, logging and notification mail. Missing
//! keys fall back to defaults; `validate` reports every bad field at once.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for balsync.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub depot: DepotConfig,
    pub sync: SyncConfig,
    pub logging: LoggingConfig,
    pub mail: MailConfig,
}

/// Local database settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path to the SQLite database file.
    pub path: PathBuf,
}

/// Deposit service ("API de dépôt") settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DepotConfig {
    /// Base URL of the deposit API, without trailing slash.
    pub url: String,
    /// Client token sent as `Authorization: Token <token>`.
    /// `None` until the operator configures it.
    pub token: Option<String>,
}

/// Periodic synchronization settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Seconds between two reconciliation passes.
    pub poll_interval: u64,
    /// Whether `balsync run` starts the periodic scheduler.
    pub enabled: bool,
}

/// Tracing output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter when neither `RUST_LOG` nor `-v` is given.
    pub level: String,
    /// Output format: `pretty` or `json`.
    pub format: String,
}

/// Notification mail settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    /// Send publication notifications.
    pub enabled: bool,
    /// Sender address.
    pub from: String,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Parses the YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Like [`Config::load`], with defaults when the file is missing or invalid.
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_default()
    }

    /// `config.yaml` under the user configuration directory.
    ///
    /// Typically `$XDG_CONFIG_HOME/balsync/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("balsync")
            .join("config.yaml")
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("~/.local/share"))
                .join("balsync")
                .join("balsync.db"),
        }
    }
}

impl Default for DepotConfig {
    fn default() -> Self {
        Self {
            url: "https://plateforme-bal.adresse.data.gouv.fr/api-depot".to_string(),
            token: None,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: 3600,
            enabled: true,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            from: "adresse@data.gouv.fr".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// One invalid configuration field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted key, such as `depot.url`.
    pub field: String,
    /// What is wrong with the value.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Accepted `logging.level` values.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Valid values for `logging.format`.
const VALID_LOG_FORMATS: &[&str] = &["pretty", "json"];

impl Config {
    /// Checks every section and collects the problems.
    ///
    /// Returns an empty vector when nothing is wrong.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- database ---
        if self.database.path.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "database.path".into(),
                message: "must not be empty".into(),
            });
        }

        // --- depot ---
        if !(self.depot.url.starts_with("http://") || self.depot.url.starts_with("https://")) {
            errors.push(ValidationError {
                field: "depot.url".into(),
                message: format!("must be an http(s) URL, got '{}'", self.depot.url),
            });
        }
        if self.depot.url.ends_with('/') {
            errors.push(ValidationError {
                field: "depot.url".into(),
                message: "must not end with '/'".into(),
            });
        }
        if matches!(&self.depot.token, Some(t) if t.trim().is_empty()) {
            errors.push(ValidationError {
                field: "depot.token".into(),
                message: "must not be blank when set".into(),
            });
        }

        // --- sync ---
        if self.sync.poll_interval == 0 {
            errors.push(ValidationError {
                field: "sync.poll_interval".into(),
                message: "must be greater than 0".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}', expected one of: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }
        if !VALID_LOG_FORMATS.contains(&self.logging.format.as_str()) {
            errors.push(ValidationError {
                field: "logging.format".into(),
                message: format!(
                    "invalid format '{}', expected one of: {}",
                    self.logging.format,
                    VALID_LOG_FORMATS.join(", ")
                ),
            });
        }

        // --- mail ---
        if self.mail.enabled && crate::domain::Email::new(self.mail.from.as_str()).is_err() {
            errors.push(ValidationError {
                field: "mail.from".into(),
                message: format!("invalid sender address '{}'", self.mail.from),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`Config`].
///
/// # Example
///
/// ```
/// use balsync_core::config::ConfigBuilder;
///
/// let config = ConfigBuilder::new()
///     .depot_url("http://localhost:5000")
///     .sync_poll_interval(60)
///     .logging_level("debug")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Starts from [`Config::default`].
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn database_path(mut self, path: PathBuf) -> Self {
        self.config.database.path = path;
        self
    }

    pub fn depot_url(mut self, url: impl Into<String>) -> Self {
        self.config.depot.url = url.into();
        self
    }

    pub fn depot_token(mut self, token: impl Into<String>) -> Self {
        self.config.depot.token = Some(token.into());
        self
    }

    pub fn sync_poll_interval(mut self, seconds: u64) -> Self {
        self.config.sync.poll_interval = seconds;
        self
    }

    pub fn sync_enabled(mut self, enabled: bool) -> Self {
        self.config.sync.enabled = enabled;
        self
    }

    pub fn logging_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn logging_format(mut self, format: impl Into<String>) -> Self {
        self.config.logging.format = format.into();
        self
    }

    pub fn mail_enabled(mut self, enabled: bool) -> Self {
        self.config.mail.enabled = enabled;
        self
    }

    pub fn mail_from(mut self, from: impl Into<String>) -> Self {
        self.config.mail.from = from.into();
        self
    }

    /// Returns the configuration without validating it.
    pub fn build(self) -> Config {
        self.config
    }

    /// Builds, then validates. `Err` carries every
    /// [`ValidationError`] found.
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
