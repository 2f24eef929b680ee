//! Engine host configuration.
//!
//! Loaded from a JSON document:
//!
//! ```json
//! {
//!   "database_path": "/var/lib/polyglot/content.sqlite3",
//!   "default_locale": "en",
//!   "log_level": "info",
//!   "log_dir": "/var/log/polyglot"
//! }
//! ```
//!
//! Only `database_path` is required.

use crate::logging::{default_log_level, normalize_level, normalize_log_dir};
use crate::model::locale::is_valid_locale_tag;
use crate::repo::locale_repo::StaticLocaleProvider;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

const DEFAULT_LOCALE: &str = "en";

/// Configuration load and validation errors.
#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "malformed config: {err}"),
            Self::Invalid(message) => write!(f, "invalid config: {message}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    pub database_path: PathBuf,
    #[serde(default = "default_locale")]
    pub default_locale: String,
    #[serde(default = "log_level")]
    pub log_level: String,
    /// Logging stays disabled when unset.
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl EngineConfig {
    /// Config with defaults for everything but the database path.
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            default_locale: default_locale(),
            log_level: log_level(),
            log_dir: None,
        }
    }

    /// Parses and validates a JSON config document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.database_path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid(
                "database_path must not be empty".to_string(),
            ));
        }
        if !is_valid_locale_tag(self.default_locale.trim()) {
            return Err(ConfigError::Invalid(format!(
                "default_locale `{}` is not a valid locale tag",
                self.default_locale
            )));
        }
        normalize_level(&self.log_level).map_err(ConfigError::Invalid)?;
        if let Some(log_dir) = self.log_dir.as_deref() {
            normalize_log_dir(&log_dir.to_string_lossy()).map_err(ConfigError::Invalid)?;
        }
        Ok(())
    }

    /// Locale collaborator answering with `default_locale`.
    pub fn locale_provider(&self) -> StaticLocaleProvider {
        StaticLocaleProvider::new(self.default_locale.clone())
    }
}

fn default_locale() -> String {
    DEFAULT_LOCALE.to_string()
}

fn log_level() -> String {
    default_log_level().to_string()
}
