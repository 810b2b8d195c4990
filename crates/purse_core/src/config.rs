//! Process configuration and bootstrap.
//!
//! # Responsibility
//! - Hold the settings a host process needs to stand up the core.
//! - Apply `PURSE_*` environment overrides on top of defaults.
//! - Initialize logging and open the storage gateway in one call.

use crate::db::{open_db, open_db_in_memory, DbError, StorageGateway};
use crate::logging::{default_log_level, init_logging, normalize_level, normalize_log_dir, LoggingError};
use log::info;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "PURSE_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "PURSE_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "PURSE_LOG_DIR";
pub const ENV_REQUEST_BUDGET_MS: &str = "PURSE_REQUEST_BUDGET_MS";

pub const DEFAULT_REQUEST_BUDGET_MS: u64 = 5_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// SQLite file; `None` opens an in-memory database.
    pub db_path: Option<PathBuf>,
    pub log_level: String,
    /// Absolute log directory; `None` leaves logging uninitialized.
    pub log_dir: Option<PathBuf>,
    /// Per-operation time budget handed to services.
    pub request_budget_ms: u64,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: default_log_level().to_string(),
            log_dir: None,
            request_budget_ms: DEFAULT_REQUEST_BUDGET_MS,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue { key: &'static str, message: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidValue { key, message } => write!(f, "invalid `{key}`: {message}"),
        }
    }
}

impl Error for ConfigError {}

impl CoreConfig {
    /// Defaults overridden by `PURSE_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup`; blank values are ignored.
    pub fn with_overrides(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        if let Some(path) = read(ENV_DB_PATH) {
            self.db_path = Some(PathBuf::from(path));
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            self.log_level = level;
        }
        if let Some(dir) = read(ENV_LOG_DIR) {
            self.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(budget) = read(ENV_REQUEST_BUDGET_MS) {
            self.request_budget_ms =
                budget
                    .parse::<u64>()
                    .map_err(|err| ConfigError::InvalidValue {
                        key: ENV_REQUEST_BUDGET_MS,
                        message: format!("`{budget}` is not a whole number of milliseconds: {err}"),
                    })?;
        }
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        normalize_level(&self.log_level).map_err(|err| ConfigError::InvalidValue {
            key: "log_level",
            message: err.to_string(),
        })?;
        if let Some(dir) = &self.log_dir {
            normalize_log_dir(dir).map_err(|err| ConfigError::InvalidValue {
                key: "log_dir",
                message: err.to_string(),
            })?;
        }
        if self.request_budget_ms == 0 {
            return Err(ConfigError::InvalidValue {
                key: "request_budget_ms",
                message: "budget must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn request_budget(&self) -> Duration {
        Duration::from_millis(self.request_budget_ms)
    }
}

#[derive(Debug)]
pub enum BootstrapError {
    Config(ConfigError),
    Logging(LoggingError),
    Db(DbError),
}

impl Display for BootstrapError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(err) => write!(f, "configuration rejected: {err}"),
            Self::Logging(err) => write!(f, "logging bootstrap failed: {err}"),
            Self::Db(err) => write!(f, "database bootstrap failed: {err}"),
        }
    }
}

impl Error for BootstrapError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(err) => Some(err),
            Self::Logging(err) => Some(err),
            Self::Db(err) => Some(err),
        }
    }
}

impl From<ConfigError> for BootstrapError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

impl From<LoggingError> for BootstrapError {
    fn from(value: LoggingError) -> Self {
        Self::Logging(value)
    }
}

impl From<DbError> for BootstrapError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

/// Validates `config`, starts logging if configured and opens storage.
pub fn bootstrap(config: &CoreConfig) -> Result<StorageGateway, BootstrapError> {
    config.validate()?;
    if let Some(dir) = &config.log_dir {
        init_logging(&config.log_level, dir)?;
    }

    let gateway = match &config.db_path {
        Some(path) => open_db(path)?,
        None => open_db_in_memory()?,
    };
    info!(
        "event=core_bootstrap module=config status=ok storage={} budget_ms={}",
        if config.db_path.is_some() { "file" } else { "memory" },
        config.request_budget_ms
    );
    Ok(gateway)
}
