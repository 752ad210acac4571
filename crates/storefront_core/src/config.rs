//! Storefront runtime configuration.
//!
//! # Responsibility
//! - Build one explicit configuration value at startup.
//! - Read overrides from `STOREFRONT_*` environment variables.
//!
//! # Invariants
//! - Page defaults and worker count are always >= 1 once loaded.
//! - Loading never mutates process-wide state; callers pass the value on.

use crate::logging::default_log_level;
use crate::pagination::PageDefaults;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "STOREFRONT_DB_PATH";
pub const ENV_DEFAULT_PAGE: &str = "STOREFRONT_DEFAULT_PAGE";
pub const ENV_DEFAULT_PAGE_SIZE: &str = "STOREFRONT_DEFAULT_PAGE_SIZE";
pub const ENV_RECONCILE_WORKERS: &str = "STOREFRONT_RECONCILE_WORKERS";
pub const ENV_LOG_LEVEL: &str = "STOREFRONT_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "STOREFRONT_LOG_DIR";

pub const DEFAULT_PAGE: i32 = 1;
pub const DEFAULT_PAGE_SIZE: i32 = 100;
pub const DEFAULT_RECONCILE_WORKERS: usize = 5;
const DEFAULT_DB_PATH: &str = "storefront.db";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidNumber { key: &'static str, value: String },
    NotPositive { key: &'static str, value: i64 },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidNumber { key, value } => {
                write!(f, "{key} must be an integer, got `{value}`")
            }
            Self::NotPositive { key, value } => write!(f, "{key} must be >= 1, got {value}"),
        }
    }
}

impl Error for ConfigError {}

/// Explicit configuration handed to services at construction time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorefrontConfig {
    pub db_path: PathBuf,
    pub default_page: i32,
    pub default_page_size: i32,
    pub reconcile_workers: usize,
    pub log_level: String,
    /// File logging stays off when unset.
    pub log_dir: Option<PathBuf>,
}

impl Default for StorefrontConfig {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(DEFAULT_DB_PATH),
            default_page: DEFAULT_PAGE,
            default_page_size: DEFAULT_PAGE_SIZE,
            reconcile_workers: DEFAULT_RECONCILE_WORKERS,
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl StorefrontConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Loads configuration through an arbitrary key lookup.
    ///
    /// Missing or blank keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(path) = read(ENV_DB_PATH) {
            config.db_path = PathBuf::from(path);
        }
        if let Some(value) = read(ENV_DEFAULT_PAGE) {
            config.default_page = positive_i32(ENV_DEFAULT_PAGE, &value)?;
        }
        if let Some(value) = read(ENV_DEFAULT_PAGE_SIZE) {
            config.default_page_size = positive_i32(ENV_DEFAULT_PAGE_SIZE, &value)?;
        }
        if let Some(value) = read(ENV_RECONCILE_WORKERS) {
            let workers = positive_i32(ENV_RECONCILE_WORKERS, &value)?;
            config.reconcile_workers = usize::try_from(workers).unwrap_or(DEFAULT_RECONCILE_WORKERS);
        }
        if let Some(level) = read(ENV_LOG_LEVEL) {
            config.log_level = level;
        }
        if let Some(dir) = read(ENV_LOG_DIR) {
            config.log_dir = Some(PathBuf::from(dir));
        }

        Ok(config)
    }

    pub fn page_defaults(&self) -> PageDefaults {
        PageDefaults {
            page: self.default_page,
            page_size: self.default_page_size,
        }
    }
}

fn positive_i32(key: &'static str, value: &str) -> Result<i32, ConfigError> {
    let parsed = value
        .parse::<i32>()
        .map_err(|_| ConfigError::InvalidNumber {
            key,
            value: value.to_string(),
        })?;
    if parsed < 1 {
        return Err(ConfigError::NotPositive {
            key,
            value: i64::from(parsed),
        });
    }
    Ok(parsed)
}
