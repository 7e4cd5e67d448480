//! # Configuration Module
//!
//! Settings for the storage, search fetching and retry collaborators, read
//! from a TOML file (`sift.toml` by default) with a few environment
//! overrides for deployment secrets. Every section has defaults so a missing
//! file still yields a usable local setup.
//!
//! ```toml
//! [database]
//! path = "sift.db"
//!
//! [search]
//! endpoint = "http://localhost:8080/search"
//! user_id = "9a895152-36f6-4c49-8f87-15742c14a3e7"
//! cache_dir = "cache"
//! requests_per_second = 2
//!
//! [retry]
//! tries = 5
//! delay_ms = 10
//! backoff = 2.0
//! jitter_ms = 10
//!
//! [logging]
//! file = "logs.txt"
//! ```

use crate::error::{Error, Result};
use crate::retry::RetryPolicy;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "sift.toml";

/// Where extracted records are stored
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Path of a local libsql database file
    pub path: PathBuf,

    /// URL of a remote libsql server; takes precedence over `path`
    pub url: Option<String>,

    /// Auth token for the remote server
    pub auth_token: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("sift.db"),
            url: None,
            auth_token: None,
        }
    }
}

/// How raw result pages are fetched
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Search server endpoint receiving `{"user_id", "query"}` POSTs
    pub endpoint: String,

    /// User the searches are issued for
    pub user_id: String,

    /// Directory holding cached responses, one JSON file per query
    pub cache_dir: PathBuf,

    /// Upper bound on requests sent to the search server
    pub requests_per_second: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:8080/search".to_string(),
            user_id: String::new(),
            cache_dir: PathBuf::from("cache"),
            requests_per_second: 2,
        }
    }
}

/// Log output settings
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Also write logs to this file
    pub file: Option<PathBuf>,
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub search: SearchConfig,
    pub retry: RetryPolicy,
    pub logging: LoggingConfig,
}

impl Config {
    /// Create a new builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Parse configuration from TOML text
    pub fn from_toml(text: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(text).map_err(|e| Error::Config(format!("Invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `path`, falling back to defaults when the file
    /// does not exist, then apply environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            debug!("Loading configuration from {}", path.display());
            let text = std::fs::read_to_string(path)?;
            Self::from_toml(&text)?
        } else {
            debug!("No configuration at {}, using defaults", path.display());
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Override settings from `SIFT_*` variables looked up through `lookup`
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("SIFT_DATABASE_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(url) = lookup("SIFT_DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Some(token) = lookup("SIFT_DATABASE_AUTH_TOKEN") {
            self.database.auth_token = Some(token);
        }
        if let Some(endpoint) = lookup("SIFT_SEARCH_ENDPOINT") {
            self.search.endpoint = endpoint;
        }
    }

    /// Check values that would otherwise fail much later
    pub fn validate(&self) -> Result<()> {
        Url::parse(&self.search.endpoint).map_err(|e| {
            Error::Config(format!(
                "Invalid search endpoint '{}': {}",
                self.search.endpoint, e
            ))
        })?;
        if self.search.requests_per_second == 0 {
            return Err(Error::Config(
                "search.requests_per_second must be positive".to_string(),
            ));
        }
        if self.retry.tries == 0 {
            return Err(Error::Config("retry.tries must be at least 1".to_string()));
        }
        if self.retry.backoff < 1.0 {
            return Err(Error::Config(
                "retry.backoff must be at least 1.0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    /// Set the local database path
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.database.path = path.into();
        self
    }

    /// Use a remote libsql server
    pub fn database_url(mut self, url: impl Into<String>, auth_token: Option<String>) -> Self {
        self.config.database.url = Some(url.into());
        self.config.database.auth_token = auth_token;
        self
    }

    /// Set the search endpoint
    pub fn search_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.config.search.endpoint = endpoint.into();
        self
    }

    /// Set the user searches are issued for
    pub fn user_id(mut self, user_id: impl Into<String>) -> Self {
        self.config.search.user_id = user_id.into();
        self
    }

    /// Set the response cache directory
    pub fn cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.config.search.cache_dir = cache_dir.into();
        self
    }

    /// Set the request rate limit
    pub fn requests_per_second(mut self, requests_per_second: u32) -> Self {
        self.config.search.requests_per_second = requests_per_second;
        self
    }

    /// Set the retry policy
    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.config.retry = retry;
        self
    }

    /// Also log to a file
    pub fn log_file(mut self, file: impl Into<PathBuf>) -> Self {
        self.config.logging.file = Some(file.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> Config {
        self.config
    }
}
