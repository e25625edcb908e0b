//! Application configuration module
//!
//! [`AppConfig`] is assembled with [`AppConfigBuilder`], optionally seeded
//! from a TOML file and then from `SHOOT_*` environment variables, and is
//! validated once before use.
//!
//! ```toml
//! server_url = "https://chat.example.com/api"
//! ws_url = "wss://chat.example.com"
//! request_timeout_ms = 10000
//! auto_reconnect = true
//! sync_interval_secs = 300
//!
//! [retry]
//! max_attempts = 3
//!
//! [reconnect]
//! max_attempts = 5
//! backoff = { strategy = "exponential", base_ms = 1000, max_ms = 30000 }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::client::offline::retry::{BackoffStrategy, RetryPolicy};

pub const DEFAULT_SERVER_URL: &str = "http://localhost:8100/api/v1";
pub const DEFAULT_WS_URL: &str = "ws://localhost:8100";
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_HISTORY_PAGE_SIZE: u32 = 50;
pub const DEFAULT_SEARCH_PAGE_SIZE: u32 = 50;

/// Application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// REST base URL
    pub server_url: String,
    /// WebSocket base URL (`ws://` or `wss://`)
    pub ws_url: String,
    pub request_timeout: Duration,
    pub connect_timeout: Duration,
    pub history_page_size: u32,
    pub search_page_size: u32,
    /// Policy for queued messages and sync operations
    pub retry: RetryPolicy,
    /// Policy for the realtime reconnect supervisor
    pub reconnect: RetryPolicy,
    pub auto_reconnect: bool,
    /// Interval of the background sync loop, `None` disables it
    pub sync_interval: Option<Duration>,
    /// SQLite database file, `None` selects the platform data dir
    pub database_path: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server_url: DEFAULT_SERVER_URL.to_string(),
            ws_url: DEFAULT_WS_URL.to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            history_page_size: DEFAULT_HISTORY_PAGE_SIZE,
            search_page_size: DEFAULT_SEARCH_PAGE_SIZE,
            retry: RetryPolicy::default(),
            reconnect: RetryPolicy::new(
                5,
                BackoffStrategy::Exponential {
                    base_ms: 1_000,
                    max_ms: 30_000,
                },
            ),
            auto_reconnect: true,
            sync_interval: None,
            database_path: None,
        }
    }
}

impl AppConfig {
    /// Create a new AppConfigBuilder
    pub fn builder() -> AppConfigBuilder {
        AppConfigBuilder::default()
    }

    /// Load a TOML file, then apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
        let mut builder = match path {
            Some(path) => AppConfigBuilder::from_toml_file(path)?,
            None => AppConfigBuilder::default(),
        };
        builder = builder.with_env();
        builder.build()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.server_url.starts_with("http://") || self.server_url.starts_with("https://")) {
            return Err(ConfigError::InvalidUrl(self.server_url.clone()));
        }
        if !(self.ws_url.starts_with("ws://") || self.ws_url.starts_with("wss://")) {
            return Err(ConfigError::InvalidUrl(self.ws_url.clone()));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::InvalidValue("request_timeout"));
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::InvalidValue("connect_timeout"));
        }
        if self.history_page_size == 0 {
            return Err(ConfigError::InvalidValue("history_page_size"));
        }
        if self.search_page_size == 0 {
            return Err(ConfigError::InvalidValue("search_page_size"));
        }
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::InvalidValue("retry.max_attempts"));
        }
        if matches!(self.sync_interval, Some(interval) if interval.is_zero()) {
            return Err(ConfigError::InvalidValue("sync_interval"));
        }
        Ok(())
    }
}

/// On-disk shape of the configuration file
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    server_url: Option<String>,
    ws_url: Option<String>,
    request_timeout_ms: Option<u64>,
    connect_timeout_ms: Option<u64>,
    history_page_size: Option<u32>,
    search_page_size: Option<u32>,
    retry: Option<RetryPolicy>,
    reconnect: Option<RetryPolicy>,
    auto_reconnect: Option<bool>,
    sync_interval_secs: Option<u64>,
    database_path: Option<PathBuf>,
}

/// Builder for AppConfig
#[derive(Debug, Default)]
pub struct AppConfigBuilder {
    config: AppConfig,
}

impl AppConfigBuilder {
    /// Seed the builder from a TOML file
    pub fn from_toml_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    /// Seed the builder from TOML text
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        let file: FileConfig = toml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let mut builder = Self::default();
        if let Some(url) = file.server_url {
            builder = builder.server_url(url);
        }
        if let Some(url) = file.ws_url {
            builder = builder.ws_url(url);
        }
        if let Some(ms) = file.request_timeout_ms {
            builder = builder.request_timeout(Duration::from_millis(ms));
        }
        if let Some(ms) = file.connect_timeout_ms {
            builder = builder.connect_timeout(Duration::from_millis(ms));
        }
        if let Some(size) = file.history_page_size {
            builder = builder.history_page_size(size);
        }
        if let Some(size) = file.search_page_size {
            builder = builder.search_page_size(size);
        }
        if let Some(policy) = file.retry {
            builder = builder.retry_policy(policy);
        }
        if let Some(policy) = file.reconnect {
            builder = builder.reconnect_policy(policy);
        }
        if let Some(flag) = file.auto_reconnect {
            builder = builder.auto_reconnect(flag);
        }
        if let Some(secs) = file.sync_interval_secs {
            builder = builder.sync_interval(Some(Duration::from_secs(secs)));
        }
        if let Some(path) = file.database_path {
            builder = builder.database_path(path);
        }
        Ok(builder)
    }

    /// Apply `SHOOT_API_URL`, `SHOOT_WS_URL` and `SHOOT_DB_PATH`
    pub fn with_env(mut self) -> Self {
        if let Ok(url) = std::env::var("SHOOT_API_URL") {
            self = self.server_url(url);
        }
        if let Ok(url) = std::env::var("SHOOT_WS_URL") {
            self = self.ws_url(url);
        }
        if let Ok(path) = std::env::var("SHOOT_DB_PATH") {
            self = self.database_path(PathBuf::from(path));
        }
        self
    }

    /// Set the server URL
    pub fn server_url(mut self, url: impl Into<String>) -> Self {
        self.config.server_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Set the WebSocket URL
    pub fn ws_url(mut self, url: impl Into<String>) -> Self {
        self.config.ws_url = url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.config.request_timeout = timeout;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_timeout = timeout;
        self
    }

    pub fn history_page_size(mut self, size: u32) -> Self {
        self.config.history_page_size = size;
        self
    }

    pub fn search_page_size(mut self, size: u32) -> Self {
        self.config.search_page_size = size;
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = policy;
        self
    }

    pub fn reconnect_policy(mut self, policy: RetryPolicy) -> Self {
        self.config.reconnect = policy;
        self
    }

    pub fn auto_reconnect(mut self, enabled: bool) -> Self {
        self.config.auto_reconnect = enabled;
        self
    }

    pub fn sync_interval(mut self, interval: Option<Duration>) -> Self {
        self.config.sync_interval = interval;
        self
    }

    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.database_path = Some(path.into());
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AppConfig, ConfigError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

/// Configuration errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("invalid value for {0}")]
    InvalidValue(&'static str),
    #[error("failed to read config: {0}")]
    Io(String),
    #[error("failed to parse config: {0}")]
    Parse(String),
}
