use std::path::PathBuf;

use reqwest::Url;

use crate::client::store::SqliteStore;
use crate::shared::config::{AppConfig, AppConfigBuilder, ConfigError};
use crate::shared::error::{ChatError, Result};

/// Client configuration wrapper.
#[derive(Debug, Clone, Default)]
pub struct Config {
    app: AppConfig,
}

impl Config {
    /// Defaults overridden from `SHOOT_*` environment variables
    pub fn from_env() -> std::result::Result<Self, ConfigError> {
        Self::with_builder(AppConfigBuilder::default().with_env())
    }

    pub fn with_builder(builder: AppConfigBuilder) -> std::result::Result<Self, ConfigError> {
        Ok(Self { app: builder.build()? })
    }

    pub fn from_app(app: AppConfig) -> std::result::Result<Self, ConfigError> {
        app.validate()?;
        Ok(Self { app })
    }

    pub fn app(&self) -> &AppConfig {
        &self.app
    }

    pub fn server_url(&self) -> &str {
        &self.app.server_url
    }

    /// Get the full URL for an API endpoint
    pub fn api_url(&self, path: &str) -> String {
        format!("{}{}", self.server_url(), path)
    }

    /// WebSocket endpoint carrying `token`
    pub fn ws_endpoint(&self, token: &str) -> Result<String> {
        ws_endpoint(&self.app.ws_url, token)
    }

    /// Database file, defaulting to the platform data dir
    pub fn database_path(&self) -> PathBuf {
        self.app
            .database_path
            .clone()
            .unwrap_or_else(SqliteStore::default_path)
    }
}

/// `{ws_url}/ws?token={token}` with the token percent-encoded
pub fn ws_endpoint(ws_url: &str, token: &str) -> Result<String> {
    let base = format!("{}/ws", ws_url.trim_end_matches('/'));
    let url = Url::parse_with_params(&base, &[("token", token)])
        .map_err(|e| ChatError::ConnectionFailed(format!("invalid WebSocket URL {base}: {e}")))?;
    Ok(url.to_string())
}
