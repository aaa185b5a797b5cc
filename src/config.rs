//! Configuration management for mailwatch.
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. Environment variables
//! 2. Configuration file (JSON)
//! 3. Default values

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::api::ApiConfig;
use crate::notify::NotifyConfig;

/// Application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Upstream API configuration.
    pub api: ApiSection,
    /// Notification channel configuration.
    pub notify: NotifySection,
    /// Session storage configuration.
    pub storage: StorageSection,
    /// Logging configuration.
    pub logging: LoggingSection,
}

/// Upstream API configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    /// Base URL of the upstream API.
    pub base_url: String,
    /// Bearer credential. Server-side only; never ships to a browser.
    pub bearer_token: String,
    /// Per-request timeout in seconds. Zero means the client default.
    pub timeout_secs: u64,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            bearer_token: String::new(),
            timeout_secs: 30,
        }
    }
}

/// Notification channel configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifySection {
    /// WebSocket endpoint; empty disables the feature.
    pub endpoint: String,
    /// Reconnection attempt budget.
    pub max_reconnect_attempts: u32,
    /// Initial reconnection delay in milliseconds.
    pub base_delay_ms: u64,
    /// Reconnection delay cap in milliseconds.
    pub max_delay_ms: u64,
    /// Debounce window for the secondary OS notification, milliseconds.
    pub debounce_ms: u64,
    /// Whether to show OS notifications.
    pub show_notifications: bool,
}

impl Default for NotifySection {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            max_reconnect_attempts: 5,
            base_delay_ms: 1_000,
            max_delay_ms: 30_000,
            debounce_ms: 2_000,
            show_notifications: true,
        }
    }
}

/// Session storage configuration section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Explicit session file path. `None` means the platform default.
    pub session_file: Option<PathBuf>,
}

/// Logging configuration section.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level (error, warn, info, debug, trace).
    pub level: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        serde_json::from_str(&content).map_err(ConfigError::Json)
    }

    /// Apply environment variable overrides.
    pub fn apply_env(&mut self) {
        if let Ok(url) = std::env::var("MAILWATCH_API_URL") {
            self.api.base_url = url;
        }
        if let Ok(token) = std::env::var("MAILWATCH_API_TOKEN") {
            self.api.bearer_token = token;
        }
        if let Ok(endpoint) = std::env::var("MAILWATCH_WS_URL") {
            self.notify.endpoint = endpoint;
        }
        if let Ok(path) = std::env::var("MAILWATCH_SESSION_FILE") {
            if !path.is_empty() {
                self.storage.session_file = Some(PathBuf::from(path));
            }
        }
        if let Ok(level) = std::env::var("MAILWATCH_LOG_LEVEL") {
            self.logging.level = level;
        } else if let Ok(level) = std::env::var("RUST_LOG") {
            self.logging.level = level;
        }
    }

    /// Load configuration with full priority chain.
    ///
    /// Priority: env vars > config file > defaults
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Config::from_file(path)?,
            None => Config::default(),
        };
        config.apply_env();
        Ok(config)
    }

    /// Convert to the notification client's configuration.
    pub fn to_notify_config(&self) -> NotifyConfig {
        NotifyConfig {
            endpoint: self.notify.endpoint.clone(),
            max_reconnect_attempts: self.notify.max_reconnect_attempts,
            base_delay: Duration::from_millis(self.notify.base_delay_ms),
            max_delay: Duration::from_millis(self.notify.max_delay_ms),
            debounce: Duration::from_millis(self.notify.debounce_ms),
            show_notifications: self.notify.show_notifications,
        }
    }

    /// Convert to the API client's configuration.
    pub fn to_api_config(&self) -> ApiConfig {
        ApiConfig {
            base_url: self.api.base_url.clone(),
            bearer_token: self.api.bearer_token.clone(),
            timeout: Duration::from_secs(self.api.timeout_secs),
        }
    }

    /// Get the log level filter string.
    pub fn log_filter(&self) -> &str {
        &self.logging.level
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading config file.
    Io(std::io::Error),
    /// JSON parsing error.
    Json(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "failed to read config file: {}", e),
            Self::Json(e) => write!(f, "failed to parse config file: {}", e),
        }
    }
}

impl std::error::Error for ConfigError {}
