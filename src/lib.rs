pub mod api;
pub mod card;
pub mod ci;
pub mod classify;
pub mod delivery;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod format;
pub mod logging;
pub mod signature;
pub mod utils;
pub mod webhook;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::dispatch::Dispatcher;
use crate::error::{NotifyError, Result};

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8000";
const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_MAX_COMMITS: usize = 3;
const DEFAULT_MESSAGE_LIMIT: usize = 50;

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct RelayConfig {
    pub feishu: FeishuConfig,
    pub github: GithubConfig,
    pub server: ServerConfig,
    pub format: FormatConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct FeishuConfig {
    pub webhook_url: String,
    pub secret: Option<String>,
    pub timeout_secs: u64,
}

impl Default for FeishuConfig {
    fn default() -> Self {
        Self {
            webhook_url: String::new(),
            secret: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl FeishuConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct GithubConfig {
    pub secret: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct FormatConfig {
    /// Commits listed on a push card before the "more commits" line.
    pub max_commits: usize,
    /// Characters of a commit summary shown before clipping.
    pub message_limit: usize,
}

impl Default for FormatConfig {
    fn default() -> Self {
        Self {
            max_commits: DEFAULT_MAX_COMMITS,
            message_limit: DEFAULT_MESSAGE_LIMIT,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            directory: None,
        }
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}

impl RelayConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    /// Reads the config file at `path`. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let config_str = std::fs::read_to_string(path).map_err(|e| {
            NotifyError::ConfigError(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&config_str).map_err(|e| {
            NotifyError::ConfigError(format!(
                "Failed to parse config file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Applies environment overrides. `lookup` is `std::env::var` in production.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup("FEISHU_WEBHOOK_URL") {
            self.feishu.webhook_url = url;
        }
        if let Some(secret) = lookup("FEISHU_SECRET") {
            self.feishu.secret = Some(secret);
        }
        if let Some(secret) = lookup("GITHUB_SECRET") {
            self.github.secret = Some(secret);
        }
        if let Some(addr) = lookup("BIND_ADDRESS") {
            self.server.bind_address = addr;
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(dir) = lookup("LOG_DIR") {
            self.logging.directory = Some(PathBuf::from(dir));
        }
    }

    /// Returns the Feishu signing secret if a non-empty one is set.
    pub fn feishu_secret(&self) -> Option<&str> {
        non_empty(&self.feishu.secret)
    }

    /// Returns the GitHub webhook secret if a non-empty one is set.
    pub fn github_secret(&self) -> Option<&str> {
        non_empty(&self.github.secret)
    }

    pub fn validate(&self) -> Result<()> {
        if self.feishu.webhook_url.trim().is_empty() {
            return Err(NotifyError::ConfigError(
                "FEISHU_WEBHOOK_URL is not set".to_string(),
            ));
        }
        if self.format.max_commits == 0 || self.format.message_limit == 0 {
            return Err(NotifyError::ConfigError(
                "format.max_commits and format.message_limit must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Logs the effective configuration without revealing secrets.
    pub fn log_summary(&self) {
        if self.feishu.webhook_url.is_empty() {
            warn!("Feishu webhook: not configured");
        } else {
            info!("Feishu webhook: {}", utils::clip(&self.feishu.webhook_url, 50));
        }
        match self.feishu_secret() {
            Some(_) => info!("Feishu signing: configured"),
            None => warn!("Feishu signing: not configured"),
        }
        match self.github_secret() {
            Some(_) => info!("GitHub signature verification: configured"),
            None => warn!("GitHub signature verification: not configured"),
        }
        info!("Listening address: {}", self.server.bind_address);
    }
}

pub struct AppState {
    pub dispatcher: Dispatcher,
    pub start_time: Instant,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self {
            dispatcher,
            start_time: Instant::now(),
            started_at: Utc::now(),
        }
    }
}

pub type SharedState = Arc<AppState>;
