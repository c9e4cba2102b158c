//! GuardPost configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct GuardPostConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub platform: PlatformConfig,
    #[serde(default)]
    pub proxy: ProxyCheckConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub telegram: Option<TelegramConfig>,
}

impl GuardPostConfig {
    /// Load config from the default path (~/.guardpost/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            crate::error::GuardPostError::Config(format!("Failed to read config: {e}"))
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| {
            crate::error::GuardPostError::Config(format!("Failed to parse config: {e}"))
        })?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(|e| {
            crate::error::GuardPostError::Config(format!("Failed to serialize config: {e}"))
        })?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the GuardPost home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".guardpost")
    }
}

/// SQLite database location.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

fn default_db_path() -> String {
    GuardPostConfig::home_dir()
        .join("guardpost.db")
        .to_string_lossy()
        .into_owned()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: default_db_path() }
    }
}

/// External comment platform API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Elevated-privilege token used only for hide calls.
    #[serde(default)]
    pub page_token: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_api_base() -> String {
    "https://graph.facebook.com/v19.0".into()
}
fn default_request_timeout() -> u64 {
    30
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            page_token: String::new(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

/// Proxy health-check settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProxyCheckConfig {
    /// IP-echo endpoint the check goes through the proxy to reach.
    #[serde(default = "default_echo_url")]
    pub echo_url: String,
    #[serde(default = "default_check_timeout")]
    pub check_timeout_secs: u64,
    /// How many proxies are probed simultaneously.
    #[serde(default = "default_check_concurrency")]
    pub check_concurrency: usize,
}

fn default_echo_url() -> String {
    "https://api.ipify.org?format=json".into()
}
fn default_check_timeout() -> u64 {
    10
}
fn default_check_concurrency() -> usize {
    5
}

impl Default for ProxyCheckConfig {
    fn default() -> Self {
        Self {
            echo_url: default_echo_url(),
            check_timeout_secs: default_check_timeout(),
            check_concurrency: default_check_concurrency(),
        }
    }
}

/// Polling cadence and dispatcher width.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Interval between polls of a single task. Deliberately
    /// conservative: many accounts are multiplexed over distinct
    /// proxies and the platform exposes no push mechanism.
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
    /// Max jobs executing at once.
    #[serde(default = "default_job_concurrency")]
    pub job_concurrency: usize,
}

fn default_poll_interval() -> u64 {
    120_000
}
fn default_job_concurrency() -> usize {
    5
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval(),
            job_concurrency: default_job_concurrency(),
        }
    }
}

/// Telegram notification channel. Absent section disables notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}
