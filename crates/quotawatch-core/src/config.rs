//! Configuration management for quotawatch

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::WebhookConfig;

/// Main configuration struct
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Usage polling and evaluation configuration
    pub monitor: MonitorConfig,

    /// Outbound HTTP configuration
    pub http: HttpConfig,

    /// Alert history configuration
    pub alerting: AlertingConfig,

    /// Usage source configuration
    pub usage: UsageSourceConfig,

    /// Email channel configuration
    pub email: EmailConfig,

    /// Configured webhook channels
    pub channels: Vec<WebhookConfig>,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from an optional file plus `QUOTAWATCH_*`
    /// environment overrides.
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }

        builder
            .add_source(config::Environment::with_prefix("QUOTAWATCH").separator("__"))
            .build()
            .and_then(|settings| settings.try_deserialize())
            .map_err(|e| Error::config(e.to_string()))
    }
}

/// Usage polling and evaluation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds between usage snapshots
    pub poll_interval_seconds: u64,

    /// Cool-down window suppressing re-triggers, 0 disables
    pub cooldown_seconds: u64,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_seconds: 60,
            cooldown_seconds: 0,
        }
    }
}

/// Outbound HTTP configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-attempt request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: crate::alerting::DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Alert history configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AlertingConfig {
    /// Events kept in history
    pub history_limit: usize,

    /// Delivery records kept in the webhook log
    pub log_limit: usize,
}

impl Default for AlertingConfig {
    fn default() -> Self {
        Self {
            history_limit: crate::alerting::store::DEFAULT_EVENT_CAP,
            log_limit: crate::alerting::store::DEFAULT_LOG_CAP,
        }
    }
}

/// Where usage snapshots come from
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageSourceConfig {
    /// Management API endpoint returning a usage snapshot
    pub endpoint: Option<String>,

    /// Bearer token for the management API
    pub token: Option<String>,
}

/// Email channel configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmailConfig {
    /// HTTP email-provider endpoint
    pub endpoint: Option<String>,

    /// Provider API key
    pub api_key: Option<String>,

    /// Sender address
    pub from: String,

    /// Recipient addresses
    pub recipients: Vec<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            from: "alerts@quotawatch.dev".to_string(),
            recipients: Vec::new(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,

    /// Log format (json or pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
