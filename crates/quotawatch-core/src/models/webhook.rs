//! Webhook channel data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Event filter entry meaning "all events"
pub const EVENT_WILDCARD: &str = "*";

/// Payload shape expected by the receiving end of a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookProvider {
    /// Plain JSON envelope
    #[default]
    Generic,
    /// Chat-ops channel (Slack-compatible incoming webhook)
    Slack,
    /// Incident paging channel (PagerDuty events API)
    PagerDuty,
}

/// Outcome classification of the most recent delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    /// Last delivery got a 2xx response
    Success,
    /// Last delivery failed (non-2xx or transport error)
    Failed,
}

/// An outbound webhook channel definition
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Unique identifier
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Destination URL
    pub url: String,

    /// HMAC-SHA256 signing secret
    #[serde(default)]
    pub secret: Option<String>,

    /// Event types this channel receives; `"*"` subscribes to all
    pub events: Vec<String>,

    /// Payload shape for the receiving provider
    #[serde(default)]
    pub provider: WebhookProvider,

    /// Whether the channel participates in fan-out
    pub is_active: bool,

    /// Retries after the initial attempt
    #[serde(default)]
    pub retry_count: u32,

    /// Seconds to wait between attempts
    #[serde(default)]
    pub retry_delay_secs: u64,

    /// Last time this channel was dispatched to
    #[serde(default)]
    pub last_triggered: Option<DateTime<Utc>>,

    /// Outcome of the most recent delivery
    #[serde(default)]
    pub last_status: Option<DeliveryStatus>,

    /// Extra request headers
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,
}

impl WebhookConfig {
    /// Whether this channel should receive `event`
    pub fn matches(&self, event: &str) -> bool {
        self.is_active
            && self
                .events
                .iter()
                .any(|e| e == event || e == EVENT_WILDCARD)
    }
}

/// The outbound envelope delivered to a channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookPayload {
    /// Event type string (e.g. "alert.triggered")
    pub event: String,

    /// When the payload was built
    pub timestamp: DateTime<Utc>,

    /// Event-specific body
    pub data: serde_json::Value,

    /// Fixed source tag identifying this system
    pub source: String,
}

/// Outcome of one delivery attempt
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookResult {
    /// Whether the attempt got a 2xx response
    pub success: bool,

    /// HTTP status, absent on transport failure
    pub status_code: Option<u16>,

    /// Wall-clock time for the attempt in milliseconds
    pub response_time_ms: u64,

    /// Error description on failure
    pub error: Option<String>,
}

/// Append-only record pairing a payload with its delivery outcome
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookLog {
    /// Channel the attempt targeted
    pub channel_id: String,

    /// The payload that was sent
    pub payload: WebhookPayload,

    /// The attempt's outcome
    pub result: WebhookResult,

    /// When the record was written
    pub logged_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn channel(active: bool, events: &[&str]) -> WebhookConfig {
        WebhookConfig {
            id: "ch-1".to_string(),
            name: "ops".to_string(),
            url: "https://example.com/hook".to_string(),
            secret: None,
            events: events.iter().map(|s| s.to_string()).collect(),
            provider: WebhookProvider::Generic,
            is_active: active,
            retry_count: 0,
            retry_delay_secs: 0,
            last_triggered: None,
            last_status: None,
            headers: None,
        }
    }

    #[test]
    fn matches_literal_event() {
        let ch = channel(true, &["alert.triggered"]);
        assert!(ch.matches("alert.triggered"));
        assert!(!ch.matches("backup.completed"));
    }

    #[test]
    fn wildcard_matches_everything() {
        let ch = channel(true, &["*"]);
        assert!(ch.matches("alert.triggered"));
        assert!(ch.matches("security.event"));
    }

    #[test]
    fn inactive_channel_never_matches() {
        let ch = channel(false, &["*"]);
        assert!(!ch.matches("alert.triggered"));
    }
}
