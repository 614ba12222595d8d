//! Alert event data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::threshold::{Severity, Threshold, UsageMetric};

/// A record of one threshold breach at one point in time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertEvent {
    /// Unique identifier, derived from the trigger time and rule id
    pub id: String,

    /// The rule that triggered this alert
    pub threshold_id: String,

    /// Rule name at trigger time
    pub threshold_name: String,

    /// Metric that breached
    pub metric: UsageMetric,

    /// Resolved metric value at trigger time
    pub current_value: f64,

    /// The bound that was breached
    pub threshold_value: f64,

    /// Human-readable message
    pub message: String,

    /// Severity level
    pub severity: Severity,

    /// When the alert was triggered
    pub triggered_at: DateTime<Utc>,

    /// Whether an operator has acknowledged this event.
    /// Transitions false to true only, never back.
    pub acknowledged: bool,
}

impl AlertEvent {
    /// Build the event for a rule breached by `current_value` at `now`
    pub fn for_breach(threshold: &Threshold, current_value: f64, now: DateTime<Utc>) -> Self {
        let message = format!(
            "{}: {:.2} {} exceeds threshold of {} {}",
            threshold.name, current_value, threshold.unit, threshold.value, threshold.unit
        );

        Self {
            id: format!("{}-{}", now.timestamp_millis(), threshold.id),
            threshold_id: threshold.id.clone(),
            threshold_name: threshold.name.clone(),
            metric: threshold.metric,
            current_value,
            threshold_value: threshold.value,
            message,
            severity: threshold.severity,
            triggered_at: now,
            acknowledged: false,
        }
    }
}

/// Counts over the current thresholds and event history.
///
/// Recomputed on each call; nothing here is cached.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertSummary {
    /// Total configured thresholds
    pub total_thresholds: usize,

    /// Thresholds currently enabled
    pub enabled_thresholds: usize,

    /// Events in the history
    pub total_alerts: usize,

    /// Events not yet acknowledged
    pub unacknowledged_alerts: usize,

    /// Critical events in the history
    pub critical_alerts: usize,

    /// Warning events in the history
    pub warning_alerts: usize,

    /// Most recent trigger time, if any
    pub last_alert_time: Option<DateTime<Utc>>,
}
