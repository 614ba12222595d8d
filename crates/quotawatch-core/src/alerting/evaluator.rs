//! Threshold evaluation engine
//!
//! Compares a usage snapshot against every enabled threshold, records the
//! resulting alert events in a bounded history, and tracks acknowledgement
//! state. A sustained breach produces a new event on every evaluation unless
//! a cool-down window is configured.

use chrono::{Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info};

use crate::models::{AlertEvent, AlertSummary, Severity, UsageMetrics};

use super::registry::ThresholdRegistry;
use super::store::EventStore;

/// Evaluates thresholds against usage snapshots
#[derive(Clone)]
pub struct ThresholdEvaluator {
    registry: ThresholdRegistry,
    events: Arc<dyn EventStore>,
    cooldown: Option<Duration>,
}

impl ThresholdEvaluator {
    /// Create an evaluator over a registry and an event history store
    pub fn new(registry: ThresholdRegistry, events: Arc<dyn EventStore>) -> Self {
        Self {
            registry,
            events,
            cooldown: None,
        }
    }

    /// Suppress re-triggering of a threshold within `secs` of its last
    /// trigger. Zero disables the window (the default).
    pub fn with_cooldown_secs(mut self, secs: u64) -> Self {
        self.cooldown = (secs > 0).then(|| Duration::seconds(secs as i64));
        self
    }

    /// Evaluate all enabled thresholds against `metrics`.
    ///
    /// Returns exactly the events created by this call; the full history is
    /// available via [`ThresholdEvaluator::history`].
    pub fn evaluate(&self, metrics: &UsageMetrics) -> Vec<AlertEvent> {
        let now = Utc::now();
        let mut triggered = Vec::new();

        for threshold in self.registry.list_enabled() {
            if let (Some(window), Some(last)) = (self.cooldown, threshold.last_triggered) {
                if now - last < window {
                    debug!(id = %threshold.id, "Threshold in cool-down, skipping");
                    continue;
                }
            }

            let value = metrics.resolve(threshold.metric);
            if !threshold.check(value) {
                continue;
            }

            let event = AlertEvent::for_breach(&threshold, value, now);
            info!(
                threshold_id = %threshold.id,
                event_id = %event.id,
                severity = ?event.severity,
                value,
                "Alert triggered"
            );

            self.registry.mark_triggered(&threshold.id, now);
            triggered.push(event);
        }

        self.events.prepend(&triggered);
        triggered
    }

    /// Full event history, most recent first
    pub fn history(&self) -> Vec<AlertEvent> {
        self.events.list()
    }

    /// Events not yet acknowledged
    pub fn unacknowledged(&self) -> Vec<AlertEvent> {
        self.events.list().into_iter().filter(|e| !e.acknowledged).collect()
    }

    /// Acknowledge one event. Idempotent; `false` only for unknown ids.
    pub fn acknowledge(&self, id: &str) -> bool {
        self.events.acknowledge(id)
    }

    /// Acknowledge every outstanding event; returns the number transitioned
    pub fn acknowledge_all(&self) -> usize {
        self.events.acknowledge_all()
    }

    /// Recompute summary counts over thresholds and history
    pub fn summary(&self) -> AlertSummary {
        let thresholds = self.registry.list();
        let events = self.events.list();

        AlertSummary {
            total_thresholds: thresholds.len(),
            enabled_thresholds: thresholds.iter().filter(|t| t.enabled).count(),
            total_alerts: events.len(),
            unacknowledged_alerts: events.iter().filter(|e| !e.acknowledged).count(),
            critical_alerts: events.iter().filter(|e| e.severity == Severity::Critical).count(),
            warning_alerts: events.iter().filter(|e| e.severity == Severity::Warning).count(),
            last_alert_time: events.first().map(|e| e.triggered_at),
        }
    }

    /// The registry this evaluator consults
    pub fn registry(&self) -> &ThresholdRegistry {
        &self.registry
    }
}
