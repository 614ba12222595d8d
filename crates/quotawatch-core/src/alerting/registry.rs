//! Threshold registry
//!
//! Holds the named threshold rules, seeds the built-in defaults, and
//! supports create/update/delete/reset. Rules live in an injected
//! [`ThresholdStore`]; nothing here is persisted across restarts unless the
//! store is.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{Operator, Severity, Threshold, ThresholdInput, ThresholdPatch, UsageMetric};

use super::store::{MemoryThresholdStore, ThresholdStore};

/// Registry of usage threshold rules
#[derive(Clone)]
pub struct ThresholdRegistry {
    store: Arc<dyn ThresholdStore>,
}

impl ThresholdRegistry {
    /// Create a registry over an injected store, without seeding
    pub fn new(store: Arc<dyn ThresholdStore>) -> Self {
        Self { store }
    }

    /// Create a registry over an in-memory store seeded with the defaults
    pub fn with_defaults() -> Self {
        let registry = Self::new(Arc::new(MemoryThresholdStore::new()));
        registry.store.replace_all(default_thresholds());
        registry
    }

    /// List all thresholds in insertion order
    pub fn list(&self) -> Vec<Threshold> {
        self.store.list()
    }

    /// List only enabled thresholds
    pub fn list_enabled(&self) -> Vec<Threshold> {
        self.store.list().into_iter().filter(|t| t.enabled).collect()
    }

    /// Get a threshold by id
    pub fn get(&self, id: &str) -> Option<Threshold> {
        self.store.get(id)
    }

    /// Create a new threshold from `input`, assigning a time-based id
    pub fn create(&self, input: ThresholdInput) -> Result<Threshold> {
        if !input.value.is_finite() {
            return Err(Error::validation("threshold value must be a finite number"));
        }

        let severity = input
            .severity
            .unwrap_or_else(|| Severity::from_rule_name(&input.name));

        let threshold = Threshold {
            id: Uuid::now_v7().to_string(),
            name: input.name,
            metric: input.metric,
            operator: input.operator,
            value: input.value,
            unit: input.unit,
            severity,
            enabled: input.enabled.unwrap_or(true),
            notify_email: input.notify_email.unwrap_or(false),
            notify_dashboard: input.notify_dashboard.unwrap_or(true),
            created_at: Utc::now(),
            last_triggered: None,
        };

        info!(id = %threshold.id, name = %threshold.name, "Threshold created");
        self.store.insert(threshold.clone());

        Ok(threshold)
    }

    /// Merge `patch` into the threshold with `id`.
    ///
    /// Returns `Ok(None)` when no such threshold exists.
    pub fn update(&self, id: &str, patch: ThresholdPatch) -> Result<Option<Threshold>> {
        if let Some(value) = patch.value {
            if !value.is_finite() {
                return Err(Error::validation("threshold value must be a finite number"));
            }
        }

        let Some(mut threshold) = self.store.get(id) else {
            return Ok(None);
        };

        if let Some(name) = patch.name {
            threshold.name = name;
        }
        if let Some(metric) = patch.metric {
            threshold.metric = metric;
        }
        if let Some(operator) = patch.operator {
            threshold.operator = operator;
        }
        if let Some(value) = patch.value {
            threshold.value = value;
        }
        if let Some(unit) = patch.unit {
            threshold.unit = unit;
        }
        if let Some(severity) = patch.severity {
            threshold.severity = severity;
        }
        if let Some(enabled) = patch.enabled {
            threshold.enabled = enabled;
        }
        if let Some(notify_email) = patch.notify_email {
            threshold.notify_email = notify_email;
        }
        if let Some(notify_dashboard) = patch.notify_dashboard {
            threshold.notify_dashboard = notify_dashboard;
        }

        self.store.replace(threshold.clone());
        debug!(id = %id, "Threshold updated");

        Ok(Some(threshold))
    }

    /// Delete a threshold; `false` when no record matched
    pub fn delete(&self, id: &str) -> bool {
        let removed = self.store.remove(id);
        if removed {
            info!(id = %id, "Threshold deleted");
        }
        removed
    }

    /// Replace the entire set with the built-in seed list
    pub fn reset_to_defaults(&self) {
        self.store.replace_all(default_thresholds());
        info!("Thresholds reset to defaults");
    }

    /// Record a trigger time on a threshold
    pub(crate) fn mark_triggered(&self, id: &str, at: DateTime<Utc>) {
        if let Some(mut threshold) = self.store.get(id) {
            threshold.last_triggered = Some(at);
            self.store.replace(threshold);
        }
    }
}

/// The built-in seed set.
///
/// Quota-percentage bounds assume the hosted plan's 8 GB storage, 250 GB
/// bandwidth, 100k MAU, and 500 connection allowances.
pub fn default_thresholds() -> Vec<Threshold> {
    let created_at = Utc::now();

    let seed = |id: &str, name: &str, metric, operator, value: f64, unit: &str| Threshold {
        id: id.to_string(),
        name: name.to_string(),
        metric,
        operator,
        value,
        unit: unit.to_string(),
        severity: Severity::from_rule_name(name),
        enabled: true,
        notify_email: true,
        notify_dashboard: true,
        created_at,
        last_triggered: None,
    };

    vec![
        seed("cost-warning", "Cost warning", UsageMetric::Cost, Operator::Gt, 30.0, "$"),
        seed("cost-critical", "Cost critical", UsageMetric::Cost, Operator::Gt, 50.0, "$"),
        seed("storage-80", "Storage warning (80%)", UsageMetric::Storage, Operator::Gt, 6.4, "GB"),
        seed("storage-95", "Storage critical (95%)", UsageMetric::Storage, Operator::Gt, 7.6, "GB"),
        seed(
            "bandwidth-warning",
            "Bandwidth warning (80%)",
            UsageMetric::Bandwidth,
            Operator::Gt,
            200.0,
            "GB",
        ),
        seed(
            "mau-warning",
            "Monthly active users warning (80%)",
            UsageMetric::MonthlyActiveUsers,
            Operator::Gt,
            80_000.0,
            "users",
        ),
        seed(
            "connections-warning",
            "Database connections warning (80%)",
            UsageMetric::Connections,
            Operator::Gt,
            400.0,
            "connections",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn input(name: &str, value: f64) -> ThresholdInput {
        ThresholdInput {
            name: name.to_string(),
            metric: UsageMetric::Cost,
            operator: Operator::Gt,
            value,
            unit: "$".to_string(),
            severity: None,
            enabled: None,
            notify_email: None,
            notify_dashboard: None,
        }
    }

    #[test]
    fn seeds_exactly_seven_defaults() {
        let registry = ThresholdRegistry::with_defaults();
        let ids: Vec<_> = registry.list().into_iter().map(|t| t.id).collect();

        assert_eq!(
            ids,
            vec![
                "cost-warning",
                "cost-critical",
                "storage-80",
                "storage-95",
                "bandwidth-warning",
                "mau-warning",
                "connections-warning",
            ]
        );
        assert!(registry.list().iter().all(|t| t.enabled));
    }

    #[test]
    fn seed_severities_follow_names() {
        let registry = ThresholdRegistry::with_defaults();

        assert_eq!(registry.get("cost-critical").unwrap().severity, Severity::Critical);
        assert_eq!(registry.get("storage-95").unwrap().severity, Severity::Critical);
        assert_eq!(registry.get("cost-warning").unwrap().severity, Severity::Warning);
    }

    #[test]
    fn create_round_trips_through_get() {
        let registry = ThresholdRegistry::with_defaults();
        let created = registry.create(input("Function invocations warning", 1_500_000.0)).unwrap();

        let fetched = registry.get(&created.id).unwrap();
        assert_eq!(fetched.name, "Function invocations warning");
        assert_eq!(fetched.value, 1_500_000.0);
        assert_eq!(fetched.severity, Severity::Warning);
        assert!(fetched.enabled);
    }

    #[test]
    fn create_rejects_non_finite_value() {
        let registry = ThresholdRegistry::with_defaults();
        assert!(registry.create(input("bad", f64::NAN)).is_err());
        assert!(registry.create(input("bad", f64::INFINITY)).is_err());
    }

    #[test]
    fn update_merges_partial_fields() {
        let registry = ThresholdRegistry::with_defaults();

        let updated = registry
            .update(
                "cost-warning",
                ThresholdPatch {
                    value: Some(40.0),
                    enabled: Some(false),
                    ..Default::default()
                },
            )
            .unwrap()
            .unwrap();

        assert_eq!(updated.value, 40.0);
        assert!(!updated.enabled);
        // untouched fields survive the merge
        assert_eq!(updated.name, "Cost warning");
        assert_eq!(updated.unit, "$");
    }

    #[test]
    fn update_unknown_id_returns_none() {
        let registry = ThresholdRegistry::with_defaults();
        let result = registry.update("missing", ThresholdPatch::default()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn delete_and_reset() {
        let registry = ThresholdRegistry::with_defaults();

        assert!(registry.delete("cost-warning"));
        assert!(!registry.delete("cost-warning"));
        assert_eq!(registry.list().len(), 6);

        registry.reset_to_defaults();
        assert_eq!(registry.list().len(), 7);
        assert!(registry.get("cost-warning").is_some());
    }
}
