//! Usage snapshot data models

use serde::{Deserialize, Serialize};

use super::threshold::UsageMetric;

const BYTES_PER_GB: f64 = 1_073_741_824.0;

/// A point-in-time snapshot of project usage.
///
/// Produced by the billing/metrics collaborator once per evaluation cycle;
/// byte-valued fields stay in bytes until a threshold comparison needs them.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UsageMetrics {
    /// Billed cost for the current cycle, in currency units
    pub cost: f64,

    /// Database storage in bytes
    pub storage_bytes: u64,

    /// Egress bandwidth in bytes
    pub bandwidth_bytes: u64,

    /// Monthly active users
    pub monthly_active_users: u64,

    /// Concurrent database connections
    pub connections: u64,

    /// Edge function invocations this cycle
    pub function_invocations: u64,
}

impl UsageMetrics {
    /// Storage converted to gigabytes
    pub fn storage_gb(&self) -> f64 {
        self.storage_bytes as f64 / BYTES_PER_GB
    }

    /// Bandwidth converted to gigabytes
    pub fn bandwidth_gb(&self) -> f64 {
        self.bandwidth_bytes as f64 / BYTES_PER_GB
    }

    /// Resolve the scalar a threshold on `metric` compares against.
    ///
    /// Byte-valued metrics are converted to the display unit (GB); counts
    /// and cost are compared as-is.
    pub fn resolve(&self, metric: UsageMetric) -> f64 {
        match metric {
            UsageMetric::Cost => self.cost,
            UsageMetric::Storage => self.storage_gb(),
            UsageMetric::Bandwidth => self.bandwidth_gb(),
            UsageMetric::MonthlyActiveUsers => self.monthly_active_users as f64,
            UsageMetric::Connections => self.connections as f64,
            UsageMetric::FunctionInvocations => self.function_invocations as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn byte_metrics_convert_to_gb() {
        let metrics = UsageMetrics {
            storage_bytes: 7 * 1024 * 1024 * 1024,
            bandwidth_bytes: 1_073_741_824,
            ..Default::default()
        };

        assert!((metrics.resolve(UsageMetric::Storage) - 7.0).abs() < 1e-9);
        assert!((metrics.resolve(UsageMetric::Bandwidth) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn count_metrics_pass_through() {
        let metrics = UsageMetrics {
            cost: 35.5,
            monthly_active_users: 80_001,
            connections: 412,
            function_invocations: 1_000_000,
            ..Default::default()
        };

        assert_eq!(metrics.resolve(UsageMetric::Cost), 35.5);
        assert_eq!(metrics.resolve(UsageMetric::MonthlyActiveUsers), 80_001.0);
        assert_eq!(metrics.resolve(UsageMetric::Connections), 412.0);
        assert_eq!(metrics.resolve(UsageMetric::FunctionInvocations), 1_000_000.0);
    }
}
