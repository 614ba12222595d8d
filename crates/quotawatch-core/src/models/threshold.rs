//! Threshold rule data models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Usage dimension a threshold can watch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageMetric {
    /// Billed cost for the current cycle
    Cost,
    /// Database storage consumption
    Storage,
    /// Egress bandwidth consumption
    Bandwidth,
    /// Monthly active users
    MonthlyActiveUsers,
    /// Concurrent database connections
    Connections,
    /// Edge function invocations
    FunctionInvocations,
}

/// Comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    /// Greater than
    Gt,
    /// Greater than or equal to
    Gte,
    /// Less than
    Lt,
    /// Less than or equal to
    Lte,
    /// Equal to
    Eq,
}

/// Alert severity level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational
    #[default]
    Info,
    /// Warning
    Warning,
    /// Critical
    Critical,
}

impl Severity {
    /// Derive a severity from a rule name.
    ///
    /// Legacy definitions carried no severity field and encoded it in the
    /// name instead; this is the migration mapping for those records.
    pub fn from_rule_name(name: &str) -> Self {
        let name = name.to_lowercase();
        if name.contains("critical") {
            Severity::Critical
        } else if name.contains("warning") {
            Severity::Warning
        } else {
            Severity::Info
        }
    }
}

/// A named usage threshold rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Threshold {
    /// Unique identifier
    pub id: String,

    /// Human-readable name
    pub name: String,

    /// Metric to watch
    pub metric: UsageMetric,

    /// Comparison operator
    pub operator: Operator,

    /// Numeric bound, in the display unit
    pub value: f64,

    /// Display unit (e.g. "GB", "$")
    pub unit: String,

    /// Severity assigned to events this rule produces
    pub severity: Severity,

    /// Whether the rule participates in evaluation
    pub enabled: bool,

    /// Send an email when this rule triggers
    pub notify_email: bool,

    /// Surface the event on the dashboard
    pub notify_dashboard: bool,

    /// When the rule was created
    pub created_at: DateTime<Utc>,

    /// Last time this rule triggered
    pub last_triggered: Option<DateTime<Utc>>,
}

impl Threshold {
    /// Check if a resolved metric value trips this rule
    pub fn check(&self, value: f64) -> bool {
        match self.operator {
            Operator::Gt => value > self.value,
            Operator::Gte => value >= self.value,
            Operator::Lt => value < self.value,
            Operator::Lte => value <= self.value,
            Operator::Eq => (value - self.value).abs() < f64::EPSILON,
        }
    }
}

/// Input for creating a new threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThresholdInput {
    pub name: String,
    pub metric: UsageMetric,
    pub operator: Operator,
    pub value: f64,
    pub unit: String,
    /// Falls back to [`Severity::from_rule_name`] when omitted
    pub severity: Option<Severity>,
    pub enabled: Option<bool>,
    pub notify_email: Option<bool>,
    pub notify_dashboard: Option<bool>,
}

/// Partial update for an existing threshold
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThresholdPatch {
    pub name: Option<String>,
    pub metric: Option<UsageMetric>,
    pub operator: Option<Operator>,
    pub value: Option<f64>,
    pub unit: Option<String>,
    pub severity: Option<Severity>,
    pub enabled: Option<bool>,
    pub notify_email: Option<bool>,
    pub notify_dashboard: Option<bool>,
}
