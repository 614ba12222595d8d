//! # Quotawatch
//!
//! Usage threshold alerting for hosted database projects.
//!
//! Quotawatch polls usage/billing telemetry, evaluates it against named
//! thresholds, and fans alert events out to webhook and email channels
//! with bounded retries and delivery logging.
//!
//! ## Architecture
//!
//! - **Registry**: named threshold rules with built-in quota defaults
//! - **Evaluator**: snapshot evaluation, bounded alert history,
//!   acknowledgement state
//! - **Dispatcher**: signed webhook delivery with retry and fan-out
//! - **Monitor**: the periodic loop tying the pieces together
//!
//! ## Quick Start
//!
//! ```bash
//! # Watch a project's usage endpoint
//! quotawatch watch --endpoint https://api.example.com/v1/usage
//!
//! # One-shot evaluation of explicit numbers
//! quotawatch evaluate --cost 35
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]

pub mod alerting;
pub mod config;
pub mod error;
pub mod models;
pub mod monitor;
pub mod usage;

pub use config::Config;
pub use error::{Error, Result};

/// Re-exports for convenience
pub mod prelude {
    pub use crate::alerting::{
        EmailNotifier, ThresholdEvaluator, ThresholdRegistry, WebhookDispatcher,
    };
    pub use crate::config::Config;
    pub use crate::error::{Error, Result};
    pub use crate::models::*;
    pub use crate::monitor::UsageMonitor;
    pub use crate::usage::{HttpUsageProvider, StaticUsageProvider, UsageProvider};
}
