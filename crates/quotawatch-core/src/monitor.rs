//! Periodic usage monitoring
//!
//! Ties the pieces together: poll a usage snapshot, evaluate thresholds,
//! fan alert events out to webhook channels, and email the events whose
//! rule asks for it. A failing usage source is logged and the loop
//! continues.

use parking_lot::Mutex;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, error, info};

use crate::alerting::store::{MemoryEventStore, MemoryLogStore};
use crate::alerting::{EmailNotifier, ThresholdEvaluator, ThresholdRegistry, WebhookDispatcher};
use crate::config::Config;
use crate::models::{AlertEvent, WebhookConfig, WebhookLog};
use crate::usage::UsageProvider;

/// Event type dispatched to channels when a threshold trips
pub const ALERT_EVENT: &str = "alert.triggered";

/// The periodic monitoring service
pub struct UsageMonitor {
    provider: Arc<dyn UsageProvider>,
    evaluator: ThresholdEvaluator,
    dispatcher: WebhookDispatcher,
    email: EmailNotifier,
    channels: Mutex<Vec<WebhookConfig>>,
    poll_interval_secs: u64,
}

impl UsageMonitor {
    /// Assemble a monitor from configuration and a usage provider
    pub fn from_config(config: &Config, provider: Arc<dyn UsageProvider>) -> Self {
        let registry = ThresholdRegistry::with_defaults();
        let evaluator = ThresholdEvaluator::new(
            registry,
            Arc::new(MemoryEventStore::with_cap(config.alerting.history_limit)),
        )
        .with_cooldown_secs(config.monitor.cooldown_seconds);

        let dispatcher = WebhookDispatcher::with_timeout(
            Arc::new(MemoryLogStore::with_cap(config.alerting.log_limit)),
            Duration::from_secs(config.http.timeout_seconds),
        );

        Self {
            provider,
            evaluator,
            dispatcher,
            email: EmailNotifier::new(config.email.clone()),
            channels: Mutex::new(config.channels.clone()),
            poll_interval_secs: config.monitor.poll_interval_seconds,
        }
    }

    /// Run the evaluation loop until the task is dropped or cancelled
    pub async fn start(&self) {
        info!(interval_secs = self.poll_interval_secs, "Starting usage monitor");

        let mut ticker = interval(Duration::from_secs(self.poll_interval_secs));

        loop {
            ticker.tick().await;
            self.tick().await;
        }
    }

    /// One polling cycle: fetch, evaluate, notify
    pub async fn tick(&self) {
        let metrics = match self.provider.fetch().await {
            Ok(metrics) => metrics,
            Err(e) => {
                error!(error = %e, "Failed to fetch usage snapshot");
                return;
            }
        };

        let events = self.evaluator.evaluate(&metrics);
        if events.is_empty() {
            debug!("Usage within thresholds");
            return;
        }

        info!(count = events.len(), "Usage evaluation produced alerts");
        self.notify(&events).await;
    }

    /// Stop in-flight retry sequences; the loop itself is cancelled by
    /// dropping or aborting the task running [`UsageMonitor::start`]
    pub fn shutdown(&self) {
        self.dispatcher.shutdown();
    }

    /// The evaluator, for acknowledgement and summary queries
    pub fn evaluator(&self) -> &ThresholdEvaluator {
        &self.evaluator
    }

    /// Delivery log, oldest first
    pub fn delivery_logs(&self) -> Vec<WebhookLog> {
        self.dispatcher.logs()
    }

    /// Current channel configurations
    pub fn channels(&self) -> Vec<WebhookConfig> {
        self.channels.lock().clone()
    }

    async fn notify(&self, events: &[AlertEvent]) {
        for event in events {
            let data = serde_json::to_value(event).unwrap_or(Value::Null);

            let mut channels = { self.channels.lock().clone() };
            self.dispatcher.trigger_channels(ALERT_EVENT, &data, &mut channels).await;
            *self.channels.lock() = channels;

            let wants_email = self
                .evaluator
                .registry()
                .get(&event.threshold_id)
                .map(|t| t.notify_email)
                .unwrap_or(false);
            if wants_email && self.email.is_configured() {
                self.email.send_alert(event).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::models::{UsageMetrics, WebhookProvider};
    use crate::usage::StaticUsageProvider;
    use async_trait::async_trait;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    struct FailingProvider;

    #[async_trait]
    impl UsageProvider for FailingProvider {
        async fn fetch(&self) -> Result<UsageMetrics> {
            Err(Error::http("usage endpoint returned 500"))
        }
    }

    fn config_with_channel(url: String) -> Config {
        Config {
            channels: vec![WebhookConfig {
                id: "ops".to_string(),
                name: "ops".to_string(),
                url,
                secret: None,
                events: vec!["*".to_string()],
                provider: WebhookProvider::Generic,
                is_active: true,
                retry_count: 0,
                retry_delay_secs: 0,
                last_triggered: None,
                last_status: None,
                headers: None,
            }],
            ..Config::default()
        }
    }

    #[tokio::test]
    async fn tick_dispatches_each_event_to_matching_channels() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .respond_with(ResponseTemplate::new(200))
            .expect(2)
            .mount(&server)
            .await;

        let provider = Arc::new(StaticUsageProvider::new(UsageMetrics {
            cost: 60.0, // trips cost-warning and cost-critical
            ..UsageMetrics::default()
        }));
        let monitor = UsageMonitor::from_config(
            &config_with_channel(format!("{}/hook", server.uri())),
            provider,
        );

        monitor.tick().await;

        assert_eq!(monitor.evaluator().history().len(), 2);
        assert_eq!(monitor.delivery_logs().len(), 2);
        let channels = monitor.channels();
        assert!(channels[0].last_triggered.is_some());
    }

    #[tokio::test]
    async fn provider_failure_is_tolerated() {
        let monitor = UsageMonitor::from_config(&Config::default(), Arc::new(FailingProvider));

        monitor.tick().await;

        assert!(monitor.evaluator().history().is_empty());
        assert!(monitor.delivery_logs().is_empty());
    }
}
