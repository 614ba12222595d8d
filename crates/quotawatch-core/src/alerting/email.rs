//! Outgoing email delivery for alerts
//!
//! Posts a JSON message to an HTTP email-provider endpoint. A missing
//! endpoint or API key surfaces as a failed result with a descriptive
//! message, never as a process error; calling code decides whether to warn.

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::EmailConfig;
use crate::models::AlertEvent;

/// Outcome of one email delivery
#[derive(Debug, Clone)]
pub struct EmailResult {
    /// Whether the provider accepted the message
    pub success: bool,
    /// Error description on failure
    pub error: Option<String>,
    /// When the attempt finished
    pub sent_at: DateTime<Utc>,
}

impl EmailResult {
    fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            sent_at: Utc::now(),
        }
    }
}

#[derive(Serialize)]
struct EmailMessage<'a> {
    from: &'a str,
    to: &'a [String],
    subject: String,
    text: String,
}

/// Sends alert emails through an HTTP email provider
pub struct EmailNotifier {
    client: Client,
    config: EmailConfig,
}

impl EmailNotifier {
    /// Create a notifier from the email channel configuration
    pub fn new(config: EmailConfig) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    /// Whether the channel has enough configuration to deliver
    pub fn is_configured(&self) -> bool {
        self.config.endpoint.is_some() && self.config.api_key.is_some() && !self.config.recipients.is_empty()
    }

    /// Deliver an alert event to the configured recipients
    pub async fn send_alert(&self, event: &AlertEvent) -> EmailResult {
        let (Some(endpoint), Some(api_key)) = (&self.config.endpoint, &self.config.api_key) else {
            warn!("Email channel not configured, skipping notification");
            return EmailResult::failure("email channel not configured");
        };
        if self.config.recipients.is_empty() {
            return EmailResult::failure("email channel has no recipients");
        }

        let message = EmailMessage {
            from: &self.config.from,
            to: &self.config.recipients,
            subject: format!("[{:?}] {}", event.severity, event.threshold_name),
            text: event.message.clone(),
        };

        let response = self
            .client
            .post(endpoint)
            .bearer_auth(api_key)
            .json(&message)
            .send()
            .await;

        match response {
            Ok(response) if response.status().is_success() => {
                info!(event_id = %event.id, recipients = self.config.recipients.len(), "Alert email sent");
                EmailResult {
                    success: true,
                    error: None,
                    sent_at: Utc::now(),
                }
            }
            Ok(response) => {
                let status = response.status();
                warn!(event_id = %event.id, %status, "Email provider rejected message");
                EmailResult::failure(format!("email provider returned {status}"))
            }
            Err(e) => {
                warn!(event_id = %event.id, error = %e, "Email delivery failed");
                EmailResult::failure(e.to_string())
            }
        }
    }
}
