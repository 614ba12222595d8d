//! Provider-specific payload shapes
//!
//! Formatters are pure `(event, data) -> body` transforms selected by a
//! channel's provider. Retry and logging never look inside them, so new
//! providers only need a new implementation here.

use serde_json::{json, Value};

use crate::models::WebhookProvider;

/// Strategy for shaping an outbound body for one provider
pub trait PayloadFormatter: Send + Sync {
    /// Produce the provider-specific JSON body for `event`
    fn format(&self, event: &str, data: &Value) -> Value;
}

/// Chat-ops channels (Slack-compatible incoming webhooks)
pub struct ChatFormatter;

/// Incident-paging channels (PagerDuty events API shape)
pub struct PagerFormatter;

/// Formatter for a provider; `None` means the plain envelope is sent
pub fn formatter_for(provider: WebhookProvider) -> Option<&'static dyn PayloadFormatter> {
    match provider {
        WebhookProvider::Generic => None,
        WebhookProvider::Slack => Some(&ChatFormatter),
        WebhookProvider::PagerDuty => Some(&PagerFormatter),
    }
}

fn severity_of(data: &Value) -> &str {
    data.get("severity").and_then(Value::as_str).unwrap_or("info")
}

fn text_of<'a>(event: &'a str, data: &'a Value) -> &'a str {
    data.get("message").and_then(Value::as_str).unwrap_or(event)
}

impl PayloadFormatter for ChatFormatter {
    fn format(&self, event: &str, data: &Value) -> Value {
        let severity = severity_of(data);
        let (color, emoji) = match severity {
            "critical" => ("#dc3545", "\u{1f6a8}"),
            "warning" => ("#ffc107", "\u{26a0}\u{fe0f}"),
            _ => ("#17a2b8", "\u{2139}\u{fe0f}"),
        };

        let mut fields = vec![json!({
            "title": "Severity",
            "value": severity,
            "short": true,
        })];
        if let Some(value) = data.get("current_value") {
            fields.push(json!({"title": "Current value", "value": value.to_string(), "short": true}));
        }
        if let Some(value) = data.get("threshold_value") {
            fields.push(json!({"title": "Threshold", "value": value.to_string(), "short": true}));
        }

        json!({
            "username": "quotawatch",
            "icon_emoji": ":bell:",
            "attachments": [{
                "color": color,
                "title": format!("{emoji} {event}"),
                "text": text_of(event, data),
                "fields": fields,
                "footer": "quotawatch alerting",
            }],
        })
    }
}

impl PayloadFormatter for PagerFormatter {
    fn format(&self, event: &str, data: &Value) -> Value {
        let severity = severity_of(data);

        let mut body = json!({
            "event_action": "trigger",
            "payload": {
                "summary": format!("[{}] {}", severity.to_uppercase(), text_of(event, data)),
                "source": "quotawatch",
                "severity": severity,
                "custom_details": data,
            },
        });

        if let Some(id) = data.get("id").and_then(Value::as_str) {
            body["dedup_key"] = json!(id);
        }

        body
    }
}
