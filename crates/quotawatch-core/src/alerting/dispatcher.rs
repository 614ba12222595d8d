//! Webhook notification dispatch
//!
//! Delivers formatted payloads to configured channels with bounded retries,
//! HMAC signing, and per-attempt logging. Failures are returned as data;
//! nothing here propagates an error to the caller.

use chrono::Utc;
use futures::future::join_all;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde_json::Value;
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::models::{DeliveryStatus, WebhookConfig, WebhookLog, WebhookPayload, WebhookResult};

use super::formatter::formatter_for;
use super::store::LogStore;

/// Fixed source tag carried in every payload envelope
pub const SOURCE_TAG: &str = "quotawatch";

/// Signature header attached when a channel has a secret
pub const SIGNATURE_HEADER: &str = "X-Webhook-Signature";

/// Default per-attempt request timeout
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

const USER_AGENT: &str = concat!("quotawatch/", env!("CARGO_PKG_VERSION"));

type HmacSha256 = Hmac<Sha256>;

/// Sends payloads to webhook channels with retry and logging
pub struct WebhookDispatcher {
    client: Client,
    logs: Arc<dyn LogStore>,
    cancel: CancellationToken,
}

impl WebhookDispatcher {
    /// Create a dispatcher with the default per-attempt timeout
    pub fn new(logs: Arc<dyn LogStore>) -> Self {
        Self::with_timeout(logs, Duration::from_secs(DEFAULT_TIMEOUT_SECS))
    }

    /// Create a dispatcher with an explicit per-attempt timeout
    pub fn with_timeout(logs: Arc<dyn LogStore>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            logs,
            cancel: CancellationToken::new(),
        }
    }

    /// Cancel any in-flight retry sequences. Subsequent sends fail fast.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }

    /// The delivery log, oldest first
    pub fn logs(&self) -> Vec<WebhookLog> {
        self.logs.list()
    }

    /// Deliver one payload to one channel, once.
    ///
    /// Every attempt is logged, success or not, before the result is
    /// returned.
    pub async fn send(&self, channel: &WebhookConfig, event: &str, data: &Value) -> WebhookResult {
        let payload = WebhookPayload {
            event: event.to_string(),
            timestamp: Utc::now(),
            data: data.clone(),
            source: SOURCE_TAG.to_string(),
        };

        let body = match formatter_for(channel.provider) {
            Some(formatter) => formatter.format(event, data),
            None => serde_json::to_value(&payload).unwrap_or(Value::Null),
        };
        let body_text = body.to_string();

        let started = Instant::now();
        let result = self.post(channel, body_text).await;
        let result = match result {
            Ok(status) => {
                let success = status.is_success();
                WebhookResult {
                    success,
                    status_code: Some(status.as_u16()),
                    response_time_ms: started.elapsed().as_millis() as u64,
                    error: (!success).then(|| format!("HTTP {status}")),
                }
            }
            Err(e) => WebhookResult {
                success: false,
                status_code: None,
                response_time_ms: started.elapsed().as_millis() as u64,
                error: Some(e.to_string()),
            },
        };

        if result.success {
            debug!(channel = %channel.id, event, ms = result.response_time_ms, "Webhook delivered");
        } else {
            warn!(
                channel = %channel.id,
                event,
                error = result.error.as_deref().unwrap_or("unknown"),
                "Webhook delivery failed"
            );
        }

        self.logs.append(WebhookLog {
            channel_id: channel.id.clone(),
            payload,
            result: result.clone(),
            logged_at: Utc::now(),
        });

        result
    }

    /// Deliver with up to `retry_count` retries after the initial attempt.
    ///
    /// Stops on the first success; returns the last attempt's result. The
    /// cancellation token is observed between attempts and during the delay;
    /// a cancelled sequence returns the last completed attempt's result.
    pub async fn send_with_retry(
        &self,
        channel: &WebhookConfig,
        event: &str,
        data: &Value,
    ) -> WebhookResult {
        let attempts = channel.retry_count + 1;
        let mut last: Option<WebhookResult> = None;

        for attempt in 1..=attempts {
            if self.cancel.is_cancelled() {
                break;
            }

            let result = self.send(channel, event, data).await;
            let success = result.success;
            last = Some(result);

            if success {
                break;
            }

            if attempt < attempts {
                debug!(
                    channel = %channel.id,
                    attempt,
                    of = attempts,
                    delay_secs = channel.retry_delay_secs,
                    "Retrying webhook delivery"
                );
                tokio::select! {
                    () = tokio::time::sleep(Duration::from_secs(channel.retry_delay_secs)) => {}
                    () = self.cancel.cancelled() => break,
                }
            }
        }

        last.unwrap_or(WebhookResult {
            success: false,
            status_code: None,
            response_time_ms: 0,
            error: Some("delivery cancelled before any attempt".to_string()),
        })
    }

    /// Fan `event` out to every matching channel concurrently.
    ///
    /// Channels are selected by [`WebhookConfig::matches`]; non-matching
    /// channels get no attempt and no log entry. Dispatched channels have
    /// `last_triggered`/`last_status` updated in place. Returns channel id
    /// to final result.
    pub async fn trigger_channels(
        &self,
        event: &str,
        data: &Value,
        channels: &mut [WebhookConfig],
    ) -> HashMap<String, WebhookResult> {
        let selected: Vec<WebhookConfig> =
            channels.iter().filter(|c| c.matches(event)).cloned().collect();

        let deliveries = selected.iter().map(|channel| async move {
            let result = self.send_with_retry(channel, event, data).await;
            (channel.id.clone(), result)
        });
        let results: HashMap<String, WebhookResult> = join_all(deliveries).await.into_iter().collect();

        let now = Utc::now();
        for channel in channels.iter_mut() {
            if let Some(result) = results.get(&channel.id) {
                channel.last_triggered = Some(now);
                channel.last_status = Some(if result.success {
                    DeliveryStatus::Success
                } else {
                    DeliveryStatus::Failed
                });
            }
        }

        results
    }

    async fn post(&self, channel: &WebhookConfig, body: String) -> Result<reqwest::StatusCode, reqwest::Error> {
        let mut request = self
            .client
            .post(&channel.url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(reqwest::header::USER_AGENT, USER_AGENT);

        if let Some(headers) = &channel.headers {
            for (key, value) in headers {
                request = request.header(key.as_str(), value.as_str());
            }
        }

        if let Some(secret) = &channel.secret {
            request = request.header(SIGNATURE_HEADER, sign(secret, &body));
        }

        let response = request.body(body).send().await?;
        Ok(response.status())
    }
}

/// HMAC-SHA256 signature over the serialized body: `sha256=<hex>`
pub fn sign(secret: &str, body: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key size");
    mac.update(body.as_bytes());
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerting::store::MemoryLogStore;
    use crate::models::WebhookProvider;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Match, Mock, MockServer, Request, ResponseTemplate};

    fn channel(url: String) -> WebhookConfig {
        WebhookConfig {
            id: "ch-1".to_string(),
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
        }
    }

    fn dispatcher() -> WebhookDispatcher {
        WebhookDispatcher::new(Arc::new(MemoryLogStore::new()))
    }

    /// Recomputes the HMAC over the received body and compares to the header
    struct ValidSignature {
        secret: String,
    }

    impl Match for ValidSignature {
        fn matches(&self, request: &Request) -> bool {
            let body = String::from_utf8_lossy(&request.body);
            request
                .headers
                .iter()
                .find(|(name, _)| name.as_str().eq_ignore_ascii_case(SIGNATURE_HEADER))
                .map(|(_, values)| values.last().as_str() == sign(&self.secret, &body))
                .unwrap_or(false)
        }
    }

    #[tokio::test]
    async fn send_posts_envelope_and_logs() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hook"))
            .and(header("content-type", "application/json"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let dispatcher = dispatcher();
        let ch = channel(format!("{}/hook", server.uri()));
        let result = dispatcher.send(&ch, "alert.triggered", &json!({"cost": 35.0})).await;

        assert!(result.success);
        assert_eq!(result.status_code, Some(200));
        assert!(result.error.is_none());

        let logs = dispatcher.logs();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].channel_id, "ch-1");
        assert_eq!(logs[0].payload.event, "alert.triggered");
        assert_eq!(logs[0].payload.source, SOURCE_TAG);
        assert!(logs[0].result.success);
    }

    #[tokio::test]
    async fn send_signs_body_when_secret_set() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(ValidSignature {
                secret: "topsecret".to_string(),
            })
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let dispatcher = dispatcher();
        let mut ch = channel(server.uri());
        ch.secret = Some("topsecret".to_string());

        let result = dispatcher.send(&ch, "alert.triggered", &json!({})).await;
        assert!(result.success);
    }

    #[tokio::test]
    async fn send_merges_custom_headers() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("x-api-key", "abc123"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let dispatcher = dispatcher();
        let mut ch = channel(server.uri());
        ch.headers = Some(HashMap::from([("x-api-key".to_string(), "abc123".to_string())]));

        assert!(dispatcher.send(&ch, "alert.triggered", &json!({})).await.success);
    }

    #[tokio::test]
    async fn non_2xx_classifies_as_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let dispatcher = dispatcher();
        let result = dispatcher.send(&channel(server.uri()), "alert.triggered", &json!({})).await;

        assert!(!result.success);
        assert_eq!(result.status_code, Some(503));
        assert!(result.error.unwrap().contains("503"));
    }

    #[tokio::test]
    async fn transport_error_is_captured_not_thrown() {
        let dispatcher = dispatcher();
        // nothing listens here
        let ch = channel("http://127.0.0.1:1/hook".to_string());

        let result = dispatcher.send(&ch, "alert.triggered", &json!({})).await;

        assert!(!result.success);
        assert!(result.status_code.is_none());
        assert!(result.error.is_some());
        assert_eq!(dispatcher.logs().len(), 1);
    }

    #[tokio::test]
    async fn retry_makes_exactly_n_plus_one_attempts() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .expect(3)
            .mount(&server)
            .await;

        let dispatcher = dispatcher();
        let mut ch = channel(server.uri());
        ch.retry_count = 2;
        ch.retry_delay_secs = 0;

        let result = dispatcher.send_with_retry(&ch, "alert.triggered", &json!({})).await;

        assert!(!result.success);
        assert_eq!(dispatcher.logs().len(), 3);
    }

    #[tokio::test]
    async fn retry_stops_on_first_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let dispatcher = dispatcher();
        let mut ch = channel(server.uri());
        ch.retry_count = 5;
        ch.retry_delay_secs = 0;

        let result = dispatcher.send_with_retry(&ch, "alert.triggered", &json!({})).await;

        assert!(result.success);
        assert_eq!(dispatcher.logs().len(), 2);
    }

    #[tokio::test]
    async fn cancelled_dispatcher_fails_fast() {
        let dispatcher = dispatcher();
        dispatcher.shutdown();

        let mut ch = channel("http://127.0.0.1:1/hook".to_string());
        ch.retry_count = 10;
        ch.retry_delay_secs = 60;

        let result = dispatcher.send_with_retry(&ch, "alert.triggered", &json!({})).await;

        assert!(!result.success);
        assert!(result.error.unwrap().contains("cancelled"));
        assert!(dispatcher.logs().is_empty());
    }

    #[tokio::test]
    async fn trigger_channels_filters_and_updates_state() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/a"))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/b"))
            .respond_with(ResponseTemplate::new(500))
            .expect(1)
            .mount(&server)
            .await;

        let dispatcher = dispatcher();
        let mut channels = vec![
            WebhookConfig {
                id: "a".to_string(),
                events: vec!["alert.triggered".to_string()],
                ..channel(format!("{}/a", server.uri()))
            },
            WebhookConfig {
                id: "b".to_string(),
                events: vec!["*".to_string()],
                ..channel(format!("{}/b", server.uri()))
            },
            WebhookConfig {
                id: "c".to_string(),
                events: vec!["backup.completed".to_string()],
                ..channel(format!("{}/c", server.uri()))
            },
            WebhookConfig {
                id: "d".to_string(),
                is_active: false,
                ..channel(format!("{}/d", server.uri()))
            },
        ];

        let results = dispatcher
            .trigger_channels("alert.triggered", &json!({}), &mut channels)
            .await;

        assert_eq!(results.len(), 2);
        assert!(results["a"].success);
        assert!(!results["b"].success);

        assert_eq!(channels[0].last_status, Some(DeliveryStatus::Success));
        assert_eq!(channels[1].last_status, Some(DeliveryStatus::Failed));
        assert!(channels[2].last_status.is_none() && channels[2].last_triggered.is_none());
        assert!(channels[3].last_status.is_none());

        // only the two matching channels produced log entries
        assert_eq!(dispatcher.logs().len(), 2);
    }

    #[test]
    fn signature_format_is_stable() {
        // fixed vector so receivers can verify against their own HMAC
        let sig = sign("secret", r#"{"event":"test"}"#);
        assert!(sig.starts_with("sha256="));
        assert_eq!(sig.len(), "sha256=".len() + 64);
    }
}
