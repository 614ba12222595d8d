//! Usage snapshot providers
//!
//! The evaluator consumes [`UsageMetrics`] snapshots; providers produce
//! them. Production polls the hosted project's management/billing API; the
//! static provider backs tests and one-shot CLI evaluation.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::debug;

use crate::config::UsageSourceConfig;
use crate::error::{Error, Result};
use crate::models::UsageMetrics;

/// Source of usage snapshots
#[async_trait]
pub trait UsageProvider: Send + Sync {
    /// Produce the current usage snapshot
    async fn fetch(&self) -> Result<UsageMetrics>;
}

/// Polls a management API endpoint for usage snapshots
#[derive(Debug)]
pub struct HttpUsageProvider {
    client: Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpUsageProvider {
    /// Create a provider for `endpoint`, optionally authenticating with a
    /// bearer token
    pub fn new(endpoint: impl Into<String>, token: Option<String>) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            endpoint: endpoint.into(),
            token,
        }
    }

    /// Build from configuration; errors when no endpoint is configured
    pub fn from_config(config: &UsageSourceConfig) -> Result<Self> {
        let endpoint = config
            .endpoint
            .clone()
            .ok_or_else(|| Error::config("usage endpoint is not configured"))?;

        Ok(Self::new(endpoint, config.token.clone()))
    }
}

#[async_trait]
impl UsageProvider for HttpUsageProvider {
    async fn fetch(&self) -> Result<UsageMetrics> {
        let mut request = self.client.get(&self.endpoint);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(Error::http(format!(
                "usage endpoint returned {}",
                response.status()
            )));
        }

        let metrics: UsageMetrics = response.json().await?;
        debug!(cost = metrics.cost, storage_bytes = metrics.storage_bytes, "Fetched usage snapshot");

        Ok(metrics)
    }
}

/// A fixed snapshot, for tests and one-shot evaluation
pub struct StaticUsageProvider {
    metrics: UsageMetrics,
}

impl StaticUsageProvider {
    /// Create a provider that always returns `metrics`
    pub fn new(metrics: UsageMetrics) -> Self {
        Self { metrics }
    }
}

#[async_trait]
impl UsageProvider for StaticUsageProvider {
    async fn fetch(&self) -> Result<UsageMetrics> {
        Ok(self.metrics)
    }
}
