//! HTTP-backed data source shared by all reference providers

use super::util::{join_url, with_retry};
use crate::core::adapter::SourceAdapter;
use crate::core::asset::AggregatedDataset;
use crate::core::error::AggregatorError;
use crate::core::source::{
    DataSource, HealthStatus, HealthTracker, SourceHealth, fetch_with_health,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

const USER_AGENT: &str = "ratehub/0.1";
const RETRIES: usize = 1;
const RETRY_DELAY_MS: u64 = 250;

/// Fetches a text payload with GET, probes with HEAD, and hands the body to `A`.
pub struct HttpSource<A> {
    name: String,
    url: String,
    timeout: Duration,
    client: reqwest::Client,
    adapter: A,
    health: HealthTracker,
}

impl<A> HttpSource<A>
where
    A: SourceAdapter<Raw = String>,
{
    pub fn new(
        name: &str,
        base_url: &str,
        path: &str,
        timeout: Duration,
        adapter: A,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .with_context(|| format!("Failed to build HTTP client for source: {name}"))?;

        Ok(Self {
            name: name.to_string(),
            url: join_url(base_url, path),
            timeout,
            client,
            adapter,
            health: HealthTracker::new(name),
        })
    }

    async fn fetch_body(&self) -> Result<String> {
        debug!("Requesting data from {}", self.url);
        let response = with_retry(
            || async { self.client.get(&self.url).send().await?.error_for_status() },
            RETRIES,
            RETRY_DELAY_MS,
        )
        .await
        .with_context(|| format!("Request to {} failed", self.url))?;

        response
            .text()
            .await
            .with_context(|| format!("Failed to read response body from {}", self.url))
    }
}

/// Probe responses meaning the endpoint is gone or refuses us for good.
fn is_permanent_failure(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND | StatusCode::GONE
    )
}

#[async_trait]
impl<A> DataSource for HttpSource<A>
where
    A: SourceAdapter<Raw = String> + 'static,
{
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(name = "SourceFetch", skip(self), fields(source = %self.name))]
    async fn fetch_standardized_data(&self) -> Result<AggregatedDataset, AggregatorError> {
        fetch_with_health(&self.name, &self.health, &self.adapter, self.timeout, || {
            self.fetch_body()
        })
        .await
    }

    async fn check_health(&self) {
        let started = Instant::now();
        let outcome = tokio::time::timeout(self.timeout, self.client.head(&self.url).send()).await;
        let latency = started.elapsed();

        let (status, message) = match outcome {
            Err(_) => (
                HealthStatus::Degraded,
                Some(format!(
                    "Health probe timed out after {}ms",
                    self.timeout.as_millis()
                )),
            ),
            Ok(Err(e)) => (
                HealthStatus::Degraded,
                Some(format!("Health probe failed: {e}")),
            ),
            Ok(Ok(response)) if response.status().is_success() => (HealthStatus::Healthy, None),
            Ok(Ok(response)) if is_permanent_failure(response.status()) => (
                HealthStatus::Failed,
                Some(format!("Health probe returned {}", response.status())),
            ),
            Ok(Ok(response)) => (
                HealthStatus::Degraded,
                Some(format!("Health probe returned {}", response.status())),
            ),
        };

        if status == HealthStatus::Healthy {
            debug!(source = %self.name, "Health probe succeeded");
        } else {
            warn!(source = %self.name, %status, reason = ?message, "Health probe failed");
        }
        self.health.update(status, latency, message).await;
    }

    async fn health(&self) -> SourceHealth {
        self.health.snapshot().await
    }
}
