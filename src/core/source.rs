//! Data source abstraction and per-source health tracking

use super::adapter::SourceAdapter;
use super::asset::AggregatedDataset;
use super::error::AggregatorError;
use anyhow::anyhow;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    /// Last operation failed; the source is still attempted on the next cycle.
    Degraded,
    /// Explicitly unusable; skipped by fetch cycles until a probe succeeds.
    Failed,
}

impl Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                HealthStatus::Healthy => "healthy",
                HealthStatus::Degraded => "degraded",
                HealthStatus::Failed => "failed",
            }
        )
    }
}

impl HealthStatus {
    /// Service-wide status: failed when every source failed (or there are no
    /// sources), degraded when any source is not healthy, healthy otherwise.
    pub fn rollup(sources: &[SourceHealth]) -> HealthStatus {
        if sources.iter().all(|s| s.status == HealthStatus::Failed) {
            HealthStatus::Failed
        } else if sources.iter().any(|s| s.status != HealthStatus::Healthy) {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceHealth {
    pub source: String,
    pub status: HealthStatus,
    /// Milliseconds since the unix epoch, 0 until the first fetch or probe.
    pub last_check: i64,
    pub latency_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl SourceHealth {
    pub fn new(source: &str) -> Self {
        SourceHealth {
            source: source.to_string(),
            status: HealthStatus::Healthy,
            last_check: 0,
            latency_ms: 0,
            message: None,
        }
    }
}

/// Health record owned by a single source. Readers only ever get copies.
pub struct HealthTracker {
    state: RwLock<SourceHealth>,
}

impl HealthTracker {
    pub fn new(source: &str) -> Self {
        Self {
            state: RwLock::new(SourceHealth::new(source)),
        }
    }

    pub async fn snapshot(&self) -> SourceHealth {
        self.state.read().await.clone()
    }

    pub async fn update(&self, status: HealthStatus, latency: Duration, message: Option<String>) {
        let mut state = self.state.write().await;
        state.status = status;
        state.last_check = chrono::Utc::now().timestamp_millis();
        state.latency_ms = u64::try_from(latency.as_millis()).unwrap_or(u64::MAX);
        state.message = message;
    }
}

/// A fetch-capable, health-tracked wrapper around one external origin.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Unique among the active sources.
    fn name(&self) -> &str;

    /// Fetches and normalizes the source's data. A failure is always an error,
    /// never an empty dataset.
    async fn fetch_standardized_data(&self) -> Result<AggregatedDataset, AggregatorError>;

    /// Lightweight liveness probe. All outcomes end up in the health record.
    async fn check_health(&self);

    async fn health(&self) -> SourceHealth;
}

/// Runs one timed fetch-and-adapt cycle and records its outcome.
///
/// `fetch` is bounded by `timeout`; expiry is treated like a transport error.
/// Success marks the source healthy, any failure marks it degraded and is
/// returned tagged with the source name.
pub async fn fetch_with_health<A, F, Fut>(
    name: &str,
    health: &HealthTracker,
    adapter: &A,
    timeout: Duration,
    fetch: F,
) -> Result<AggregatedDataset, AggregatorError>
where
    A: SourceAdapter,
    F: FnOnce() -> Fut,
    Fut: Future<Output = anyhow::Result<A::Raw>>,
{
    let started = Instant::now();

    let outcome = match tokio::time::timeout(timeout, fetch()).await {
        Ok(Ok(raw)) => adapter.adapt(name, &raw),
        Ok(Err(e)) => Err(e),
        Err(_) => Err(anyhow!("Request timed out after {}ms", timeout.as_millis())),
    };
    let latency = started.elapsed();

    match outcome {
        Ok(dataset) => {
            debug!(
                source = %name,
                assets = dataset.len(),
                latency_ms = latency.as_millis() as u64,
                "Fetched dataset"
            );
            health.update(HealthStatus::Healthy, latency, None).await;
            Ok(dataset)
        }
        Err(e) => {
            let message = format!("{e:#}");
            warn!(source = %name, error = %message, "Fetch failed");
            health
                .update(HealthStatus::Degraded, latency, Some(message.clone()))
                .await;
            Err(AggregatorError::source_failure(name, message))
        }
    }
}
