//! Process-wide entry point over a single orchestrator

use super::asset::{AggregatedDataset, Asset, AssetId};
use super::config::AppConfig;
use super::error::AggregatorError;
use super::log::{LogBuffer, LogEntry, LogLevel};
use super::orchestrator::Orchestrator;
use super::source::{DataSource, HealthStatus, SourceHealth};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Serialize)]
pub struct ServiceHealth {
    pub status: HealthStatus,
    pub sources: Vec<SourceHealth>,
}

/// Context object built once at startup and shared with request handlers.
pub struct Aggregator {
    orchestrator: Arc<Orchestrator>,
    logs: LogBuffer,
    health_check_interval: Duration,
}

impl Aggregator {
    pub fn new(config: &AppConfig, sources: Vec<Arc<dyn DataSource>>, logs: LogBuffer) -> Self {
        info!(sources = sources.len(), "Aggregator initialized");
        Self {
            orchestrator: Arc::new(Orchestrator::new(sources, config.cache_timeout())),
            logs,
            health_check_interval: config.health_check_interval(),
        }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    pub async fn dataset(&self) -> Result<Arc<AggregatedDataset>, AggregatorError> {
        self.orchestrator.get_aggregated_dataset().await
    }

    /// The requested assets that exist; unknown ids are left out.
    pub async fn assets(
        &self,
        ids: &[AssetId],
    ) -> Result<BTreeMap<AssetId, Asset>, AggregatorError> {
        let dataset = self.dataset().await?;
        let found: BTreeMap<AssetId, Asset> = ids
            .iter()
            .filter_map(|id| dataset.get(id).map(|asset| (id.clone(), asset.clone())))
            .collect();
        debug!(requested = ids.len(), found = found.len(), "Asset lookup");
        Ok(found)
    }

    pub async fn service_health(&self) -> ServiceHealth {
        let sources = self.orchestrator.health().await;
        ServiceHealth {
            status: HealthStatus::rollup(&sources),
            sources,
        }
    }

    pub fn logs(&self, min_level: Option<LogLevel>) -> Vec<LogEntry> {
        self.logs.entries(min_level)
    }

    /// Spawns the periodic health check task. The first round runs one
    /// interval after start. Call [`HealthCheckHandle::stop`] on shutdown.
    pub fn start_health_checks(&self) -> HealthCheckHandle {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let orchestrator = Arc::clone(&self.orchestrator);
        let period = self.health_check_interval;

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => orchestrator.run_health_checks().await,
                    _ = shutdown_rx.changed() => break,
                }
            }
            debug!("Health check task stopped");
        });

        info!(interval_ms = period.as_millis() as u64, "Health checks scheduled");
        HealthCheckHandle { shutdown, task }
    }
}

/// Handle to the background health check task.
pub struct HealthCheckHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl HealthCheckHandle {
    /// Signals the task to stop and waits for it to finish its current round.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "Health check task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::asset::RateType;
    use crate::core::test_support::{MockSource, as_sources, asset, dataset};

    fn config(health_check_interval_ms: u64) -> AppConfig {
        AppConfig {
            cache_timeout_ms: 60_000,
            health_check_interval_ms,
            ..AppConfig::default()
        }
    }

    fn aggregator(sources: &[Arc<MockSource>], interval_ms: u64) -> Aggregator {
        Aggregator::new(
            &config(interval_ms),
            as_sources(sources),
            LogBuffer::with_level(LogLevel::Debug),
        )
    }

    #[tokio::test]
    async fn test_assets_filters_requested_ids() {
        let source = MockSource::new(
            "a",
            Some(dataset(vec![
                asset("USD_EGP", "a", RateType::Official, 30.9),
                asset("EUR_EGP", "a", RateType::Official, 33.5),
            ])),
        );
        let aggregator = aggregator(&[source], 60_000);

        let ids = vec!["USD_EGP".to_string(), "XAU_EGP".to_string()];
        let assets = aggregator.assets(&ids).await.unwrap();

        assert_eq!(assets.len(), 1);
        assert!(assets.contains_key("USD_EGP"));
        assert!(!assets.contains_key("EUR_EGP"));
    }

    #[tokio::test]
    async fn test_assets_propagates_unavailable() {
        let source = MockSource::new("a", None);
        let aggregator = aggregator(&[source], 60_000);

        let result = aggregator.assets(&["USD_EGP".to_string()]).await;
        assert!(matches!(result, Err(AggregatorError::Unavailable)));
    }

    #[tokio::test]
    async fn test_service_health_reports_every_source() {
        let a = MockSource::new(
            "a",
            Some(dataset(vec![asset("USD_EGP", "a", RateType::Official, 30.9)])),
        );
        let b = MockSource::new("b", None);
        let aggregator = aggregator(&[a, b], 60_000);

        assert_eq!(aggregator.service_health().await.status, HealthStatus::Healthy);

        aggregator.dataset().await.unwrap();
        let health = aggregator.service_health().await;

        assert_eq!(health.status, HealthStatus::Degraded);
        assert_eq!(health.sources.len(), 2);
        assert_eq!(health.sources[1].message.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn test_periodic_health_checks_stop_on_shutdown() {
        let source = MockSource::new("a", None);
        let aggregator = aggregator(&[Arc::clone(&source)], 10);

        let handle = aggregator.start_health_checks();
        tokio::time::sleep(Duration::from_millis(55)).await;
        handle.stop().await;

        let probes = source.probes();
        assert!(probes >= 2, "expected at least two rounds, got {probes}");

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(source.probes(), probes);
    }

    #[tokio::test]
    async fn test_health_checks_do_not_block_dataset() {
        let source = MockSource::new(
            "a",
            Some(dataset(vec![asset("USD_EGP", "a", RateType::Official, 30.9)])),
        );
        let aggregator = aggregator(&[Arc::clone(&source)], 5);

        let handle = aggregator.start_health_checks();
        let dataset = aggregator.dataset().await.unwrap();
        handle.stop().await;

        assert!(dataset.get("USD_EGP").is_some());
    }

    #[tokio::test]
    async fn test_slow_health_round_does_not_delay_dataset() {
        let source = MockSource::with_check_delay(
            "a",
            Some(dataset(vec![asset("USD_EGP", "a", RateType::Official, 30.9)])),
            Duration::from_millis(500),
        );
        let aggregator = aggregator(&[Arc::clone(&source)], 5);

        let handle = aggregator.start_health_checks();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(source.probes(), 1, "a health round should be in flight");

        let started = std::time::Instant::now();
        let dataset = aggregator.dataset().await.unwrap();
        let elapsed = started.elapsed();

        assert!(dataset.get("USD_EGP").is_some());
        assert!(
            elapsed < Duration::from_millis(100),
            "dataset waited on the health round: {elapsed:?}"
        );
        assert_eq!(source.calls(), 1);

        handle.stop().await;
    }

    #[test]
    fn test_logs_filtered_by_level() {
        use tracing_subscriber::prelude::*;

        let buffer = LogBuffer::with_level(LogLevel::Debug);
        let aggregator = Aggregator::new(&config(60_000), Vec::new(), buffer.clone());
        tracing::subscriber::with_default(tracing_subscriber::registry().with(buffer), || {
            tracing::info!("refreshed");
            tracing::error!("unavailable");
        });

        let errors = aggregator.logs(Some(LogLevel::Error));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].message, "unavailable");
        assert_eq!(aggregator.logs(None).len(), 2);
    }
}
