//! Scriptable in-memory sources for unit tests

use super::asset::{AggregatedDataset, Asset, AssetType, Rate, RateType};
use super::error::AggregatorError;
use super::source::{DataSource, HealthStatus, HealthTracker, SourceHealth};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Returns its current dataset, or fails when it has none.
pub struct MockSource {
    name: String,
    dataset: Mutex<Option<AggregatedDataset>>,
    calls: AtomicUsize,
    probes: AtomicUsize,
    check_delay: Duration,
    pub health: HealthTracker,
}

impl MockSource {
    pub fn new(name: &str, dataset: Option<AggregatedDataset>) -> Arc<Self> {
        Self::with_check_delay(name, dataset, Duration::ZERO)
    }

    /// Like [`MockSource::new`], but each health check takes `check_delay`.
    pub fn with_check_delay(
        name: &str,
        dataset: Option<AggregatedDataset>,
        check_delay: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            dataset: Mutex::new(dataset),
            calls: AtomicUsize::new(0),
            probes: AtomicUsize::new(0),
            check_delay,
            health: HealthTracker::new(name),
        })
    }

    pub fn set_dataset(&self, dataset: Option<AggregatedDataset>) {
        *self.dataset.lock().unwrap() = dataset;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn probes(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DataSource for MockSource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_standardized_data(&self) -> Result<AggregatedDataset, AggregatorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let dataset = self.dataset.lock().unwrap().clone();
        match dataset {
            Some(dataset) => {
                self.health
                    .update(HealthStatus::Healthy, Duration::ZERO, None)
                    .await;
                Ok(dataset)
            }
            None => {
                self.health
                    .update(
                        HealthStatus::Degraded,
                        Duration::ZERO,
                        Some("boom".to_string()),
                    )
                    .await;
                Err(AggregatorError::source_failure(&self.name, "boom"))
            }
        }
    }

    async fn check_health(&self) {
        self.probes.fetch_add(1, Ordering::SeqCst);
        if !self.check_delay.is_zero() {
            tokio::time::sleep(self.check_delay).await;
        }
        self.health
            .update(HealthStatus::Healthy, Duration::ZERO, None)
            .await;
    }

    async fn health(&self) -> SourceHealth {
        self.health.snapshot().await
    }
}

pub fn as_sources(sources: &[Arc<MockSource>]) -> Vec<Arc<dyn DataSource>> {
    sources
        .iter()
        .map(|s| Arc::clone(s) as Arc<dyn DataSource>)
        .collect()
}

pub fn asset(id: &str, source: &str, rate_type: RateType, mid: f64) -> Asset {
    Asset::new(id, format!("{id} from {source}"), AssetType::Currency, source, 1)
        .with_rate(rate_type, Rate::single(mid, "EGP"))
}

pub fn dataset(assets: Vec<Asset>) -> AggregatedDataset {
    assets.into_iter().collect()
}
