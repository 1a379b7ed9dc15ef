//! Concurrent fetch, per-asset merge and cache of the aggregated dataset

use super::asset::AggregatedDataset;
use super::cache::ExpiringCache;
use super::error::AggregatorError;
use super::source::{DataSource, HealthStatus, SourceHealth};
use futures::future::join_all;
use std::collections::btree_map::Entry;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, instrument, warn};

/// Merges datasets in order into one asset per identifier.
///
/// The first dataset to introduce an identifier keeps its name, source,
/// timestamp and history. Rates are merged per rate type, with later datasets
/// overwriting earlier ones for the same type. Assets without rates are dropped.
pub fn merge_datasets<I>(datasets: I) -> AggregatedDataset
where
    I: IntoIterator<Item = AggregatedDataset>,
{
    let mut merged = AggregatedDataset::new();

    for dataset in datasets {
        for (id, asset) in dataset.assets {
            if asset.rates.is_empty() {
                warn!(asset = %id, source = %asset.source, "Dropping asset without rates");
                continue;
            }
            match merged.assets.entry(id) {
                Entry::Vacant(slot) => {
                    slot.insert(asset);
                }
                Entry::Occupied(mut slot) => {
                    let existing = slot.get_mut();
                    debug!(
                        asset = %existing.identifier,
                        owner = %existing.source,
                        contributor = %asset.source,
                        "Merging rates"
                    );
                    existing.rates.extend(asset.rates);
                }
            }
        }
    }

    merged
}

/// Owns the configured sources and the shared dataset cache.
pub struct Orchestrator {
    sources: Vec<Arc<dyn DataSource>>,
    cache: ExpiringCache<AggregatedDataset>,
    cache_timeout: Duration,
}

impl Orchestrator {
    /// `sources` is in priority order: later sources win rate-type collisions.
    pub fn new(sources: Vec<Arc<dyn DataSource>>, cache_timeout: Duration) -> Self {
        Self {
            sources,
            cache: ExpiringCache::new(),
            cache_timeout,
        }
    }

    /// Returns the cached dataset while fresh, otherwise runs a fetch cycle.
    ///
    /// When no source yields an asset the previous dataset is served stale;
    /// without one the call fails with [`AggregatorError::Unavailable`].
    #[instrument(name = "AggregationCycle", skip(self))]
    pub async fn get_aggregated_dataset(&self) -> Result<Arc<AggregatedDataset>, AggregatorError> {
        if let Some(cached) = self.cache.get_fresh().await {
            return Ok(cached);
        }

        let active = self.active_sources().await;
        debug!(active = active.len(), total = self.sources.len(), "Starting fetch cycle");

        let results = join_all(active.iter().map(|source| async move {
            (source.name(), source.fetch_standardized_data().await)
        }))
        .await;

        let mut datasets = Vec::with_capacity(results.len());
        for (name, result) in results {
            match result {
                Ok(dataset) => datasets.push(dataset),
                Err(e) => warn!(source = %name, error = %e, "Discarding failed source"),
            }
        }
        let succeeded = datasets.len();
        let merged = merge_datasets(datasets);

        if merged.is_empty() {
            return match self.cache.get_stale().await {
                Some(stale) => {
                    error!(
                        assets = stale.len(),
                        "All sources returned no data, serving stale dataset"
                    );
                    Ok(stale)
                }
                None => {
                    error!("All sources returned no data and nothing is cached");
                    Err(AggregatorError::Unavailable)
                }
            };
        }

        info!(
            assets = merged.len(),
            sources = succeeded,
            "Aggregated dataset refreshed"
        );
        let merged = Arc::new(merged);
        self.cache
            .put(Arc::clone(&merged), self.cache_timeout)
            .await;
        Ok(merged)
    }

    /// Snapshot of every source's health, in configured order.
    pub async fn health(&self) -> Vec<SourceHealth> {
        join_all(self.sources.iter().map(|source| source.health())).await
    }

    pub async fn status(&self) -> HealthStatus {
        HealthStatus::rollup(&self.health().await)
    }

    /// Probes every source concurrently and waits for all probes to settle.
    pub async fn run_health_checks(&self) {
        join_all(self.sources.iter().map(|source| source.check_health())).await;
        debug!(sources = self.sources.len(), "Health checks completed");
    }

    async fn active_sources(&self) -> Vec<Arc<dyn DataSource>> {
        let health = self.health().await;
        self.sources
            .iter()
            .zip(health)
            .filter_map(|(source, health)| {
                if health.status == HealthStatus::Failed {
                    debug!(source = %source.name(), "Skipping failed source");
                    None
                } else {
                    Some(Arc::clone(source))
                }
            })
            .collect()
    }
}
