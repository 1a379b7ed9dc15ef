pub mod gold;
pub mod http;
pub mod official;
pub mod parallel_market;
pub mod util;

use crate::core::config::{AppConfig, SourceConfig, SourceKind};
use crate::core::source::DataSource;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::debug;

pub fn build_source(config: &SourceConfig) -> Result<Arc<dyn DataSource>> {
    let source: Arc<dyn DataSource> = match config.kind {
        SourceKind::ParallelMarket => Arc::new(parallel_market::source(config)?),
        SourceKind::Official => Arc::new(official::source(config)?),
        SourceKind::GoldScrape => Arc::new(gold::source(config)?),
    };
    debug!(source = %config.name, kind = ?config.kind, "Configured source");
    Ok(source)
}

/// Builds the enabled sources in configured order.
pub fn build_sources(config: &AppConfig) -> Result<Vec<Arc<dyn DataSource>>> {
    config
        .active_sources()
        .map(|source| {
            build_source(source)
                .with_context(|| format!("Failed to configure source: {}", source.name))
        })
        .collect()
}
