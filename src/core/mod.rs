//! Aggregation core: data model, sources, merge-and-cache orchestration

pub mod adapter;
pub mod aggregator;
pub mod asset;
pub mod cache;
pub mod config;
pub mod error;
pub mod log;
pub mod orchestrator;
pub mod source;

#[cfg(test)]
pub(crate) mod test_support;

// Re-export main types for cleaner imports
pub use adapter::SourceAdapter;
pub use aggregator::{Aggregator, HealthCheckHandle, ServiceHealth};
pub use asset::{AggregatedDataset, Asset, AssetId, AssetType, HistoricalPoint, Rate, RateType};
pub use error::AggregatorError;
pub use source::{DataSource, HealthStatus, SourceHealth};
