//! Normalized asset and rate types shared by every source

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, btree_map};
use std::fmt::Display;
use std::str::FromStr;

/// Key identifying one real-world asset across all sources, e.g. `USD_EGP`.
pub type AssetId = String;

/// Pricing context for a quote. One asset can carry several at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateType {
    Official,
    ParallelMarket,
    Interbank,
    Market,
}

impl Display for RateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                RateType::Official => "official",
                RateType::ParallelMarket => "parallel_market",
                RateType::Interbank => "interbank",
                RateType::Market => "market",
            }
        )
    }
}

impl FromStr for RateType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "official" => Ok(RateType::Official),
            "parallel_market" => Ok(RateType::ParallelMarket),
            "interbank" => Ok(RateType::Interbank),
            "market" => Ok(RateType::Market),
            _ => Err(anyhow::anyhow!("Invalid rate type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetType {
    Currency,
    Commodity,
}

/// A single quote. `buying <= mid_rate <= selling` is expected but not checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rate {
    pub buying: f64,
    pub selling: f64,
    pub mid_rate: f64,
    pub unit: String,
}

impl Rate {
    /// Builds a two-sided quote with the mid rate halfway between both sides.
    pub fn two_sided(buying: f64, selling: f64, unit: &str) -> Self {
        Rate {
            buying,
            selling,
            mid_rate: (buying + selling) / 2.0,
            unit: unit.to_string(),
        }
    }

    /// Builds a quote where buying, selling and mid are the same price.
    pub fn single(price: f64, unit: &str) -> Self {
        Rate {
            buying: price,
            selling: price,
            mid_rate: price,
            unit: unit.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HistoricalPoint {
    /// Milliseconds since the unix epoch.
    pub timestamp: i64,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Asset {
    pub identifier: AssetId,
    pub name: String,
    #[serde(rename = "type")]
    pub asset_type: AssetType,
    /// Name of the source that first introduced this asset.
    pub source: String,
    /// Milliseconds since the unix epoch.
    pub timestamp: i64,
    pub rates: BTreeMap<RateType, Rate>,
    #[serde(default)]
    pub historical_data: Vec<HistoricalPoint>,
}

impl Asset {
    pub fn new(
        identifier: impl Into<AssetId>,
        name: impl Into<String>,
        asset_type: AssetType,
        source: impl Into<String>,
        timestamp: i64,
    ) -> Self {
        Asset {
            identifier: identifier.into(),
            name: name.into(),
            asset_type,
            source: source.into(),
            timestamp,
            rates: BTreeMap::new(),
            historical_data: Vec::new(),
        }
    }

    pub fn with_rate(mut self, rate_type: RateType, rate: Rate) -> Self {
        self.rates.insert(rate_type, rate);
        self
    }

    /// Replaces the historical series, keeping it ordered by timestamp.
    pub fn with_history(mut self, mut points: Vec<HistoricalPoint>) -> Self {
        points.sort_by_key(|p| p.timestamp);
        self.historical_data = points;
        self
    }
}

/// All assets produced by one source, or by one merged fetch cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedDataset {
    pub assets: BTreeMap<AssetId, Asset>,
}

impl AggregatedDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an asset keyed by its identifier. An asset without rates is ignored.
    pub fn insert(&mut self, asset: Asset) {
        if asset.rates.is_empty() {
            return;
        }
        self.assets.insert(asset.identifier.clone(), asset);
    }

    pub fn get(&self, id: &str) -> Option<&Asset> {
        self.assets.get(id)
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn iter(&self) -> btree_map::Values<'_, AssetId, Asset> {
        self.assets.values()
    }
}

impl FromIterator<Asset> for AggregatedDataset {
    fn from_iter<T: IntoIterator<Item = Asset>>(iter: T) -> Self {
        let mut dataset = AggregatedDataset::new();
        for asset in iter {
            dataset.insert(asset);
        }
        dataset
    }
}
