//! Local gold prices scraped from an HTML price table.
//!
//! Each table row carries the karat, the buying price and the selling price
//! per gram, e.g. `<tr><td>24 Karat</td><td>3,650.50</td><td>3,670.00</td></tr>`.

use super::http::HttpSource;
use crate::core::adapter::{SourceAdapter, parse_number};
use crate::core::asset::{AggregatedDataset, Asset, AssetType, Rate, RateType};
use crate::core::config::SourceConfig;
use anyhow::{Context, Result, bail};
use regex::Regex;
use tracing::{debug, warn};

pub const DEFAULT_PATH: &str = "/gold-price";
const UNIT: &str = "EGP/gram";

pub struct GoldPriceAdapter {
    table: Regex,
    row: Regex,
    cell: Regex,
    tag: Regex,
    karat: Regex,
}

impl GoldPriceAdapter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            table: Regex::new(r"(?is)<table[^>]*>(.*?)</table>").context("Invalid table pattern")?,
            row: Regex::new(r"(?is)<tr[^>]*>(.*?)</tr>").context("Invalid row pattern")?,
            cell: Regex::new(r"(?is)<td[^>]*>(.*?)</td>").context("Invalid cell pattern")?,
            tag: Regex::new(r"<[^>]+>").context("Invalid tag pattern")?,
            karat: Regex::new(r"(?i)\b(\d{1,2})\s*(?:k\b|karat)").context("Invalid karat pattern")?,
        })
    }

    fn cell_texts(&self, row: &str) -> Vec<String> {
        self.cell
            .captures_iter(row)
            .map(|cap| {
                let inner = cap.get(1).map_or("", |m| m.as_str());
                self.tag.replace_all(inner, "").trim().to_string()
            })
            .collect()
    }

    fn parse_row(&self, cells: &[String]) -> Option<(u32, f64, f64)> {
        let karat = self
            .karat
            .captures(cells.first()?)?
            .get(1)?
            .as_str()
            .parse::<u32>()
            .ok()?;
        let buying = parse_number(cells.get(1)?)?;
        let selling = parse_number(cells.get(2)?)?;
        Some((karat, buying, selling))
    }
}

impl SourceAdapter for GoldPriceAdapter {
    type Raw = String;

    fn adapt(&self, source: &str, raw: &String) -> Result<AggregatedDataset> {
        let tables: Vec<&str> = self
            .table
            .captures_iter(raw)
            .filter_map(|cap| cap.get(1).map(|m| m.as_str()))
            .collect();
        if tables.is_empty() {
            bail!("No price table found in page from {source}");
        }

        let timestamp = chrono::Utc::now().timestamp_millis();
        let mut dataset = AggregatedDataset::new();

        for table in tables {
            for row in self.row.captures_iter(table) {
                let cells = self.cell_texts(row.get(1).map_or("", |m| m.as_str()));
                if cells.is_empty() {
                    // Header rows only carry <th> cells
                    continue;
                }
                let Some((karat, buying, selling)) = self.parse_row(&cells) else {
                    warn!(source = %source, row = ?cells, "Skipping unparseable gold row");
                    continue;
                };

                let asset = Asset::new(
                    format!("GOLD{karat}K_EGP"),
                    format!("Gold {karat}K"),
                    AssetType::Commodity,
                    source,
                    timestamp,
                )
                .with_rate(RateType::Market, Rate::two_sided(buying, selling, UNIT));
                dataset.insert(asset);
            }
        }

        debug!(source = %source, assets = dataset.len(), "Adapted gold prices");
        Ok(dataset)
    }
}

pub fn source(config: &SourceConfig) -> Result<HttpSource<GoldPriceAdapter>> {
    HttpSource::new(
        &config.name,
        &config.base_url,
        config.path.as_deref().unwrap_or(DEFAULT_PATH),
        config.timeout(),
        GoldPriceAdapter::new()?,
    )
}
