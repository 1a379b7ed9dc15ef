//! Parallel (black) market currency quotes served as JSON.
//!
//! Expected payload:
//!
//! ```json
//! {"updatedAt": 1718000000000,
//!  "currencies": [{"code": "USD", "name": "US Dollar", "buying": 50.5, "selling": 50.7,
//!                  "history": [{"timestamp": 1717900000000, "value": 50.2}]}]}
//! ```

use super::http::HttpSource;
use crate::core::adapter::SourceAdapter;
use crate::core::asset::{AggregatedDataset, Asset, AssetType, HistoricalPoint, Rate, RateType};
use crate::core::config::SourceConfig;
use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, warn};

pub const DEFAULT_PATH: &str = "/api/rates";
const QUOTE: &str = "EGP";

#[derive(Debug, Deserialize)]
struct ParallelMarketResponse {
    #[serde(alias = "updatedAt")]
    updated_at: Option<i64>,
    currencies: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct CurrencyEntry {
    code: String,
    name: Option<String>,
    buying: f64,
    selling: f64,
    #[serde(default)]
    history: Vec<serde_json::Value>,
}

#[derive(Debug, Default, Clone)]
pub struct ParallelMarketAdapter;

impl SourceAdapter for ParallelMarketAdapter {
    type Raw = String;

    fn adapt(&self, source: &str, raw: &String) -> Result<AggregatedDataset> {
        let response: ParallelMarketResponse = serde_json::from_str(raw)
            .with_context(|| format!("Failed to parse parallel market response from {source}"))?;
        let timestamp = response
            .updated_at
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());

        let mut dataset = AggregatedDataset::new();
        for value in &response.currencies {
            let entry = match CurrencyEntry::deserialize(value) {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(
                        source = %source,
                        error = %e,
                        entry = %value,
                        "Skipping unparseable currency"
                    );
                    continue;
                }
            };

            let code = entry.code.trim().to_uppercase();
            if code.is_empty() || !is_valid_price(entry.buying) || !is_valid_price(entry.selling) {
                warn!(source = %source, entry = %value, "Skipping currency with invalid quote");
                continue;
            }

            let asset = Asset::new(
                format!("{code}_{QUOTE}"),
                entry.name.unwrap_or_else(|| code.clone()),
                AssetType::Currency,
                source,
                timestamp,
            )
            .with_rate(
                RateType::ParallelMarket,
                Rate::two_sided(entry.buying, entry.selling, QUOTE),
            )
            .with_history(parse_history(source, &code, &entry.history));
            dataset.insert(asset);
        }

        debug!(source = %source, assets = dataset.len(), "Adapted parallel market quotes");
        Ok(dataset)
    }
}

/// History points that fail to parse are dropped; the quote itself is kept.
fn parse_history(
    source: &str,
    code: &str,
    points: &[serde_json::Value],
) -> Vec<HistoricalPoint> {
    points
        .iter()
        .filter_map(|point| match HistoricalPoint::deserialize(point) {
            Ok(point) => Some(point),
            Err(e) => {
                warn!(
                    source = %source,
                    code = %code,
                    error = %e,
                    point = %point,
                    "Skipping unparseable history point"
                );
                None
            }
        })
        .collect()
}

fn is_valid_price(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

pub fn source(config: &SourceConfig) -> Result<HttpSource<ParallelMarketAdapter>> {
    HttpSource::new(
        &config.name,
        &config.base_url,
        config.path.as_deref().unwrap_or(DEFAULT_PATH),
        config.timeout(),
        ParallelMarketAdapter,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::source::{DataSource, HealthStatus};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const MOCK_JSON: &str = r#"{
        "updatedAt": 1718000000000,
        "currencies": [
            {"code": "usd", "name": "US Dollar", "buying": 50.5, "selling": 50.7,
             "history": [{"timestamp": 3, "value": 50.1}, {"timestamp": 1, "value": 49.9}]},
            {"code": "EUR", "buying": 54.0, "selling": 54.4},
            {"code": "SAR", "name": "Saudi Riyal", "buying": "n/a", "selling": 13.5},
            {"code": "GBP", "name": "Pound Sterling", "buying": 0, "selling": 64.0},
            {"name": "No code", "buying": 1.0, "selling": 1.1}
        ]
    }"#;

    #[test]
    fn test_adapt_parallel_quotes() {
        let dataset = ParallelMarketAdapter
            .adapt("black-market", &MOCK_JSON.to_string())
            .unwrap();

        assert_eq!(dataset.len(), 2);

        let usd = dataset.get("USD_EGP").unwrap();
        assert_eq!(usd.name, "US Dollar");
        assert_eq!(usd.source, "black-market");
        assert_eq!(usd.asset_type, AssetType::Currency);
        assert_eq!(usd.timestamp, 1718000000000);
        assert_eq!(usd.rates.len(), 1);
        let rate = &usd.rates[&RateType::ParallelMarket];
        assert_eq!(rate.buying, 50.5);
        assert_eq!(rate.selling, 50.7);
        assert!((rate.mid_rate - 50.6).abs() < 1e-9);
        assert_eq!(rate.unit, "EGP");
        let timestamps: Vec<i64> = usd.historical_data.iter().map(|p| p.timestamp).collect();
        assert_eq!(timestamps, vec![1, 3]);

        // Name falls back to the code
        assert_eq!(dataset.get("EUR_EGP").unwrap().name, "EUR");
    }

    #[test]
    fn test_bad_history_point_keeps_quote() {
        let raw = r#"{"currencies": [
            {"code": "USD", "buying": 50.5, "selling": 50.7,
             "history": [{"timestamp": 1, "value": 50.1},
                         {"timestamp": "yesterday", "value": 49.0}]}
        ]}"#
        .to_string();

        let dataset = ParallelMarketAdapter.adapt("black-market", &raw).unwrap();

        assert_eq!(dataset.len(), 1);
        let usd = dataset.get("USD_EGP").unwrap();
        assert_eq!(usd.rates[&RateType::ParallelMarket].buying, 50.5);
        assert_eq!(usd.historical_data.len(), 1);
        assert_eq!(usd.historical_data[0].timestamp, 1);
    }

    #[test]
    fn test_adapt_empty_currency_list() {
        let dataset = ParallelMarketAdapter
            .adapt("black-market", &r#"{"currencies": []}"#.to_string())
            .unwrap();
        assert!(dataset.is_empty());
    }

    #[test]
    fn test_adapt_rejects_non_json() {
        let result = ParallelMarketAdapter.adapt("black-market", &"<html></html>".to_string());
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("Failed to parse parallel market response from black-market")
        );
    }

    #[test]
    fn test_adapt_leaves_payload_untouched() {
        let raw = MOCK_JSON.to_string();
        let _ = ParallelMarketAdapter.adapt("black-market", &raw).unwrap();
        assert_eq!(raw, MOCK_JSON);
    }

    #[tokio::test]
    async fn test_source_fetches_default_path() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(DEFAULT_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_string(MOCK_JSON))
            .mount(&mock_server)
            .await;

        let config = SourceConfig {
            kind: crate::core::config::SourceKind::ParallelMarket,
            name: "black-market".to_string(),
            base_url: mock_server.uri(),
            path: None,
            timeout_ms: 2_000,
            enabled: true,
        };
        let source = source(&config).unwrap();
        let dataset = source.fetch_standardized_data().await.unwrap();

        assert!(dataset.get("USD_EGP").is_some());
        assert_eq!(source.health().await.status, HealthStatus::Healthy);
    }
}
