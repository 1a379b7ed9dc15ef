//! Official (central bank) exchange rates served as JSON.
//!
//! Expected payload:
//!
//! ```json
//! {"timestamp": 1718000000000, "rates": {"USD": {"name": "US Dollar", "price": 30.9}}}
//! ```

use super::http::HttpSource;
use crate::core::adapter::SourceAdapter;
use crate::core::asset::{AggregatedDataset, Asset, AssetType, Rate, RateType};
use crate::core::config::SourceConfig;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

pub const DEFAULT_PATH: &str = "/rates/official";
const QUOTE: &str = "EGP";

#[derive(Debug, Deserialize)]
struct OfficialResponse {
    timestamp: Option<i64>,
    rates: BTreeMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct OfficialEntry {
    name: Option<String>,
    price: f64,
}

#[derive(Debug, Default, Clone)]
pub struct OfficialRateAdapter;

impl SourceAdapter for OfficialRateAdapter {
    type Raw = String;

    fn adapt(&self, source: &str, raw: &String) -> Result<AggregatedDataset> {
        let response: OfficialResponse = serde_json::from_str(raw)
            .with_context(|| format!("Failed to parse official rates response from {source}"))?;
        let timestamp = response
            .timestamp
            .unwrap_or_else(|| chrono::Utc::now().timestamp_millis());

        let mut dataset = AggregatedDataset::new();
        for (code, value) in &response.rates {
            let code = code.trim().to_uppercase();
            let id = format!("{code}_{QUOTE}");
            if dataset.get(&id).is_some() {
                warn!(source = %source, code = %code, "Skipping duplicate official rate");
                continue;
            }
            let entry = match OfficialEntry::deserialize(value) {
                Ok(entry) if entry.price.is_finite() && entry.price > 0.0 => entry,
                Ok(_) => {
                    warn!(source = %source, code = %code, "Skipping non-positive official rate");
                    continue;
                }
                Err(e) => {
                    warn!(
                        source = %source,
                        code = %code,
                        error = %e,
                        "Skipping unparseable official rate"
                    );
                    continue;
                }
            };

            let asset = Asset::new(
                id,
                entry.name.unwrap_or_else(|| code.clone()),
                AssetType::Currency,
                source,
                timestamp,
            )
            .with_rate(RateType::Official, Rate::single(entry.price, QUOTE));
            dataset.insert(asset);
        }

        debug!(source = %source, assets = dataset.len(), "Adapted official rates");
        Ok(dataset)
    }
}

pub fn source(config: &SourceConfig) -> Result<HttpSource<OfficialRateAdapter>> {
    HttpSource::new(
        &config.name,
        &config.base_url,
        config.path.as_deref().unwrap_or(DEFAULT_PATH),
        config.timeout(),
        OfficialRateAdapter,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::source::DataSource;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_adapt_official_rates() {
        let raw = r#"{
            "timestamp": 42,
            "rates": {
                "USD": {"name": "US Dollar", "price": 30.90},
                "eur": {"price": 33.5},
                "JPY": {"name": "Yen"},
                "KWD": {"name": "Kuwaiti Dinar", "price": -1}
            }
        }"#
        .to_string();

        let dataset = OfficialRateAdapter.adapt("central-bank", &raw).unwrap();

        assert_eq!(dataset.len(), 2);
        let usd = dataset.get("USD_EGP").unwrap();
        assert_eq!(usd.timestamp, 42);
        assert_eq!(usd.name, "US Dollar");
        let rate = &usd.rates[&RateType::Official];
        assert_eq!(rate.mid_rate, 30.90);
        assert_eq!(rate.buying, 30.90);
        assert_eq!(rate.selling, 30.90);
        assert!(usd.historical_data.is_empty());

        let eur = dataset.get("EUR_EGP").unwrap();
        assert_eq!(eur.name, "EUR");
    }

    #[test]
    fn test_case_variants_keep_first_code() {
        let raw = r#"{"rates": {"EUR": {"price": 33.5}, "eur": {"price": 99.0}}}"#.to_string();

        let dataset = OfficialRateAdapter.adapt("central-bank", &raw).unwrap();

        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.get("EUR_EGP").unwrap().rates[&RateType::Official].mid_rate, 33.5);
    }

    #[test]
    fn test_adapt_wrong_shape_is_error() {
        let result = OfficialRateAdapter.adapt("central-bank", &r#"{"data": []}"#.to_string());
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_default_path_used_when_unset() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(DEFAULT_PATH))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"rates": {"USD": {"price": 30.9}}}"#),
            )
            .mount(&mock_server)
            .await;

        let config = SourceConfig {
            kind: crate::core::config::SourceKind::Official,
            name: "central-bank".to_string(),
            base_url: format!("{}/", mock_server.uri()),
            path: None,
            timeout_ms: 3_000,
            enabled: true,
        };
        let source = source(&config).unwrap();
        let dataset = source.fetch_standardized_data().await.unwrap();

        assert_eq!(dataset.get("USD_EGP").unwrap().rates[&RateType::Official].mid_rate, 30.9);
    }
}
