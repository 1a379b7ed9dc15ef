//! Translation of a source's native payload into normalized assets

use super::asset::AggregatedDataset;
use anyhow::Result;

/// Stateless translator from one source's raw payload to the common asset shape.
///
/// Implementations skip (and log) individual entries they cannot parse and
/// return whatever remains, possibly an empty dataset. An error is reserved
/// for payloads whose overall shape is unusable, e.g. a body that is not JSON
/// when JSON was expected.
pub trait SourceAdapter: Send + Sync {
    type Raw: Send + Sync;

    /// Normalizes `raw` on behalf of the source named `source`.
    fn adapt(&self, source: &str, raw: &Self::Raw) -> Result<AggregatedDataset>;
}

/// Parses a decimal that may carry thousands separators or surrounding spaces.
pub fn parse_number(text: &str) -> Option<f64> {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| *c != ',' && !c.is_whitespace())
        .collect();
    cleaned
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite() && *value > 0.0)
}
