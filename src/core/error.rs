use thiserror::Error;

/// Failures surfaced by the aggregation core.
#[derive(Debug, Error)]
pub enum AggregatorError {
    /// A single source could not produce a dataset (timeout, transport, status or payload shape).
    #[error("Source {source_name} failed: {message}")]
    Source {
        source_name: String,
        message: String,
    },

    /// No source produced any asset and there is nothing cached to fall back on.
    #[error("All sources unavailable")]
    Unavailable,
}

impl AggregatorError {
    pub fn source_failure(name: &str, err: impl std::fmt::Display) -> Self {
        AggregatorError::Source {
            source_name: name.to_string(),
            message: err.to_string(),
        }
    }
}
