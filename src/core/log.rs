//! Logging setup and the in-memory log buffer behind `logs(min_level)`

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fmt::{Debug, Display};
use std::str::FromStr;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::field::{Field, Visit};
use tracing::level_filters::LevelFilter;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::layer::{Context, Layer};
use tracing_subscriber::{
    EnvFilter, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

const DEFAULT_CAPACITY: usize = 1000;

/// Log severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl From<&Level> for LogLevel {
    fn from(level: &Level) -> Self {
        match *level {
            Level::ERROR => LogLevel::Error,
            Level::WARN => LogLevel::Warn,
            Level::INFO => LogLevel::Info,
            _ => LogLevel::Debug,
        }
    }
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

impl Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                LogLevel::Debug => "debug",
                LogLevel::Info => "info",
                LogLevel::Warn => "warn",
                LogLevel::Error => "error",
            }
        )
    }
}

impl FromStr for LogLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" | "trace" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(anyhow::anyhow!("Invalid log level: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    /// The `component` field of the event if present, else its target.
    pub component: String,
    pub message: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub fields: BTreeMap<String, String>,
}

/// Bounded, shareable ring of captured log events.
///
/// Implements [`Layer`] so it can sit next to the console formatter. Oldest
/// entries are evicted once `capacity` is reached.
#[derive(Clone)]
pub struct LogBuffer {
    entries: Arc<Mutex<VecDeque<LogEntry>>>,
    capacity: usize,
    min_level: LogLevel,
}

impl LogBuffer {
    pub fn new(capacity: usize, min_level: LogLevel) -> Self {
        Self {
            entries: Arc::new(Mutex::new(VecDeque::with_capacity(capacity.min(64)))),
            capacity: capacity.max(1),
            min_level,
        }
    }

    pub fn with_level(min_level: LogLevel) -> Self {
        Self::new(DEFAULT_CAPACITY, min_level)
    }

    pub fn min_level(&self) -> LogLevel {
        self.min_level
    }

    /// Entries at or above `min_level`, oldest first.
    pub fn entries(&self, min_level: Option<LogLevel>) -> Vec<LogEntry> {
        let threshold = min_level.unwrap_or(LogLevel::Debug);
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries
            .iter()
            .filter(|entry| entry.level >= threshold)
            .cloned()
            .collect()
    }

    pub fn push(&self, entry: LogEntry) {
        if entry.level < self.min_level {
            return;
        }
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }
}

impl<S: Subscriber> Layer<S> for LogBuffer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = LogLevel::from(metadata.level());
        if level < self.min_level {
            return;
        }

        let mut visitor = EntryVisitor::default();
        event.record(&mut visitor);

        let component = visitor
            .fields
            .remove("component")
            .unwrap_or_else(|| metadata.target().to_string());

        self.push(LogEntry {
            timestamp: Utc::now(),
            level,
            component,
            message: visitor.message.unwrap_or_default(),
            fields: visitor.fields,
        });
    }
}

#[derive(Default)]
struct EntryVisitor {
    message: Option<String>,
    fields: BTreeMap<String, String>,
}

impl Visit for EntryVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_string());
        } else {
            self.fields
                .insert(field.name().to_string(), value.to_string());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        } else {
            self.fields
                .insert(field.name().to_string(), format!("{value:?}"));
        }
    }
}

/// Installs the console formatter and the log buffer as the global subscriber.
///
/// Console output is off unless `verbose` or `RUST_LOG` says otherwise; the
/// buffer captures this crate's events at its own level regardless.
pub fn init_logging(verbose: bool, buffer: LogBuffer) {
    let level = if verbose { "debug" } else { "off" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let buffer_filter =
        Targets::new().with_target("ratehub", LevelFilter::from(buffer.min_level()));

    tracing_subscriber::registry()
        .with(fmt::layer().pretty().without_time().with_filter(env_filter))
        .with(buffer.with_filter(buffer_filter))
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::{debug, error, info, warn};

    fn capture(buffer: &LogBuffer, f: impl FnOnce()) {
        let subscriber = tracing_subscriber::registry().with(buffer.clone());
        tracing::subscriber::with_default(subscriber, f);
    }

    #[test]
    fn test_level_ordering() {
        assert!(LogLevel::Debug < LogLevel::Info);
        assert!(LogLevel::Warn < LogLevel::Error);
        assert_eq!("WARNING".parse::<LogLevel>().unwrap(), LogLevel::Warn);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn test_buffer_captures_message_and_fields() {
        let buffer = LogBuffer::new(10, LogLevel::Debug);
        capture(&buffer, || {
            warn!(component = "orchestrator", source = %"cbe", "Fetch failed");
        });

        let entries = buffer.entries(None);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, LogLevel::Warn);
        assert_eq!(entries[0].component, "orchestrator");
        assert_eq!(entries[0].message, "Fetch failed");
        assert_eq!(entries[0].fields.get("source").map(String::as_str), Some("cbe"));
    }

    #[test]
    fn test_component_defaults_to_target() {
        let buffer = LogBuffer::new(10, LogLevel::Debug);
        capture(&buffer, || info!("hello"));

        assert_eq!(buffer.entries(None)[0].component, module_path!());
    }

    #[test]
    fn test_entries_filtered_by_min_level() {
        let buffer = LogBuffer::new(10, LogLevel::Debug);
        capture(&buffer, || {
            debug!("one");
            info!("two");
            warn!("three");
            error!("four");
        });

        let messages: Vec<String> = buffer
            .entries(Some(LogLevel::Warn))
            .into_iter()
            .map(|e| e.message)
            .collect();
        assert_eq!(messages, vec!["three", "four"]);
        assert_eq!(buffer.entries(None).len(), 4);
    }

    #[test]
    fn test_buffer_level_drops_verbose_events() {
        let buffer = LogBuffer::new(10, LogLevel::Info);
        capture(&buffer, || {
            debug!("dropped");
            info!("kept");
        });

        let entries = buffer.entries(None);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].message, "kept");
    }

    #[test]
    fn test_buffer_evicts_oldest() {
        let buffer = LogBuffer::new(2, LogLevel::Debug);
        capture(&buffer, || {
            info!("one");
            info!("two");
            info!("three");
        });

        let messages: Vec<String> = buffer.entries(None).into_iter().map(|e| e.message).collect();
        assert_eq!(messages, vec!["two", "three"]);
    }
}
