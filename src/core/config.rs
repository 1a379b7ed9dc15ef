use super::log::LogLevel;
use anyhow::{Context, Result, bail};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

pub const CACHE_TIMEOUT_ENV: &str = "RATEHUB_CACHE_TIMEOUT_MS";
pub const HEALTH_CHECK_INTERVAL_ENV: &str = "RATEHUB_HEALTH_CHECK_INTERVAL_MS";
pub const LOG_LEVEL_ENV: &str = "RATEHUB_LOG_LEVEL";

#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    ParallelMarket,
    Official,
    GoldScrape,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct SourceConfig {
    pub kind: SourceKind,
    pub name: String,
    pub base_url: String,
    /// Data path appended to `base_url`; each kind has its own default.
    pub path: Option<String>,
    #[serde(default = "default_source_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

impl SourceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

fn default_source_timeout_ms() -> u64 {
    5_000
}

fn default_enabled() -> bool {
    true
}

fn default_cache_timeout_ms() -> u64 {
    5 * 60 * 1000
}

fn default_health_check_interval_ms() -> u64 {
    60 * 1000
}

fn default_log_level() -> LogLevel {
    LogLevel::Info
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default = "default_cache_timeout_ms")]
    pub cache_timeout_ms: u64,
    #[serde(default = "default_health_check_interval_ms")]
    pub health_check_interval_ms: u64,
    #[serde(default = "default_log_level")]
    pub log_level: LogLevel,
    #[serde(default)]
    pub sources: Vec<SourceConfig>,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            cache_timeout_ms: default_cache_timeout_ms(),
            health_check_interval_ms: default_health_check_interval_ms(),
            log_level: default_log_level(),
            sources: Vec::new(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("in", "codito", "ratehub")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let mut config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        debug!("Successfully loaded config");
        Ok(config)
    }

    /// Applies `RATEHUB_*` overrides looked up through `lookup`.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(value) = lookup(CACHE_TIMEOUT_ENV) {
            self.cache_timeout_ms = value
                .parse()
                .with_context(|| format!("Invalid {CACHE_TIMEOUT_ENV}: {value}"))?;
        }
        if let Some(value) = lookup(HEALTH_CHECK_INTERVAL_ENV) {
            self.health_check_interval_ms = value
                .parse()
                .with_context(|| format!("Invalid {HEALTH_CHECK_INTERVAL_ENV}: {value}"))?;
        }
        if let Some(value) = lookup(LOG_LEVEL_ENV) {
            self.log_level = value
                .parse()
                .with_context(|| format!("Invalid {LOG_LEVEL_ENV}: {value}"))?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.cache_timeout_ms == 0 {
            bail!("cache_timeout_ms must be greater than zero");
        }
        if self.health_check_interval_ms == 0 {
            bail!("health_check_interval_ms must be greater than zero");
        }

        let mut names = HashSet::new();
        for source in self.active_sources() {
            if !names.insert(source.name.as_str()) {
                bail!("Duplicate source name: {}", source.name);
            }
        }
        Ok(())
    }

    /// Enabled sources in file order.
    pub fn active_sources(&self) -> impl Iterator<Item = &SourceConfig> {
        self.sources.iter().filter(|s| s.enabled)
    }

    pub fn cache_timeout(&self) -> Duration {
        Duration::from_millis(self.cache_timeout_ms)
    }

    pub fn health_check_interval(&self) -> Duration {
        Duration::from_millis(self.health_check_interval_ms)
    }
}
