pub mod cli;
pub mod core;
pub mod providers;

pub use crate::cli::CommandStatus;
use crate::core::Aggregator;
use crate::core::config::AppConfig;
use crate::core::log::{LogBuffer, LogLevel};
use anyhow::Result;
use tracing::{debug, info};

pub enum AppCommand {
    Assets { ids: Vec<String>, json: bool },
    Health { json: bool },
    Logs { level: Option<LogLevel> },
    Watch { ids: Vec<String> },
}

/// Builds the aggregator over the enabled sources of `config`.
pub fn build_aggregator(config: &AppConfig, logs: LogBuffer) -> Result<Aggregator> {
    let sources = providers::build_sources(config)?;
    Ok(Aggregator::new(config, sources, logs))
}

pub fn load_config(config_path: Option<&str>) -> Result<AppConfig> {
    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");
    Ok(config)
}

pub async fn run_command(
    command: AppCommand,
    config: &AppConfig,
    logs: LogBuffer,
) -> Result<CommandStatus> {
    info!("ratehub starting...");
    let aggregator = build_aggregator(config, logs)?;

    match command {
        AppCommand::Assets { ids, json } => cli::assets::run(&aggregator, &ids, json).await,
        AppCommand::Health { json } => cli::health::run(&aggregator, json).await,
        AppCommand::Logs { level } => cli::logs::run(&aggregator, level).await,
        AppCommand::Watch { ids } => {
            cli::watch::run(&aggregator, &ids, config.cache_timeout()).await
        }
    }
}
