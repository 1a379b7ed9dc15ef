use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use ratehub::core::log::{LogBuffer, LogLevel, init_logging};
use std::process::ExitCode;

#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to optional configuration file
    #[arg(short, long, global = true)]
    config_path: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create default configuration
    Setup,
    /// Show merged rates for the given assets
    Assets {
        /// Comma separated asset ids, e.g. USD_EGP,GOLD24K_EGP
        #[arg(short, long, value_delimiter = ',', required = true)]
        ids: Vec<String>,
        /// Print a JSON envelope instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Probe all sources and report their health
    Health {
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Run one aggregation cycle and print the captured logs
    Logs {
        /// Minimum level to show (debug, info, warn, error)
        #[arg(short, long)]
        level: Option<LogLevel>,
    },
    /// Keep refreshing the given assets until interrupted
    Watch {
        /// Comma separated asset ids
        #[arg(short, long, value_delimiter = ',', required = true)]
        ids: Vec<String>,
    },
}

impl From<Commands> for ratehub::AppCommand {
    fn from(cmd: Commands) -> ratehub::AppCommand {
        match cmd {
            Commands::Assets { ids, json } => ratehub::AppCommand::Assets { ids, json },
            Commands::Health { json } => ratehub::AppCommand::Health { json },
            Commands::Logs { level } => ratehub::AppCommand::Logs { level },
            Commands::Watch { ids } => ratehub::AppCommand::Watch { ids },
            Commands::Setup => unreachable!("Setup command should be handled separately"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let command = match cli.command {
        Some(Commands::Setup) => {
            init_logging(cli.verbose, LogBuffer::with_level(LogLevel::Info));
            ratehub::cli::setup::setup()?;
            return Ok(ExitCode::SUCCESS);
        }
        Some(cmd) => cmd,
        None => {
            Cli::command().print_help()?;
            return Ok(ExitCode::SUCCESS);
        }
    };

    let config = ratehub::load_config(cli.config_path.as_deref())?;
    let logs = LogBuffer::with_level(config.log_level);
    init_logging(cli.verbose, logs.clone());

    let result = ratehub::run_command(command.into(), &config, logs).await;

    match result {
        Ok(ratehub::CommandStatus::Success) => Ok(ExitCode::SUCCESS),
        Ok(ratehub::CommandStatus::Failure) => Ok(ExitCode::FAILURE),
        Err(e) => {
            tracing::error!(error = %e, "Application failed");
            Err(e)
        }
    }
}
