use super::{CommandStatus, assets, ui};
use crate::core::{Aggregator, AssetId};
use anyhow::{Context, Result};
use std::time::Duration;
use tracing::{info, warn};

/// Prints the requested assets every `refresh` until Ctrl-C, with periodic
/// health checks running in the background.
pub async fn run(
    aggregator: &Aggregator,
    ids: &[AssetId],
    refresh: Duration,
) -> Result<CommandStatus> {
    let health_checks = aggregator.start_health_checks();
    let mut ticker = tokio::time::interval(refresh);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match aggregator.assets(ids).await {
                    Ok(found) => println!("{}", assets::display_as_table(&found)),
                    Err(e) => {
                        warn!(error = %e, "Refresh failed");
                        println!("{}", ui::style_text(&e.to_string(), ui::StyleType::Error));
                    }
                }
                let health = aggregator.service_health().await;
                println!(
                    "{}",
                    ui::style_text(
                        &format!("Service status: {}", health.status),
                        ui::StyleType::Label
                    )
                );
                ui::print_separator();
            }
            signal = tokio::signal::ctrl_c() => {
                signal.context("Failed to listen for shutdown signal")?;
                info!("Shutdown requested");
                break;
            }
        }
    }

    health_checks.stop().await;
    Ok(CommandStatus::Success)
}
