use super::{CommandStatus, ui};
use crate::core::{Aggregator, HealthStatus, ServiceHealth};
use anyhow::Result;
use chrono::{TimeZone, Utc};
use comfy_table::Cell;

impl ServiceHealth {
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();

        table.set_header(vec![
            ui::header_cell("Source"),
            ui::header_cell("Status"),
            ui::header_cell("Last check"),
            ui::header_cell("Latency"),
            ui::header_cell("Message"),
        ]);

        for source in &self.sources {
            let last_check = (source.last_check > 0)
                .then(|| Utc.timestamp_millis_opt(source.last_check).single())
                .flatten();

            table.add_row(vec![
                Cell::new(&source.source),
                ui::status_cell(source.status),
                ui::format_optional_cell(last_check, |ts| {
                    ts.format("%Y-%m-%d %H:%M:%S UTC").to_string()
                }),
                Cell::new(format!("{}ms", source.latency_ms)),
                ui::format_optional_cell(source.message.as_deref(), str::to_string),
            ]);
        }

        let status = console::style(self.status.to_string()).bold();
        format!(
            "{}\n\n{}\n\nOverall: {}",
            ui::style_text("Source health", ui::StyleType::Title),
            table,
            match self.status {
                HealthStatus::Healthy => status.green(),
                HealthStatus::Degraded => status.yellow(),
                HealthStatus::Failed => status.red(),
            }
        )
    }
}

/// Probes every source and reports their health. Anything but healthy is a failure.
pub async fn run(aggregator: &Aggregator, as_json: bool) -> Result<CommandStatus> {
    let pb = (!as_json).then(|| ui::new_spinner("Probing sources..."));
    aggregator.orchestrator().run_health_checks().await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    let health = aggregator.service_health().await;
    if as_json {
        println!("{}", serde_json::to_string(&health)?);
    } else {
        println!("{}", health.display_as_table());
    }

    Ok(match health.status {
        HealthStatus::Healthy => CommandStatus::Success,
        _ => CommandStatus::Failure,
    })
}
