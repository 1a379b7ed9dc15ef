use super::{CommandStatus, ui};
use crate::core::Aggregator;
use crate::core::log::{LogEntry, LogLevel};
use anyhow::Result;
use comfy_table::Cell;

pub fn display_as_table(entries: &[LogEntry]) -> String {
    let mut table = ui::new_styled_table();

    table.set_header(vec![
        ui::header_cell("Time"),
        ui::header_cell("Level"),
        ui::header_cell("Component"),
        ui::header_cell("Message"),
    ]);

    for entry in entries {
        let details = entry
            .fields
            .iter()
            .map(|(key, value)| format!("{key}={value}"))
            .collect::<Vec<_>>()
            .join(" ");
        let message = if details.is_empty() {
            entry.message.clone()
        } else {
            format!("{} {}", entry.message, ui::style_text(&details, ui::StyleType::Subtle))
        };

        table.add_row(vec![
            Cell::new(entry.timestamp.format("%H:%M:%S%.3f").to_string()),
            ui::level_cell(entry.level),
            Cell::new(&entry.component),
            Cell::new(message),
        ]);
    }

    table.to_string()
}

/// Runs one aggregation cycle and prints the log entries it produced.
pub async fn run(aggregator: &Aggregator, min_level: Option<LogLevel>) -> Result<CommandStatus> {
    let pb = ui::new_spinner("Fetching rates...");
    let result = aggregator.dataset().await;
    pb.finish_and_clear();

    let entries = aggregator.logs(min_level);
    if entries.is_empty() {
        println!("{}", ui::style_text("No log entries captured", ui::StyleType::Subtle));
    } else {
        println!("{}", display_as_table(&entries));
    }

    Ok(if result.is_ok() {
        CommandStatus::Success
    } else {
        CommandStatus::Failure
    })
}
