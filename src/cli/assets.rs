use super::{CommandStatus, ui};
use crate::core::{Aggregator, Asset, AssetId};
use anyhow::Result;
use comfy_table::Cell;
use serde_json::json;
use std::collections::BTreeMap;

/// Renders assets as one row per quoted rate type.
pub fn display_as_table(assets: &BTreeMap<AssetId, Asset>) -> String {
    let mut table = ui::new_styled_table();

    table.set_header(vec![
        ui::header_cell("Asset"),
        ui::header_cell("Name"),
        ui::header_cell("Rate"),
        ui::header_cell("Buying"),
        ui::header_cell("Selling"),
        ui::header_cell("Mid"),
        ui::header_cell("Unit"),
        ui::header_cell("Source"),
    ]);

    for asset in assets.values() {
        for (rate_type, rate) in &asset.rates {
            table.add_row(vec![
                Cell::new(&asset.identifier),
                Cell::new(&asset.name),
                Cell::new(rate_type.to_string()),
                ui::number_cell(rate.buying),
                ui::number_cell(rate.selling),
                ui::number_cell(rate.mid_rate),
                Cell::new(&rate.unit),
                Cell::new(&asset.source),
            ]);
        }
    }

    table.to_string()
}

/// Looks up the requested assets and prints them as a table or a JSON envelope.
pub async fn run(aggregator: &Aggregator, ids: &[AssetId], as_json: bool) -> Result<CommandStatus> {
    let pb = (!as_json).then(|| ui::new_spinner("Fetching rates..."));
    let result = aggregator.assets(ids).await;
    if let Some(pb) = pb {
        pb.finish_and_clear();
    }

    match result {
        Ok(assets) => {
            if as_json {
                println!("{}", json!({ "success": true, "data": assets }));
            } else if assets.is_empty() {
                println!(
                    "{}",
                    ui::style_text(
                        "None of the requested assets are available",
                        ui::StyleType::Subtle
                    )
                );
            } else {
                println!("{}", display_as_table(&assets));
            }
            Ok(CommandStatus::Success)
        }
        Err(e) => {
            if as_json {
                println!("{}", json!({ "success": false, "message": e.to_string() }));
            } else {
                println!("{}", ui::style_text(&e.to_string(), ui::StyleType::Error));
            }
            Ok(CommandStatus::Failure)
        }
    }
}
