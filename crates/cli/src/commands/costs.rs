//! Cost analysis commands

use anyhow::Result;
use tabled::Tabled;

use crate::client::{ApiClient, CostSummary};
use crate::output::{format_currency, print_warning, OutputFormat};

/// Row for the cost breakdown table
#[derive(Tabled)]
struct CostRow {
    #[tabled(rename = "Rank")]
    rank: usize,
    #[tabled(rename = "Item")]
    item: String,
    #[tabled(rename = "Cost")]
    cost: String,
    #[tabled(rename = "Share")]
    share: String,
}

/// Show the cost breakdown for the last N days
pub async fn show_costs(
    client: &ApiClient,
    days: u32,
    group_by: &str,
    top: usize,
    format: OutputFormat,
) -> Result<()> {
    let path = format!("api/v1/costs?days={}&group_by={}", days, group_by);
    let summary: CostSummary = client.get(&path).await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&summary)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            if summary.lines.is_empty() {
                print_warning("No cost data for the requested period");
                return Ok(());
            }

            let rows: Vec<CostRow> = summary
                .lines
                .iter()
                .take(top)
                .enumerate()
                .map(|(i, line)| CostRow {
                    rank: i + 1,
                    item: line.dimension_value.clone(),
                    cost: format_currency(line.cost, &summary.unit),
                    share: format!("{:.2}%", line.percentage),
                })
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
            println!(
                "\nTotal ({}d, by {}): {}",
                days,
                summary.dimension,
                format_currency(summary.total_cost, &summary.unit)
            );
            if !summary.complete {
                print_warning("Cost listing was truncated by the provider");
            }
        }
    }

    Ok(())
}
