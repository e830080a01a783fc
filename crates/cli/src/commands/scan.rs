//! Scan trigger command

use anyhow::Result;

use crate::client::{ApiClient, ScanAccepted, ScanBody};
use crate::output::{print_success, print_warning, OutputFormat};

/// Queue an analysis run on the engine
pub async fn trigger_scan(client: &ApiClient, no_dry_run: bool, format: OutputFormat) -> Result<()> {
    let body = ScanBody {
        dry_run: no_dry_run.then_some(false),
    };

    let response: ScanAccepted = client.post("api/v1/scan", &body).await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&response)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            print_success(&format!("Scan {}", response.status));
            if no_dry_run {
                print_warning("Dry-run disabled: allowed actions will be executed");
            }
            println!("Fetch results with: cco get report");
        }
    }

    Ok(())
}
