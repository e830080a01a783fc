//! Recommendation and report commands

use anyhow::Result;
use tabled::Tabled;

use crate::client::{ApiClient, RecommendationList, ReportRow, RunReport};
use crate::output::{
    color_label, color_outcome, color_verdict, format_confidence, format_currency, format_savings,
    format_timestamp, print_info, print_warning, OutputFormat,
};

/// Row for the recommendations table
#[derive(Tabled)]
struct RecommendationRow {
    #[tabled(rename = "Resource")]
    resource_id: String,
    #[tabled(rename = "Type")]
    resource_type: String,
    #[tabled(rename = "Classification")]
    classification: String,
    #[tabled(rename = "Action")]
    action: String,
    #[tabled(rename = "Est. Savings")]
    savings: String,
    #[tabled(rename = "Confidence")]
    confidence: String,
    #[tabled(rename = "Verdict")]
    verdict: String,
    #[tabled(rename = "Outcome")]
    outcome: String,
}

impl RecommendationRow {
    fn from_report_row(row: &ReportRow) -> Self {
        Self {
            resource_id: row.resource_id.clone(),
            resource_type: row.resource_type.replace('_', "-"),
            classification: row
                .classification
                .as_deref()
                .map(color_label)
                .unwrap_or_else(|| "-".to_string()),
            action: row.action.clone().unwrap_or_else(|| "-".to_string()),
            savings: format_savings(row.estimated_savings.as_ref()),
            confidence: format_confidence(row.confidence),
            verdict: row
                .verdict
                .as_deref()
                .map(color_verdict)
                .unwrap_or_else(|| "-".to_string()),
            outcome: row
                .outcome
                .as_deref()
                .map(color_outcome)
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

/// Get recommendations from the latest run with optional filters
pub async fn get_recommendations(
    client: &ApiClient,
    region: Option<String>,
    resource_type: Option<String>,
    label: Option<String>,
    verdict: Option<String>,
    format: OutputFormat,
) -> Result<()> {
    let result: RecommendationList = client.get("api/v1/recommendations").await?;

    // Server returns everything; filters are applied client-side
    let normalize = |s: &str| s.replace('-', "_");
    let filtered: Vec<ReportRow> = result
        .recommendations
        .into_iter()
        .filter(|r| region.as_ref().map(|g| &r.region == g).unwrap_or(true))
        .filter(|r| {
            resource_type
                .as_ref()
                .map(|t| r.resource_type == normalize(t))
                .unwrap_or(true)
        })
        .filter(|r| {
            label
                .as_ref()
                .map(|l| r.classification.as_deref() == Some(normalize(l).as_str()))
                .unwrap_or(true)
        })
        .filter(|r| {
            verdict
                .as_ref()
                .map(|v| r.verdict.as_deref() == Some(normalize(v).as_str()))
                .unwrap_or(true)
        })
        .collect();

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&filtered)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            if filtered.is_empty() {
                print_warning("No recommendations found");
                return Ok(());
            }

            let rows: Vec<RecommendationRow> = filtered
                .iter()
                .map(RecommendationRow::from_report_row)
                .collect();

            let table = tabled::Table::new(rows)
                .with(tabled::settings::Style::rounded())
                .to_string();
            println!("{}", table);
            println!("\nTotal: {} recommendations ({})", filtered.len(), result.run_id);
        }
    }

    Ok(())
}

/// Get the full latest run report
pub async fn get_report(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let report: RunReport = client.get("api/v1/report").await?;

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&report)?;
            println!("{}", json);
        }
        OutputFormat::Table => {
            println!("Run:       {}", report.run_id);
            println!("Region:    {}", report.region);
            println!("Started:   {}", format_timestamp(report.started_at));
            println!("Completed: {}", format_timestamp(report.completed_at));
            if report.dry_run {
                print_info("Dry-run: recommendations were reported but not executed");
            }
            if report.partial {
                print_warning("Partial run: some resources or scopes were skipped");
            }

            println!("\nResources scanned: {}", report.summary.resources_scanned);
            let mut labels: Vec<_> = report.summary.counts_by_label.iter().collect();
            labels.sort();
            for (label, count) in labels {
                println!("  {:<18} {}", label.replace('_', "-"), count);
            }
            println!(
                "\nEstimated savings: {}/month ({} recommendations, {} without estimate)",
                format_currency(report.summary.total_estimated_savings_usd, "USD"),
                report.summary.recommendations,
                report.summary.savings_unknown,
            );
            println!(
                "Verdicts: {} allowed / {} blocked / {} needs-review",
                report.summary.allowed, report.summary.blocked, report.summary.needs_review
            );
            println!(
                "Outcomes: {} succeeded / {} failed / {} skipped",
                report.summary.succeeded, report.summary.failed, report.summary.skipped_actions
            );

            if !report.skipped.is_empty() {
                println!("\nSkipped scopes:");
                for skipped in &report.skipped {
                    println!("  {} - {}", skipped.scope, skipped.reason);
                }
            }

            let rows: Vec<RecommendationRow> = report
                .rows
                .iter()
                .map(RecommendationRow::from_report_row)
                .collect();
            if !rows.is_empty() {
                let table = tabled::Table::new(rows)
                    .with(tabled::settings::Style::rounded())
                    .to_string();
                println!("\n{}", table);
            }
        }
    }

    Ok(())
}
