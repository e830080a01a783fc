//! Cloud Cost Optimizer CLI
//!
//! A command-line tool for triggering analysis runs, querying
//! recommendations and reports, and viewing cost breakdowns.

mod client;
mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{costs, debug, recommendations, scan};

/// Cloud Cost Optimizer CLI
#[derive(Parser)]
#[command(name = "cco")]
#[command(author, version, about = "CLI for the Cloud Cost Optimizer", long_about = None)]
pub struct Cli {
    /// Engine API endpoint URL (can also be set via CCO_API_URL env var)
    #[arg(long, env = "CCO_API_URL", default_value = "http://localhost:8080")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Get recommendations and run reports
    #[command(subcommand)]
    Get(GetCommands),

    /// Trigger an analysis run
    Scan {
        /// Execute allowed actions instead of reporting only
        #[arg(long)]
        no_dry_run: bool,
    },

    /// View cost analysis
    #[command(subcommand)]
    Costs(CostsCommands),

    /// Debug and troubleshooting commands
    #[command(subcommand)]
    Debug(DebugCommands),
}

#[derive(Subcommand)]
pub enum GetCommands {
    /// Get recommendations from the latest run
    Recommendations {
        /// Filter by region
        #[arg(long, short)]
        region: Option<String>,

        /// Filter by resource type (ec2-instance, ebs-volume, elastic-ip, ebs-snapshot)
        #[arg(long, short = 't')]
        resource_type: Option<String>,

        /// Filter by classification label (idle, unattached, expired, ...)
        #[arg(long, short)]
        label: Option<String>,

        /// Filter by policy verdict (allowed, blocked, needs-review)
        #[arg(long)]
        verdict: Option<String>,
    },

    /// Get the full latest run report
    Report,
}

#[derive(Subcommand)]
pub enum CostsCommands {
    /// Show cost breakdown by dimension
    Show {
        /// Number of days to analyze
        #[arg(long, default_value_t = 30)]
        days: u32,

        /// Dimension to group costs by (service, region, usage-type, instance-type)
        #[arg(long, default_value = "service")]
        group_by: String,

        /// Number of top items to display
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
}

#[derive(Subcommand)]
pub enum DebugCommands {
    /// Show engine component health
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize client
    let client = client::ApiClient::new(&cli.api_url)?;

    // Execute command
    match cli.command {
        Commands::Get(get_cmd) => match get_cmd {
            GetCommands::Recommendations {
                region,
                resource_type,
                label,
                verdict,
            } => {
                recommendations::get_recommendations(
                    &client,
                    region,
                    resource_type,
                    label,
                    verdict,
                    cli.format,
                )
                .await?;
            }
            GetCommands::Report => {
                recommendations::get_report(&client, cli.format).await?;
            }
        },
        Commands::Scan { no_dry_run } => {
            scan::trigger_scan(&client, no_dry_run, cli.format).await?;
        }
        Commands::Costs(costs_cmd) => match costs_cmd {
            CostsCommands::Show {
                days,
                group_by,
                top,
            } => {
                costs::show_costs(&client, days, &group_by, top, cli.format).await?;
            }
        },
        Commands::Debug(debug_cmd) => match debug_cmd {
            DebugCommands::Status => {
                debug::show_status(&client, cli.format).await?;
            }
        },
    }

    Ok(())
}
