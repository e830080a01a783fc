//! Output formatting utilities

use crate::client::Savings;
use clap::ValueEnum;
use colored::Colorize;

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Format currency
pub fn format_currency(amount: f64, currency: &str) -> String {
    match currency {
        "USD" => format!("${:.2}", amount),
        "EUR" => format!("€{:.2}", amount),
        "GBP" => format!("£{:.2}", amount),
        _ => format!("{:.2} {}", amount, currency),
    }
}

/// Format confidence as percentage
pub fn format_confidence(confidence: f32) -> String {
    format!("{:.0}%", confidence * 100.0)
}

/// Format an estimated monthly savings cell
pub fn format_savings(savings: Option<&Savings>) -> String {
    match savings {
        Some(Savings::Known { monthly_usd }) => format!("${:.2}/mo", monthly_usd),
        Some(Savings::Unknown) => "unknown".to_string(),
        None => "-".to_string(),
    }
}

/// Color a policy verdict
pub fn color_verdict(verdict: &str) -> String {
    match verdict {
        "allowed" => verdict.green().to_string(),
        "blocked" => verdict.red().to_string(),
        "needs_review" => "needs-review".yellow().to_string(),
        _ => verdict.to_string(),
    }
}

/// Color an execution outcome
pub fn color_outcome(outcome: &str) -> String {
    match outcome {
        "succeeded" => outcome.green().to_string(),
        "failed" => outcome.red().to_string(),
        "skipped" => outcome.yellow().to_string(),
        _ => outcome.to_string(),
    }
}

/// Color a classification label
pub fn color_label(label: &str) -> String {
    match label {
        "compliant" => label.green().to_string(),
        "idle" | "unattached" | "expired" => label.red().to_string(),
        "over_provisioned" | "untagged" => label.yellow().to_string(),
        _ => label.to_string(),
    }
}

/// Color component health status
pub fn color_status(status: &str) -> String {
    match status {
        "healthy" => status.green().to_string(),
        "degraded" => status.yellow().to_string(),
        "unhealthy" => status.red().to_string(),
        _ => status.to_string(),
    }
}

/// Format a unix timestamp for display
pub fn format_timestamp(timestamp: i64) -> String {
    chrono::DateTime::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}
