//! Engine configuration

use anyhow::{Context, Result};
use engine_lib::RunConfig;
use serde::Deserialize;

/// Daemon configuration, loaded from ENGINE_* environment variables.
/// Nested run-config fields use a double underscore, e.g.
/// `ENGINE_RUN__DRY_RUN=false`.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Region this engine instance analyzes
    #[serde(default = "default_region")]
    pub region: String,

    /// API server port for health/metrics/report endpoints
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Cloud gateway base URL
    #[serde(default = "default_gateway_url")]
    pub gateway_url: String,

    /// Seconds between scheduled analysis runs
    #[serde(default = "default_scan_interval")]
    pub scan_interval_secs: u64,

    /// Maximum jitter added to the scan interval
    #[serde(default = "default_scan_jitter")]
    pub scan_jitter_secs: u64,

    /// Directory run reports are written to
    #[serde(default = "default_report_dir")]
    pub report_dir: String,

    /// Webhook for run summaries; notifications are skipped when unset
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Analysis thresholds and policy knobs
    #[serde(default)]
    pub run: RunConfig,
}

fn default_region() -> String {
    std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_gateway_url() -> String {
    "http://cloud-gateway:9090".to_string()
}

fn default_scan_interval() -> u64 {
    6 * 60 * 60
}

fn default_scan_jitter() -> u64 {
    5 * 60
}

fn default_report_dir() -> String {
    "/var/lib/cost-engine/reports".to_string()
}

impl EngineConfig {
    /// Load configuration from the environment. Invalid values are fatal:
    /// the engine must not start with a half-understood configuration.
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("ENGINE").separator("__"))
            .build()
            .context("Failed to read engine configuration")?;

        config
            .try_deserialize()
            .context("Invalid engine configuration")
    }
}
