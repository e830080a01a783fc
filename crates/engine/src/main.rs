//! Cost Engine - cloud cost optimization daemon
//!
//! Runs scheduled analysis passes over the region's inventory, serves the
//! report/recommendation API, and exposes health and metrics endpoints.

use anyhow::Result;
use engine_lib::{
    gateway::GatewayClient,
    health::{components, HealthRegistry},
    notify::WebhookNotifier,
    observability::{EngineMetrics, StructuredLogger},
    report::{FsReportSink, ReportStore},
    schedule::{AnalysisLoop, LoopConfig},
    AnalysisRunner,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting cost-engine");

    // Configuration errors are fatal before any resource is touched
    let config = config::EngineConfig::load()?;
    config.run.validate()?;
    info!(region = %config.region, gateway = %config.gateway_url, "Engine configured");

    // Initialize health registry
    let health_registry = HealthRegistry::new();
    health_registry.register(components::DATA_SOURCE).await;
    health_registry.register(components::EXECUTOR).await;
    health_registry.register(components::REPORT_SINK).await;
    health_registry.register(components::SCHEDULER).await;

    // Initialize metrics and structured logger
    let metrics = EngineMetrics::new();
    let logger = StructuredLogger::new(&config.region);
    logger.log_startup(ENGINE_VERSION);

    // The gateway client serves both the read and the write side
    let gateway = Arc::new(GatewayClient::new(
        &config.gateway_url,
        Duration::from_secs(config.run.source_timeout_secs),
    )?);
    let report_sink = Arc::new(FsReportSink::new(&config.report_dir));

    let mut runner = AnalysisRunner::new(
        gateway.clone(),
        gateway.clone(),
        report_sink,
        &config.region,
    );
    if let Some(url) = &config.webhook_url {
        let notifier = WebhookNotifier::new(url, Duration::from_secs(10))?;
        runner = runner.with_notifier(Arc::new(notifier));
    }

    let store = ReportStore::new();
    let (analysis_loop, scan_tx) = AnalysisLoop::new(
        Arc::new(runner),
        config.run.clone(),
        LoopConfig {
            interval: Duration::from_secs(config.scan_interval_secs),
            jitter: Duration::from_secs(config.scan_jitter_secs),
        },
        store.clone(),
    );

    // Create shared application state
    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        metrics.clone(),
        store,
        scan_tx,
        gateway,
    ));

    // Mark engine as ready after initialization
    health_registry.set_ready(true).await;

    let (shutdown_tx, shutdown_rx) = tokio::sync::broadcast::channel(1);
    let loop_handle = tokio::spawn(analysis_loop.run(shutdown_rx));
    let api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    logger.log_shutdown("SIGINT received");
    info!("Shutting down");

    let _ = shutdown_tx.send(());
    let _ = loop_handle.await;
    api_handle.abort();

    Ok(())
}
