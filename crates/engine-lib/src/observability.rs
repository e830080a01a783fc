//! Observability infrastructure for the cost engine
//!
//! Prometheus metrics for run latency, scan volume, and savings, plus a
//! structured logger for significant run events.

use crate::report::RunReport;
use prometheus::{
    register_gauge, register_histogram, register_int_gauge, register_int_gauge_vec, Gauge,
    Histogram, IntGauge, IntGaugeVec,
};
use std::sync::OnceLock;
use tracing::info;

/// Histogram buckets for full analysis runs (in seconds)
const RUN_LATENCY_BUCKETS: &[f64] = &[0.1, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0];

/// Histogram buckets for individual source queries (in seconds)
const SOURCE_LATENCY_BUCKETS: &[f64] = &[0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<EngineMetricsInner> = OnceLock::new();

struct EngineMetricsInner {
    run_latency_seconds: Histogram,
    source_latency_seconds: Histogram,
    resources_scanned: IntGauge,
    classifications: IntGaugeVec,
    recommendations: IntGauge,
    actions_succeeded: IntGauge,
    actions_failed: IntGauge,
    estimated_savings_usd: Gauge,
    runs_total: IntGauge,
    runs_partial: IntGauge,
}

impl EngineMetricsInner {
    fn new() -> Self {
        Self {
            run_latency_seconds: register_histogram!(
                "cost_engine_run_latency_seconds",
                "Wall-clock time of a full analysis run",
                RUN_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register run_latency_seconds"),

            source_latency_seconds: register_histogram!(
                "cost_engine_source_latency_seconds",
                "Time spent on individual data source queries",
                SOURCE_LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register source_latency_seconds"),

            resources_scanned: register_int_gauge!(
                "cost_engine_resources_scanned",
                "Resources inventoried in the latest run"
            )
            .expect("Failed to register resources_scanned"),

            classifications: register_int_gauge_vec!(
                "cost_engine_classifications",
                "Classifications in the latest run by label",
                &["label"]
            )
            .expect("Failed to register classifications"),

            recommendations: register_int_gauge!(
                "cost_engine_recommendations",
                "Recommendations produced by the latest run"
            )
            .expect("Failed to register recommendations"),

            actions_succeeded: register_int_gauge!(
                "cost_engine_actions_succeeded",
                "Remediation actions that succeeded in the latest run"
            )
            .expect("Failed to register actions_succeeded"),

            actions_failed: register_int_gauge!(
                "cost_engine_actions_failed",
                "Remediation actions rejected by the provider in the latest run"
            )
            .expect("Failed to register actions_failed"),

            estimated_savings_usd: register_gauge!(
                "cost_engine_estimated_savings_usd",
                "Total estimated monthly savings from the latest run"
            )
            .expect("Failed to register estimated_savings_usd"),

            runs_total: register_int_gauge!(
                "cost_engine_runs_total",
                "Total analysis runs completed"
            )
            .expect("Failed to register runs_total"),

            runs_partial: register_int_gauge!(
                "cost_engine_runs_partial_total",
                "Analysis runs that completed with degraded data"
            )
            .expect("Failed to register runs_partial"),
        }
    }
}

/// Engine metrics for Prometheus exposition
///
/// A lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct EngineMetrics {
    _private: (),
}

impl Default for EngineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl EngineMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(EngineMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &EngineMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_run_latency(&self, duration_secs: f64) {
        self.inner().run_latency_seconds.observe(duration_secs);
    }

    pub fn observe_source_latency(&self, duration_secs: f64) {
        self.inner().source_latency_seconds.observe(duration_secs);
    }

    /// Update the latest-run gauges from a finished report
    pub fn record_report(&self, report: &RunReport) {
        let inner = self.inner();

        inner
            .resources_scanned
            .set(report.summary.resources_scanned as i64);
        inner.recommendations.set(report.summary.recommendations as i64);
        inner.actions_succeeded.set(report.summary.succeeded as i64);
        inner.actions_failed.set(report.summary.failed as i64);
        inner
            .estimated_savings_usd
            .set(report.summary.total_estimated_savings_usd);

        inner.classifications.reset();
        for (label, count) in &report.summary.counts_by_label {
            inner
                .classifications
                .with_label_values(&[label.as_str()])
                .set(*count as i64);
        }

        inner.runs_total.inc();
        if report.partial {
            inner.runs_partial.inc();
        }
    }
}

/// Structured logger for engine events
#[derive(Clone)]
pub struct StructuredLogger {
    region: String,
}

impl StructuredLogger {
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
        }
    }

    pub fn log_startup(&self, version: &str) {
        info!(
            event = "startup",
            region = %self.region,
            version = version,
            "Cost engine started"
        );
    }

    pub fn log_run_completed(&self, report: &RunReport) {
        info!(
            event = "run_completed",
            region = %self.region,
            run_id = %report.run_id,
            resources = report.summary.resources_scanned,
            recommendations = report.summary.recommendations,
            succeeded = report.summary.succeeded,
            failed = report.summary.failed,
            estimated_savings_usd = report.summary.total_estimated_savings_usd,
            dry_run = report.dry_run,
            partial = report.partial,
            "Analysis run completed"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "shutdown",
            region = %self.region,
            reason = reason,
            "Cost engine shutting down"
        );
    }
}
