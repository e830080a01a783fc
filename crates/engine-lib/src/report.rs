//! Run reports and report persistence
//!
//! Every run produces a report, even a degraded one. The report store is
//! write-only from the engine's perspective: prior runs are never read
//! back.

use crate::error::EngineError;
use crate::models::{
    ActionOutcome, ClassificationLabel, OutcomeResult, ResourceType, Savings, Verdict,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// One line of the run report: a classification, the recommendation it
/// produced (if any), and the execution outcome (if any)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRow {
    pub resource_id: String,
    pub resource_type: ResourceType,
    pub region: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub classification: Option<ClassificationLabel>,
    pub evidence: String,
    pub confidence: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_savings: Option<Savings>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict: Option<Verdict>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<OutcomeResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

/// A resource or inventory scope the run could not analyze, with the reason
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedResource {
    pub scope: String,
    pub reason: String,
}

/// Aggregate counts for notification and dashboards
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunSummary {
    pub resources_scanned: usize,
    pub counts_by_label: BTreeMap<String, usize>,
    pub recommendations: usize,
    pub allowed: usize,
    pub blocked: usize,
    pub needs_review: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped_actions: usize,
    pub total_estimated_savings_usd: f64,
    /// Recommendations whose savings could not be estimated
    pub savings_unknown: usize,
}

/// Complete output of one analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub region: String,
    pub started_at: i64,
    pub completed_at: i64,
    pub dry_run: bool,
    /// True when any inventory page, query, or sink degraded the run
    pub partial: bool,
    pub rows: Vec<ReportRow>,
    pub skipped: Vec<SkippedResource>,
    pub summary: RunSummary,
}

impl RunReport {
    /// Timestamp-keyed run identifier, e.g. `run-20260806T120000Z`
    pub fn make_run_id(started_at: i64) -> String {
        match chrono::DateTime::from_timestamp(started_at, 0) {
            Some(ts) => format!("run-{}", ts.format("%Y%m%dT%H%M%SZ")),
            None => format!("run-{}", started_at),
        }
    }

    pub fn compute_summary(rows: &[ReportRow], resources_scanned: usize) -> RunSummary {
        let mut summary = RunSummary {
            resources_scanned,
            ..RunSummary::default()
        };

        for row in rows {
            if let Some(label) = row.classification {
                *summary.counts_by_label.entry(label.to_string()).or_insert(0) += 1;
            }
            if row.action.is_some() {
                summary.recommendations += 1;
            }
            match row.verdict {
                Some(Verdict::Allowed) => summary.allowed += 1,
                Some(Verdict::Blocked) => summary.blocked += 1,
                Some(Verdict::NeedsReview) => summary.needs_review += 1,
                None => {}
            }
            match row.estimated_savings {
                Some(Savings::Known { monthly_usd }) => {
                    summary.total_estimated_savings_usd += monthly_usd
                }
                Some(Savings::Unknown) => summary.savings_unknown += 1,
                None => {}
            }
            match row.outcome {
                Some(OutcomeResult::Succeeded) => summary.succeeded += 1,
                Some(OutcomeResult::Failed) => summary.failed += 1,
                Some(OutcomeResult::Skipped) => summary.skipped_actions += 1,
                None => {}
            }
        }
        summary
    }

    pub fn attach_outcome(&mut self, outcome: &ActionOutcome) {
        let action = outcome.action.to_string();
        if let Some(row) = self
            .rows
            .iter_mut()
            .find(|r| r.resource_id == outcome.resource_id && r.action.as_deref() == Some(action.as_str()))
        {
            row.outcome = Some(outcome.result);
            row.failure_reason = outcome.failure_reason.clone();
        }
    }
}

/// Write-only destination for run reports
#[async_trait]
pub trait ReportSink: Send + Sync {
    async fn write(&self, report: &RunReport) -> Result<(), EngineError>;
}

/// Writes one JSON file per run under a fixed directory
pub struct FsReportSink {
    dir: PathBuf,
}

impl FsReportSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl ReportSink for FsReportSink {
    async fn write(&self, report: &RunReport) -> Result<(), EngineError> {
        let path = self.dir.join(format!("report-{}.json", report.run_id));
        let body = serde_json::to_vec_pretty(report)
            .map_err(|e| EngineError::ReportSink(e.to_string()))?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| EngineError::ReportSink(e.to_string()))?;
        tokio::fs::write(&path, body)
            .await
            .map_err(|e| EngineError::ReportSink(e.to_string()))?;

        info!(path = %path.display(), rows = report.rows.len(), "Report written");
        Ok(())
    }
}

/// Latest-report handle shared between the analysis loop and the API
#[derive(Clone, Default)]
pub struct ReportStore {
    latest: Arc<RwLock<Option<RunReport>>>,
}

impl ReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn publish(&self, report: RunReport) {
        let mut latest = self.latest.write().await;
        *latest = Some(report);
    }

    pub async fn latest(&self) -> Option<RunReport> {
        self.latest.read().await.clone()
    }
}
