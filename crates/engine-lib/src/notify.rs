//! Run summary notification
//!
//! Hands a compact summary to an external pub/sub dispatcher after each
//! run. Delivery failures degrade the run, they never abort it.

use crate::error::EngineError;
use crate::report::RunReport;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

/// Failed action included in the notification body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedAction {
    pub resource_id: String,
    pub action: String,
    pub reason: String,
}

/// Webhook payload summarizing one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunNotification {
    pub run_id: String,
    pub region: String,
    pub dry_run: bool,
    pub partial: bool,
    pub counts_by_label: BTreeMap<String, usize>,
    pub total_estimated_savings_usd: f64,
    pub failed_actions: Vec<FailedAction>,
    /// Human-readable one-liner for chat/email dispatchers
    pub summary_text: String,
}

impl RunNotification {
    pub fn from_report(report: &RunReport) -> Self {
        let failed_actions: Vec<FailedAction> = report
            .rows
            .iter()
            .filter(|row| row.outcome == Some(crate::models::OutcomeResult::Failed))
            .map(|row| FailedAction {
                resource_id: row.resource_id.clone(),
                action: row.action.clone().unwrap_or_default(),
                reason: row.failure_reason.clone().unwrap_or_default(),
            })
            .collect();

        let summary_text = format!(
            "{}: {} resources scanned, {} recommendations, estimated ${:.2}/month savings, {} failed{}{}",
            report.run_id,
            report.summary.resources_scanned,
            report.summary.recommendations,
            report.summary.total_estimated_savings_usd,
            failed_actions.len(),
            if report.dry_run { " (dry-run)" } else { "" },
            if report.partial { " (partial)" } else { "" },
        );

        Self {
            run_id: report.run_id.clone(),
            region: report.region.clone(),
            dry_run: report.dry_run,
            partial: report.partial,
            counts_by_label: report.summary.counts_by_label.clone(),
            total_estimated_savings_usd: report.summary.total_estimated_savings_usd,
            failed_actions,
            summary_text,
        }
    }
}

/// External notification dispatcher
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(&self, notification: &RunNotification) -> Result<(), EngineError>;
}

/// Posts the notification JSON to a webhook endpoint
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: url::Url,
}

impl WebhookNotifier {
    pub fn new(url: &str, timeout: std::time::Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        let url = url::Url::parse(url)?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl NotificationSink for WebhookNotifier {
    async fn notify(&self, notification: &RunNotification) -> Result<(), EngineError> {
        let response = self
            .client
            .post(self.url.clone())
            .json(notification)
            .send()
            .await
            .map_err(|e| EngineError::Notification(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EngineError::Notification(format!(
                "webhook returned {}",
                response.status()
            )));
        }

        info!(run_id = %notification.run_id, "Run summary dispatched");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClassificationLabel, OutcomeResult, ResourceType, Verdict};
    use crate::report::{ReportRow, RunReport, RunSummary};

    fn report_with_failure() -> RunReport {
        let rows = vec![ReportRow {
            resource_id: "snap-1".to_string(),
            resource_type: ResourceType::EbsSnapshot,
            region: "us-east-1".to_string(),
            classification: Some(ClassificationLabel::Expired),
            evidence: "snapshot age 45d exceeds retention of 30d".to_string(),
            confidence: 1.0,
            action: Some("delete-snapshot".to_string()),
            estimated_savings: None,
            verdict: Some(Verdict::Allowed),
            verdict_reason: None,
            outcome: Some(OutcomeResult::Failed),
            failure_reason: Some("concurrent modification: snapshot in use".to_string()),
        }];
        let summary = RunReport::compute_summary(&rows, 1);
        RunReport {
            run_id: "run-20260806T000000Z".to_string(),
            region: "us-east-1".to_string(),
            started_at: 0,
            completed_at: 10,
            dry_run: false,
            partial: true,
            rows,
            skipped: vec![],
            summary: RunSummary {
                total_estimated_savings_usd: 12.5,
                ..summary
            },
        }
    }

    #[test]
    fn test_notification_carries_failed_actions() {
        let notification = RunNotification::from_report(&report_with_failure());

        assert_eq!(notification.failed_actions.len(), 1);
        assert_eq!(notification.failed_actions[0].resource_id, "snap-1");
        assert!(notification.failed_actions[0].reason.contains("snapshot in use"));
        assert_eq!(notification.counts_by_label["expired"], 1);
    }

    #[test]
    fn test_summary_text_flags_partial_runs() {
        let notification = RunNotification::from_report(&report_with_failure());
        assert!(notification.summary_text.contains("(partial)"));
        assert!(notification.summary_text.contains("$12.50"));
        assert!(!notification.summary_text.contains("dry-run"));
    }
}
