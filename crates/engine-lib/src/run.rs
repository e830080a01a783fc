//! Analysis run orchestration
//!
//! One logical pass: inventory -> classify -> recommend -> guard ->
//! execute -> report. Classification of distinct resources runs in
//! parallel under a bounded semaphore; actions against the same resource
//! are serialized within a single task. Resource-scoped failures are
//! isolated and recorded; only configuration errors abort a run.

use crate::classify::ClassifierSet;
use crate::config::RunConfig;
use crate::error::{EngineError, SourceError};
use crate::execute::{ProviderActions, RemediationExecutor};
use crate::models::{
    ActionOutcome, Classification, Recommendation, ResourceRecord, ResourceState, ResourceType,
    UtilizationSample, UtilizationSummary, Verdict, WindowStats,
};
use crate::notify::{NotificationSink, RunNotification};
use crate::observability::EngineMetrics;
use crate::policy::PolicyGuard;
use crate::recommend::{RateBook, RecommendationEngine};
use crate::report::{ReportRow, ReportSink, RunReport, SkippedResource};
use crate::source::{ResourceFilter, TimeRange, UsageDataSource};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

/// CloudWatch-style metric names queried per instance
const CPU_METRIC: &str = "CPUUtilization";
const MEMORY_METRIC: &str = "MemoryUtilization";

/// Daily datapoints, matching the lookback granularity
const METRIC_GRANULARITY_SECS: u32 = 86_400;

pub struct AnalysisRunner {
    source: Arc<dyn UsageDataSource>,
    provider: Arc<dyn ProviderActions>,
    report_sink: Arc<dyn ReportSink>,
    notifier: Option<Arc<dyn NotificationSink>>,
    metrics: EngineMetrics,
    region: String,
}

/// Per-resource output of the classify/recommend/guard stages
struct ResourceAnalysis {
    record: ResourceRecord,
    findings: Vec<(Classification, Option<Recommendation>)>,
    /// Scheduler recommendations with no backing classification
    scheduled: Vec<Recommendation>,
    skipped: Option<SkippedResource>,
}

impl AnalysisRunner {
    pub fn new(
        source: Arc<dyn UsageDataSource>,
        provider: Arc<dyn ProviderActions>,
        report_sink: Arc<dyn ReportSink>,
        region: impl Into<String>,
    ) -> Self {
        Self {
            source,
            provider,
            report_sink,
            notifier: None,
            metrics: EngineMetrics::new(),
            region: region.into(),
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Execute one full analysis run. Always produces a report, possibly a
    /// degraded one; only an invalid configuration returns an error.
    pub async fn run(&self, config: &RunConfig) -> Result<RunReport, EngineError> {
        config.validate()?;

        let started_at = chrono::Utc::now().timestamp();
        let run_id = RunReport::make_run_id(started_at);
        let timer = std::time::Instant::now();
        info!(run_id = %run_id, dry_run = config.dry_run, "Analysis run started");

        let mut partial = false;
        let mut skipped: Vec<SkippedResource> = Vec::new();

        let records = self
            .inventory(config, &mut partial, &mut skipped)
            .await;
        let resources_scanned = records.len();

        let analyses = self
            .analyze_all(records, config, started_at, &mut partial, &mut skipped)
            .await;

        let outcomes = self
            .execute_allowed(&analyses, config, &mut partial, &mut skipped)
            .await;

        let mut report = assemble_report(
            run_id.clone(),
            self.region.clone(),
            started_at,
            config.dry_run,
            partial,
            analyses,
            outcomes,
            skipped,
            resources_scanned,
        );

        if let Err(e) = self.report_sink.write(&report).await {
            warn!(run_id = %run_id, error = %e, "Report sink write failed");
            report.partial = true;
        }

        if let Some(notifier) = &self.notifier {
            let notification = RunNotification::from_report(&report);
            if let Err(e) = notifier.notify(&notification).await {
                warn!(run_id = %run_id, error = %e, "Notification dispatch failed");
                report.partial = true;
            }
        }

        self.metrics.observe_run_latency(timer.elapsed().as_secs_f64());
        self.metrics.record_report(&report);
        info!(
            run_id = %run_id,
            rows = report.rows.len(),
            partial = report.partial,
            "Analysis run complete"
        );

        Ok(report)
    }

    /// List every resource type; listing failures skip that scope and mark
    /// the run partial rather than aborting it.
    async fn inventory(
        &self,
        config: &RunConfig,
        partial: &mut bool,
        skipped: &mut Vec<SkippedResource>,
    ) -> Vec<ResourceRecord> {
        let mut records = Vec::new();
        let timeout = Duration::from_secs(config.source_timeout_secs);
        let filter = ResourceFilter::default();

        for resource_type in ResourceType::ALL {
            let started = std::time::Instant::now();
            let result = tokio::time::timeout(
                timeout,
                self.source.list_resources(resource_type, &filter),
            )
            .await;
            self.metrics
                .observe_source_latency(started.elapsed().as_secs_f64());

            match result {
                Ok(Ok(page)) => {
                    if !page.complete {
                        *partial = true;
                        skipped.push(SkippedResource {
                            scope: format!("inventory:{}", resource_type),
                            reason: "listing truncated by provider".to_string(),
                        });
                    }
                    records.extend(page.items);
                }
                Ok(Err(e)) => {
                    *partial = true;
                    skipped.push(SkippedResource {
                        scope: format!("inventory:{}", resource_type),
                        reason: e.to_string(),
                    });
                }
                Err(_) => {
                    *partial = true;
                    skipped.push(SkippedResource {
                        scope: format!("inventory:{}", resource_type),
                        reason: SourceError::Timeout(config.source_timeout_secs).to_string(),
                    });
                }
            }
        }
        records
    }

    /// Fetch utilization, classify, recommend, and guard each resource
    /// concurrently under the configured bound.
    async fn analyze_all(
        &self,
        records: Vec<ResourceRecord>,
        config: &RunConfig,
        now: i64,
        partial: &mut bool,
        skipped: &mut Vec<SkippedResource>,
    ) -> Vec<ResourceAnalysis> {
        let permits = config.max_concurrency.min(records.len().max(1));
        let semaphore = Arc::new(Semaphore::new(permits));
        let classifiers = Arc::new(ClassifierSet::standard());
        let engine = Arc::new(RecommendationEngine::new(RateBook::builtin()));
        let guard = Arc::new(PolicyGuard::new(config));

        let mut join_set = JoinSet::new();
        for record in records {
            let source = Arc::clone(&self.source);
            let classifiers = Arc::clone(&classifiers);
            let engine = Arc::clone(&engine);
            let guard = Arc::clone(&guard);
            let semaphore = Arc::clone(&semaphore);
            let config = config.clone();

            join_set.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("analysis semaphore closed");
                analyze_resource(record, source, classifiers, engine, guard, config, now).await
            });
        }

        let mut analyses = Vec::new();
        while let Some(result) = join_set.join_next().await {
            match result {
                Ok(analysis) => {
                    if analysis.skipped.is_some() {
                        *partial = true;
                    }
                    analyses.push(analysis);
                }
                Err(e) => {
                    *partial = true;
                    skipped.push(SkippedResource {
                        scope: "analysis-task".to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        // Deterministic report ordering
        analyses.sort_by(|a, b| a.record.resource_id.cmp(&b.record.resource_id));
        analyses
    }

    /// Execute allowed recommendations. Distinct resources run
    /// concurrently; actions against one resource run in sequence.
    async fn execute_allowed(
        &self,
        analyses: &[ResourceAnalysis],
        config: &RunConfig,
        partial: &mut bool,
        skipped: &mut Vec<SkippedResource>,
    ) -> Vec<ActionOutcome> {
        let mut by_resource: HashMap<String, (ResourceRecord, Vec<Recommendation>)> =
            HashMap::new();
        for analysis in analyses {
            let allowed: Vec<Recommendation> = analysis
                .findings
                .iter()
                .filter_map(|(_, rec)| rec.clone())
                .chain(analysis.scheduled.iter().cloned())
                .filter(|rec| rec.verdict == Verdict::Allowed)
                .collect();
            if !allowed.is_empty() {
                by_resource.insert(
                    analysis.record.resource_id.clone(),
                    (analysis.record.clone(), allowed),
                );
            }
        }

        let executor = Arc::new(RemediationExecutor::new(
            Arc::clone(&self.provider),
            config.default_tags.clone(),
            Duration::from_secs(config.action_timeout_secs),
        ));
        let permits = config.max_concurrency.min(by_resource.len().max(1));
        let semaphore = Arc::new(Semaphore::new(permits));

        let mut join_set = JoinSet::new();
        for (_, (record, recommendations)) in by_resource {
            let executor = Arc::clone(&executor);
            let semaphore = Arc::clone(&semaphore);

            join_set.spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .expect("execution semaphore closed");
                let mut outcomes = Vec::with_capacity(recommendations.len());
                for recommendation in &recommendations {
                    outcomes.push(executor.execute(&record, recommendation).await);
                }
                outcomes
            });
        }

        let mut outcomes = Vec::new();
        while let Some(result) = join_set.join_next().await {
            match result {
                Ok(mut resource_outcomes) => outcomes.append(&mut resource_outcomes),
                Err(e) => {
                    *partial = true;
                    skipped.push(SkippedResource {
                        scope: "execution-task".to_string(),
                        reason: e.to_string(),
                    });
                }
            }
        }
        outcomes
    }
}

async fn analyze_resource(
    mut record: ResourceRecord,
    source: Arc<dyn UsageDataSource>,
    classifiers: Arc<ClassifierSet>,
    engine: Arc<RecommendationEngine>,
    guard: Arc<PolicyGuard>,
    config: RunConfig,
    now: i64,
) -> ResourceAnalysis {
    let mut skipped = None;

    if record.resource_type == ResourceType::Ec2Instance && record.state == ResourceState::Running
    {
        let range = TimeRange::last_days(now, config.lookback_days);
        match fetch_metric(&*source, &record.resource_id, CPU_METRIC, range, &config).await {
            Ok(sample) => {
                let cpu = WindowStats::from_points(&sample.points, config.lookback_days);
                // Memory is best-effort; absence just narrows the evidence
                let memory = fetch_metric(&*source, &record.resource_id, MEMORY_METRIC, range, &config)
                    .await
                    .ok()
                    .map(|s| WindowStats::from_points(&s.points, config.lookback_days))
                    .filter(|stats| stats.sample_count > 0);
                record.utilization = Some(UtilizationSummary {
                    cpu: Some(cpu),
                    memory,
                });
            }
            Err(e) => {
                // No guessing without data: the classifier set will mark
                // this resource compliant with confidence 0
                skipped = Some(SkippedResource {
                    scope: record.resource_id.clone(),
                    reason: format!("utilization unavailable: {}", e),
                });
            }
        }
    }

    let mut findings = Vec::new();
    let mut seen_actions = Vec::new();
    for classification in classifiers.classify(&record, &config, now) {
        let recommendation = engine
            .recommend(&record, &classification)
            .map(|draft| guard.apply(&record, draft));
        if let Some(rec) = &recommendation {
            seen_actions.push(rec.action.clone());
        }
        findings.push((classification, recommendation));
    }

    let mut scheduled = Vec::new();
    if let Some(draft) = engine.schedule_action(&record, &config) {
        // A classification-driven recommendation for the same action wins
        if !seen_actions.contains(&draft.action) {
            scheduled.push(guard.apply(&record, draft));
        }
    }

    ResourceAnalysis {
        record,
        findings,
        scheduled,
        skipped,
    }
}

async fn fetch_metric(
    source: &dyn UsageDataSource,
    resource_id: &str,
    metric: &str,
    range: TimeRange,
    config: &RunConfig,
) -> Result<UtilizationSample, SourceError> {
    let timeout = Duration::from_secs(config.source_timeout_secs);
    match tokio::time::timeout(
        timeout,
        source.get_utilization(resource_id, metric, range, METRIC_GRANULARITY_SECS),
    )
    .await
    {
        Ok(result) => result,
        Err(_) => Err(SourceError::Timeout(config.source_timeout_secs)),
    }
}

#[allow(clippy::too_many_arguments)]
fn assemble_report(
    run_id: String,
    region: String,
    started_at: i64,
    dry_run: bool,
    partial: bool,
    analyses: Vec<ResourceAnalysis>,
    outcomes: Vec<ActionOutcome>,
    mut skipped: Vec<SkippedResource>,
    resources_scanned: usize,
) -> RunReport {
    let mut rows = Vec::new();
    for analysis in analyses {
        if let Some(s) = analysis.skipped {
            skipped.push(s);
        }
        for (classification, recommendation) in &analysis.findings {
            rows.push(ReportRow {
                resource_id: analysis.record.resource_id.clone(),
                resource_type: analysis.record.resource_type,
                region: analysis.record.region.clone(),
                classification: Some(classification.label),
                evidence: classification.evidence.clone(),
                confidence: classification.confidence,
                action: recommendation.as_ref().map(|r| r.action.to_string()),
                estimated_savings: recommendation.as_ref().map(|r| r.estimated_savings),
                verdict: recommendation.as_ref().map(|r| r.verdict),
                verdict_reason: recommendation
                    .as_ref()
                    .and_then(|r| r.verdict_reason.clone()),
                outcome: None,
                failure_reason: None,
            });
        }
        for recommendation in &analysis.scheduled {
            rows.push(ReportRow {
                resource_id: analysis.record.resource_id.clone(),
                resource_type: analysis.record.resource_type,
                region: analysis.record.region.clone(),
                classification: None,
                evidence: recommendation.rationale.clone(),
                confidence: recommendation.confidence,
                action: Some(recommendation.action.to_string()),
                estimated_savings: Some(recommendation.estimated_savings),
                verdict: Some(recommendation.verdict),
                verdict_reason: recommendation.verdict_reason.clone(),
                outcome: None,
                failure_reason: None,
            });
        }
    }

    let mut report = RunReport {
        run_id,
        region,
        started_at,
        completed_at: chrono::Utc::now().timestamp(),
        dry_run,
        partial,
        rows,
        skipped,
        summary: Default::default(),
    };
    for outcome in &outcomes {
        report.attach_outcome(outcome);
    }
    report.summary = RunReport::compute_summary(&report.rows, resources_scanned);
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderError;
    use crate::execute::ActionStatus;
    use crate::models::{ClassificationLabel, MetricPoint, OutcomeResult};
    use crate::source::{CostDimension, CostRecord, Page};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MockSource {
        records: Vec<ResourceRecord>,
        cpu_series: HashMap<String, Vec<MetricPoint>>,
        fail_inventory: Vec<ResourceType>,
    }

    #[async_trait]
    impl UsageDataSource for MockSource {
        async fn get_cost_and_usage(
            &self,
            _range: TimeRange,
            _group_by: CostDimension,
        ) -> Result<Page<CostRecord>, SourceError> {
            Ok(Page::complete(vec![]))
        }

        async fn get_utilization(
            &self,
            resource_id: &str,
            metric: &str,
            _range: TimeRange,
            _granularity_secs: u32,
        ) -> Result<UtilizationSample, SourceError> {
            if metric != CPU_METRIC {
                return Err(SourceError::Provider("metric not collected".to_string()));
            }
            let points = self
                .cpu_series
                .get(resource_id)
                .cloned()
                .ok_or_else(|| SourceError::Provider("no datapoints".to_string()))?;
            Ok(UtilizationSample {
                resource_id: resource_id.to_string(),
                metric: metric.to_string(),
                points,
            })
        }

        async fn list_resources(
            &self,
            resource_type: ResourceType,
            _filter: &ResourceFilter,
        ) -> Result<Page<ResourceRecord>, SourceError> {
            if self.fail_inventory.contains(&resource_type) {
                return Err(SourceError::Provider("internal error".to_string()));
            }
            Ok(Page::complete(
                self.records
                    .iter()
                    .filter(|r| r.resource_type == resource_type)
                    .cloned()
                    .collect(),
            ))
        }
    }

    #[derive(Default)]
    struct MockProvider {
        stopped: Mutex<Vec<String>>,
        tag_calls: Mutex<Vec<(String, HashMap<String, String>)>>,
        deleted: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ProviderActions for MockProvider {
        async fn stop_instance(&self, resource_id: &str) -> Result<ActionStatus, ProviderError> {
            let mut stopped = self.stopped.lock().unwrap();
            if stopped.iter().any(|id| id == resource_id) {
                return Ok(ActionStatus::AlreadyInTargetState);
            }
            stopped.push(resource_id.to_string());
            Ok(ActionStatus::Applied)
        }

        async fn start_instance(&self, _resource_id: &str) -> Result<ActionStatus, ProviderError> {
            Ok(ActionStatus::Applied)
        }

        async fn modify_instance_type(
            &self,
            _resource_id: &str,
            _instance_type: &str,
        ) -> Result<ActionStatus, ProviderError> {
            Ok(ActionStatus::Applied)
        }

        async fn create_tags(
            &self,
            resource_id: &str,
            tags: &HashMap<String, String>,
        ) -> Result<ActionStatus, ProviderError> {
            self.tag_calls
                .lock()
                .unwrap()
                .push((resource_id.to_string(), tags.clone()));
            Ok(ActionStatus::Applied)
        }

        async fn delete_snapshot(&self, resource_id: &str) -> Result<ActionStatus, ProviderError> {
            self.deleted.lock().unwrap().push(resource_id.to_string());
            Ok(ActionStatus::Applied)
        }

        async fn delete_volume(&self, resource_id: &str) -> Result<ActionStatus, ProviderError> {
            self.deleted.lock().unwrap().push(resource_id.to_string());
            Ok(ActionStatus::Applied)
        }

        async fn release_address(&self, _resource_id: &str) -> Result<ActionStatus, ProviderError> {
            Ok(ActionStatus::Applied)
        }
    }

    struct NullSink;

    #[async_trait]
    impl ReportSink for NullSink {
        async fn write(&self, _report: &RunReport) -> Result<(), EngineError> {
            Ok(())
        }
    }

    fn now() -> i64 {
        chrono::Utc::now().timestamp()
    }

    fn tags(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn full_tags() -> HashMap<String, String> {
        tags(&[
            ("Environment", "prod"),
            ("Owner", "platform"),
            ("CostCenter", "cc-100"),
        ])
    }

    fn instance(id: &str, instance_type: &str, t: HashMap<String, String>) -> ResourceRecord {
        ResourceRecord {
            resource_id: id.to_string(),
            resource_type: ResourceType::Ec2Instance,
            region: "us-east-1".to_string(),
            tags: t,
            state: ResourceState::Running,
            created_at: now() - 90 * 86_400,
            state_since: None,
            instance_type: Some(instance_type.to_string()),
            size_gb: None,
            association: None,
            utilization: None,
        }
    }

    fn volume(id: &str, hours_unattached: i64) -> ResourceRecord {
        ResourceRecord {
            resource_id: id.to_string(),
            resource_type: ResourceType::EbsVolume,
            region: "us-east-1".to_string(),
            tags: full_tags(),
            state: ResourceState::Available,
            created_at: now() - 90 * 86_400,
            state_since: Some(now() - hours_unattached * 3_600),
            instance_type: None,
            size_gb: Some(100),
            association: None,
            utilization: None,
        }
    }

    fn snapshot(id: &str, age_days: i64, t: HashMap<String, String>) -> ResourceRecord {
        ResourceRecord {
            resource_id: id.to_string(),
            resource_type: ResourceType::EbsSnapshot,
            region: "us-east-1".to_string(),
            tags: t,
            state: ResourceState::Available,
            created_at: now() - age_days * 86_400,
            state_since: None,
            instance_type: None,
            size_gb: Some(50),
            association: None,
            utilization: None,
        }
    }

    fn daily_points(value: f64, days: usize) -> Vec<MetricPoint> {
        (0..days)
            .map(|i| MetricPoint {
                timestamp: now() - (i as i64) * 86_400,
                value,
            })
            .collect()
    }

    fn runner(source: MockSource, provider: Arc<MockProvider>) -> AnalysisRunner {
        AnalysisRunner::new(Arc::new(source), provider, Arc::new(NullSink), "us-east-1")
    }

    fn row_for<'a>(report: &'a RunReport, id: &str, label: ClassificationLabel) -> &'a ReportRow {
        report
            .rows
            .iter()
            .find(|r| r.resource_id == id && r.classification == Some(label))
            .unwrap_or_else(|| panic!("no {} row for {}", label, id))
    }

    #[tokio::test]
    async fn test_idle_instance_scenario() {
        // 2% average CPU over 14 days, no exclusion tag
        let source = MockSource {
            records: vec![instance("i-idle", "m5.xlarge", full_tags())],
            cpu_series: [("i-idle".to_string(), daily_points(2.0, 14))]
                .into_iter()
                .collect(),
            fail_inventory: vec![],
        };
        let provider = Arc::new(MockProvider::default());
        let report = runner(source, provider)
            .run(&RunConfig {
                dry_run: false,
                ..RunConfig::default()
            })
            .await
            .unwrap();

        let row = row_for(&report, "i-idle", ClassificationLabel::Idle);
        assert_eq!(row.action.as_deref(), Some("stop"));
        match row.estimated_savings {
            Some(crate::models::Savings::Known { monthly_usd }) => assert!(monthly_usd > 0.0),
            other => panic!("expected known savings, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unattached_volume_scenario() {
        // Unattached for 48 hours with state available
        let source = MockSource {
            records: vec![volume("vol-orphan", 48)],
            cpu_series: HashMap::new(),
            fail_inventory: vec![],
        };
        let provider = Arc::new(MockProvider::default());
        let report = runner(source, provider)
            .run(&RunConfig::default())
            .await
            .unwrap();

        let row = row_for(&report, "vol-orphan", ClassificationLabel::Unattached);
        assert_eq!(row.action.as_deref(), Some("delete-after-review"));
    }

    #[tokio::test]
    async fn test_retained_snapshot_scenario() {
        // 45 days old with retention 30 and Retain=true: classification is
        // recorded, the verdict is blocked, nothing is deleted
        let mut snapshot_tags = full_tags();
        snapshot_tags.insert("Retain".to_string(), "true".to_string());
        let source = MockSource {
            records: vec![snapshot("snap-retained", 45, snapshot_tags)],
            cpu_series: HashMap::new(),
            fail_inventory: vec![],
        };
        let provider = Arc::new(MockProvider::default());
        let report = runner(source, Arc::clone(&provider))
            .run(&RunConfig {
                dry_run: false,
                ..RunConfig::default()
            })
            .await
            .unwrap();

        let row = row_for(&report, "snap-retained", ClassificationLabel::Expired);
        assert_eq!(row.verdict, Some(Verdict::Blocked));
        assert!(row.outcome.is_none());
        assert!(provider.deleted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_untagged_resource_scenario() {
        // Missing Owner: defaults merge without touching Environment
        let source = MockSource {
            records: vec![snapshot(
                "snap-untagged",
                5,
                tags(&[("Environment", "prod"), ("CostCenter", "cc-1")]),
            )],
            cpu_series: HashMap::new(),
            fail_inventory: vec![],
        };
        let provider = Arc::new(MockProvider::default());
        let report = runner(source, Arc::clone(&provider))
            .run(&RunConfig {
                dry_run: false,
                ..RunConfig::default()
            })
            .await
            .unwrap();

        let row = row_for(&report, "snap-untagged", ClassificationLabel::Untagged);
        assert_eq!(row.action.as_deref(), Some("apply-default-tags"));
        assert_eq!(row.outcome, Some(OutcomeResult::Succeeded));

        let calls = provider.tag_calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "snap-untagged");
        assert!(calls[0].1.contains_key("Owner"));
        assert!(!calls[0].1.contains_key("Environment"));
    }

    #[tokio::test]
    async fn test_dry_run_produces_no_succeeded_outcomes() {
        let mut idle_tags = full_tags();
        idle_tags.insert("AutoStop".to_string(), "yes".to_string());
        let source = MockSource {
            records: vec![
                instance("i-idle", "m5.xlarge", idle_tags),
                snapshot("snap-old", 45, tags(&[])),
            ],
            cpu_series: [("i-idle".to_string(), daily_points(2.0, 14))]
                .into_iter()
                .collect(),
            fail_inventory: vec![],
        };
        let provider = Arc::new(MockProvider::default());
        let report = runner(source, Arc::clone(&provider))
            .run(&RunConfig::default()) // dry_run defaults to true
            .await
            .unwrap();

        assert_eq!(report.summary.succeeded, 0);
        assert!(provider.stopped.lock().unwrap().is_empty());
        assert!(provider.deleted.lock().unwrap().is_empty());
        // Everything not blocked by an exclusion surfaces as needs-review
        assert!(report
            .rows
            .iter()
            .filter(|r| r.verdict.is_some())
            .all(|r| r.verdict == Some(Verdict::NeedsReview)));
    }

    #[tokio::test]
    async fn test_opted_in_stop_executes_once() {
        let mut idle_tags = full_tags();
        idle_tags.insert("AutoStop".to_string(), "yes".to_string());
        let source = MockSource {
            records: vec![instance("i-idle", "m5.xlarge", idle_tags)],
            cpu_series: [("i-idle".to_string(), daily_points(2.0, 14))]
                .into_iter()
                .collect(),
            fail_inventory: vec![],
        };
        let provider = Arc::new(MockProvider::default());
        let report = runner(source, Arc::clone(&provider))
            .run(&RunConfig {
                dry_run: false,
                ..RunConfig::default()
            })
            .await
            .unwrap();

        let row = row_for(&report, "i-idle", ClassificationLabel::Idle);
        assert_eq!(row.verdict, Some(Verdict::Allowed));
        assert_eq!(row.outcome, Some(OutcomeResult::Succeeded));
        assert_eq!(provider.stopped.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_inventory_failure_degrades_run() {
        let source = MockSource {
            records: vec![volume("vol-1", 48)],
            cpu_series: HashMap::new(),
            fail_inventory: vec![ResourceType::EbsSnapshot],
        };
        let provider = Arc::new(MockProvider::default());
        let report = runner(source, provider)
            .run(&RunConfig::default())
            .await
            .unwrap();

        assert!(report.partial);
        assert!(report
            .skipped
            .iter()
            .any(|s| s.scope == "inventory:ebs-snapshot"));
        // The volume is still analyzed
        assert!(report.rows.iter().any(|r| r.resource_id == "vol-1"));
    }

    #[tokio::test]
    async fn test_missing_utilization_never_guesses_idle() {
        // Running instance with no datapoints at all
        let source = MockSource {
            records: vec![instance("i-blind", "m5.xlarge", full_tags())],
            cpu_series: HashMap::new(),
            fail_inventory: vec![],
        };
        let provider = Arc::new(MockProvider::default());
        let report = runner(source, provider)
            .run(&RunConfig::default())
            .await
            .unwrap();

        let row = row_for(&report, "i-blind", ClassificationLabel::Compliant);
        assert_eq!(row.confidence, 0.0);
        assert!(report.partial);
        assert!(report
            .skipped
            .iter()
            .any(|s| s.scope == "i-blind" && s.reason.contains("utilization unavailable")));
    }

    #[tokio::test]
    async fn test_invalid_config_aborts_before_any_resource() {
        let source = MockSource {
            records: vec![volume("vol-1", 48)],
            cpu_series: HashMap::new(),
            fail_inventory: vec![],
        };
        let provider = Arc::new(MockProvider::default());
        let result = runner(source, provider)
            .run(&RunConfig {
                lookback_days: 0,
                ..RunConfig::default()
            })
            .await;

        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[tokio::test]
    async fn test_scheduled_stop_window_stops_opted_in_instances() {
        use crate::config::SchedulerAction;

        let mut sched_tags = full_tags();
        sched_tags.insert("AutoStop".to_string(), "yes".to_string());
        // Busy instance: not idle, but inside the scheduled stop window
        let source = MockSource {
            records: vec![instance("i-sched", "t3.medium", sched_tags)],
            cpu_series: [("i-sched".to_string(), daily_points(55.0, 14))]
                .into_iter()
                .collect(),
            fail_inventory: vec![],
        };
        let provider = Arc::new(MockProvider::default());
        let report = runner(source, Arc::clone(&provider))
            .run(&RunConfig {
                dry_run: false,
                scheduler_action: Some(SchedulerAction::Stop),
                ..RunConfig::default()
            })
            .await
            .unwrap();

        let scheduled_row = report
            .rows
            .iter()
            .find(|r| r.resource_id == "i-sched" && r.classification.is_none())
            .expect("scheduled row missing");
        assert_eq!(scheduled_row.action.as_deref(), Some("stop"));
        assert_eq!(scheduled_row.outcome, Some(OutcomeResult::Succeeded));
        assert_eq!(provider.stopped.lock().unwrap().len(), 1);
    }
}
