//! Core data models for the cost optimization engine

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Kinds of billable resources the engine analyzes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Ec2Instance,
    EbsVolume,
    ElasticIp,
    EbsSnapshot,
}

impl ResourceType {
    /// All resource types covered by an analysis run
    pub const ALL: [ResourceType; 4] = [
        ResourceType::Ec2Instance,
        ResourceType::EbsVolume,
        ResourceType::ElasticIp,
        ResourceType::EbsSnapshot,
    ];
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResourceType::Ec2Instance => write!(f, "ec2-instance"),
            ResourceType::EbsVolume => write!(f, "ebs-volume"),
            ResourceType::ElasticIp => write!(f, "elastic-ip"),
            ResourceType::EbsSnapshot => write!(f, "ebs-snapshot"),
        }
    }
}

/// Provider-reported lifecycle state of a resource
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    Running,
    Stopped,
    Available,
    InUse,
    Unknown,
}

/// Immutable inventory snapshot of a single resource for one analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceRecord {
    pub resource_id: String,
    pub resource_type: ResourceType,
    pub region: String,
    #[serde(default)]
    pub tags: HashMap<String, String>,
    pub state: ResourceState,
    pub created_at: i64,
    /// When the current state was entered, if the provider reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_since: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_gb: Option<u32>,
    /// Instance or network interface this resource is bound to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub association: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utilization: Option<UtilizationSummary>,
}

impl ResourceRecord {
    /// True if the tag key is present with a non-empty value
    pub fn has_tag(&self, key: &str) -> bool {
        self.tags.get(key).map(|v| !v.trim().is_empty()).unwrap_or(false)
    }

    pub fn age_days(&self, now: i64) -> f64 {
        (now - self.created_at).max(0) as f64 / 86_400.0
    }

    /// Hours spent in the current state; falls back to resource age when the
    /// provider does not report a state transition time
    pub fn state_age_hours(&self, now: i64) -> f64 {
        let since = self.state_since.unwrap_or(self.created_at);
        (now - since).max(0) as f64 / 3_600.0
    }
}

/// One observation in a utilization time series
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MetricPoint {
    pub timestamp: i64,
    pub value: f64,
}

/// Per-resource utilization time series over the lookback window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UtilizationSample {
    pub resource_id: String,
    pub metric: String,
    pub points: Vec<MetricPoint>,
}

/// Aggregate statistics over one metric's lookback window
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WindowStats {
    pub average: f64,
    pub maximum: f64,
    pub sample_count: usize,
    pub window_days: u32,
}

impl WindowStats {
    /// Summarize a time series; an empty series yields zeroed stats
    pub fn from_points(points: &[MetricPoint], window_days: u32) -> Self {
        if points.is_empty() {
            return Self {
                average: 0.0,
                maximum: 0.0,
                sample_count: 0,
                window_days,
            };
        }
        let sum: f64 = points.iter().map(|p| p.value).sum();
        let max = points
            .iter()
            .map(|p| p.value)
            .fold(f64::MIN, f64::max);
        Self {
            average: sum / points.len() as f64,
            maximum: max,
            sample_count: points.len(),
            window_days,
        }
    }
}

/// Utilization summaries attached to an instance record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UtilizationSummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu: Option<WindowStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory: Option<WindowStats>,
}

/// Label assigned to a resource by the classifier stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationLabel {
    Idle,
    Unattached,
    OverProvisioned,
    Untagged,
    Expired,
    Compliant,
}

impl std::fmt::Display for ClassificationLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassificationLabel::Idle => write!(f, "idle"),
            ClassificationLabel::Unattached => write!(f, "unattached"),
            ClassificationLabel::OverProvisioned => write!(f, "over-provisioned"),
            ClassificationLabel::Untagged => write!(f, "untagged"),
            ClassificationLabel::Expired => write!(f, "expired"),
            ClassificationLabel::Compliant => write!(f, "compliant"),
        }
    }
}

/// Classifier output for a single resource and rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classification {
    pub resource_id: String,
    pub label: ClassificationLabel,
    /// The metric or threshold that triggered the label
    pub evidence: String,
    /// Confidence in [0, 1]; 0 means insufficient data
    pub confidence: f32,
}

/// Remediation action proposed for a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    ApplyDefaultTags,
    Stop,
    Start,
    ResizeTo { instance_type: String },
    DeleteSnapshot,
    DeleteVolume,
    ReleaseAddress,
}

impl Action {
    /// Opt-in tag key a resource must carry before this action may execute.
    /// Tagging is the only action that needs no opt-in.
    pub fn required_opt_in(&self) -> Option<&'static str> {
        match self {
            Action::ApplyDefaultTags => None,
            Action::Stop => Some("AutoStop"),
            Action::Start => Some("AutoStart"),
            Action::ResizeTo { .. } => Some("AutoResize"),
            Action::DeleteSnapshot | Action::DeleteVolume | Action::ReleaseAddress => {
                Some("AutoCleanup")
            }
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Action::ApplyDefaultTags => write!(f, "apply-default-tags"),
            Action::Stop => write!(f, "stop"),
            Action::Start => write!(f, "start"),
            Action::ResizeTo { instance_type } => write!(f, "resize-to({})", instance_type),
            Action::DeleteSnapshot => write!(f, "delete-snapshot"),
            Action::DeleteVolume => write!(f, "delete-after-review"),
            Action::ReleaseAddress => write!(f, "release-address"),
        }
    }
}

/// Estimated monthly savings for a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Savings {
    Known { monthly_usd: f64 },
    /// Rate lookup failed; the recommendation stands without an estimate
    Unknown,
}

impl Savings {
    pub fn known(monthly_usd: f64) -> Self {
        Savings::Known { monthly_usd }
    }

    pub fn amount(&self) -> Option<f64> {
        match self {
            Savings::Known { monthly_usd } => Some(*monthly_usd),
            Savings::Unknown => None,
        }
    }
}

/// Policy guard verdict on a recommendation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Allowed,
    Blocked,
    NeedsReview,
}

impl std::fmt::Display for Verdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Verdict::Allowed => write!(f, "allowed"),
            Verdict::Blocked => write!(f, "blocked"),
            Verdict::NeedsReview => write!(f, "needs-review"),
        }
    }
}

/// A proposed remediation with its policy verdict
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub resource_id: String,
    pub resource_type: ResourceType,
    pub region: String,
    pub action: Action,
    pub estimated_savings: Savings,
    pub rationale: String,
    pub confidence: f32,
    pub verdict: Verdict,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verdict_reason: Option<String>,
}

/// Result of attempting one remediation action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeResult {
    Succeeded,
    Failed,
    Skipped,
}

impl std::fmt::Display for OutcomeResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutcomeResult::Succeeded => write!(f, "succeeded"),
            OutcomeResult::Failed => write!(f, "failed"),
            OutcomeResult::Skipped => write!(f, "skipped"),
        }
    }
}

/// Execution record for a recommendation that reached the executor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionOutcome {
    pub resource_id: String,
    pub action: Action,
    pub executed_at: i64,
    pub result: OutcomeResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record_with_tags(tags: &[(&str, &str)]) -> ResourceRecord {
        ResourceRecord {
            resource_id: "i-0abc".to_string(),
            resource_type: ResourceType::Ec2Instance,
            region: "us-east-1".to_string(),
            tags: tags
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            state: ResourceState::Running,
            created_at: 0,
            state_since: None,
            instance_type: Some("t3.medium".to_string()),
            size_gb: None,
            association: None,
            utilization: None,
        }
    }

    #[test]
    fn test_has_tag_ignores_empty_values() {
        let record = record_with_tags(&[("Owner", "platform"), ("CostCenter", "  ")]);
        assert!(record.has_tag("Owner"));
        assert!(!record.has_tag("CostCenter"));
        assert!(!record.has_tag("Environment"));
    }

    #[test]
    fn test_state_age_falls_back_to_creation_time() {
        let mut record = record_with_tags(&[]);
        record.created_at = 1_000;
        let now = 1_000 + 48 * 3_600;
        assert!((record.state_age_hours(now) - 48.0).abs() < f64::EPSILON);

        record.state_since = Some(now - 2 * 3_600);
        assert!((record.state_age_hours(now) - 2.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_window_stats_from_points() {
        let points: Vec<MetricPoint> = [2.0, 4.0, 9.0]
            .iter()
            .enumerate()
            .map(|(i, v)| MetricPoint {
                timestamp: i as i64 * 3_600,
                value: *v,
            })
            .collect();

        let stats = WindowStats::from_points(&points, 14);
        assert!((stats.average - 5.0).abs() < 1e-9);
        assert!((stats.maximum - 9.0).abs() < 1e-9);
        assert_eq!(stats.sample_count, 3);
    }

    #[test]
    fn test_window_stats_empty_series() {
        let stats = WindowStats::from_points(&[], 14);
        assert_eq!(stats.sample_count, 0);
        assert_eq!(stats.average, 0.0);
    }

    #[test]
    fn test_action_display_names() {
        assert_eq!(Action::Stop.to_string(), "stop");
        assert_eq!(Action::DeleteVolume.to_string(), "delete-after-review");
        assert_eq!(
            Action::ResizeTo {
                instance_type: "t3.small".to_string()
            }
            .to_string(),
            "resize-to(t3.small)"
        );
    }

    #[test]
    fn test_opt_in_keys_per_action() {
        assert_eq!(Action::ApplyDefaultTags.required_opt_in(), None);
        assert_eq!(Action::Stop.required_opt_in(), Some("AutoStop"));
        assert_eq!(Action::DeleteSnapshot.required_opt_in(), Some("AutoCleanup"));
    }
}
