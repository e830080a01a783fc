//! Immutable run configuration
//!
//! The configuration bundle is passed into each component at run start,
//! never read from ambient process state, so runs stay reproducible.

use crate::error::EngineError;
use serde::Deserialize;
use std::collections::HashMap;

/// Thresholds and policy knobs for one analysis run
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
    /// Utilization lookback window in days
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,

    /// Average CPU below this marks a running instance idle
    #[serde(default = "default_idle_cpu_threshold")]
    pub idle_cpu_threshold_pct: f64,

    /// Average utilization below this marks an instance over-provisioned
    #[serde(default = "default_overprovision_threshold")]
    pub overprovision_threshold_pct: f64,

    /// A single sample above this exempts bursty workloads from rightsizing
    #[serde(default = "default_burst_threshold")]
    pub burst_threshold_pct: f64,

    /// Snapshots older than this are expired
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,

    /// Volumes must sit unattached this long before being flagged
    #[serde(default = "default_volume_grace_hours")]
    pub volume_grace_hours: u32,

    /// Minimum utilization samples before threshold rules apply
    #[serde(default = "default_min_samples")]
    pub min_samples: usize,

    /// Report recommendations without executing anything
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,

    /// Tags applied to untagged resources
    #[serde(default = "default_tags")]
    pub default_tags: HashMap<String, String>,

    /// Tag keys every resource must carry with a non-empty value
    #[serde(default = "default_required_tag_keys")]
    pub required_tag_keys: Vec<String>,

    /// Tag keys that unconditionally block remediation
    #[serde(default = "default_exclusion_tag_keys")]
    pub exclusion_tag_keys: Vec<String>,

    /// Tag key that contradicts an idle classification
    #[serde(default = "default_keep_alive_tag_key")]
    pub keep_alive_tag_key: String,

    /// Upper bound on concurrent per-resource tasks
    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    /// Timeout for data source queries
    #[serde(default = "default_source_timeout")]
    pub source_timeout_secs: u64,

    /// Timeout for remediation calls
    #[serde(default = "default_action_timeout")]
    pub action_timeout_secs: u64,

    /// Scheduled stop/start window this run services, if any
    #[serde(default)]
    pub scheduler_action: Option<SchedulerAction>,
}

/// Which half of the instance schedule a triggered run services
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerAction {
    Stop,
    Start,
}

fn default_lookback_days() -> u32 {
    14
}

fn default_idle_cpu_threshold() -> f64 {
    5.0
}

fn default_overprovision_threshold() -> f64 {
    20.0
}

fn default_burst_threshold() -> f64 {
    60.0
}

fn default_retention_days() -> u32 {
    30
}

fn default_volume_grace_hours() -> u32 {
    24
}

fn default_min_samples() -> usize {
    5
}

fn default_dry_run() -> bool {
    true
}

fn default_tags() -> HashMap<String, String> {
    [
        ("Environment".to_string(), "Untagged".to_string()),
        ("Owner".to_string(), "Unknown".to_string()),
    ]
    .into_iter()
    .collect()
}

fn default_required_tag_keys() -> Vec<String> {
    vec![
        "Environment".to_string(),
        "Owner".to_string(),
        "CostCenter".to_string(),
    ]
}

fn default_exclusion_tag_keys() -> Vec<String> {
    vec!["Retain".to_string(), "AutoSchedulerExempt".to_string()]
}

fn default_keep_alive_tag_key() -> String {
    "KeepAlive".to_string()
}

fn default_max_concurrency() -> usize {
    8
}

fn default_source_timeout() -> u64 {
    30
}

fn default_action_timeout() -> u64 {
    30
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            lookback_days: default_lookback_days(),
            idle_cpu_threshold_pct: default_idle_cpu_threshold(),
            overprovision_threshold_pct: default_overprovision_threshold(),
            burst_threshold_pct: default_burst_threshold(),
            retention_days: default_retention_days(),
            volume_grace_hours: default_volume_grace_hours(),
            min_samples: default_min_samples(),
            dry_run: default_dry_run(),
            default_tags: default_tags(),
            required_tag_keys: default_required_tag_keys(),
            exclusion_tag_keys: default_exclusion_tag_keys(),
            keep_alive_tag_key: default_keep_alive_tag_key(),
            max_concurrency: default_max_concurrency(),
            source_timeout_secs: default_source_timeout(),
            action_timeout_secs: default_action_timeout(),
            scheduler_action: None,
        }
    }
}

impl RunConfig {
    /// Reject configurations that would make a run meaningless or unsafe
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.lookback_days == 0 {
            return Err(EngineError::Config("lookback_days must be > 0".to_string()));
        }
        if !(0.0..=100.0).contains(&self.idle_cpu_threshold_pct) || self.idle_cpu_threshold_pct == 0.0
        {
            return Err(EngineError::Config(format!(
                "idle_cpu_threshold_pct must be in (0, 100], got {}",
                self.idle_cpu_threshold_pct
            )));
        }
        if self.overprovision_threshold_pct <= 0.0 || self.overprovision_threshold_pct > 100.0 {
            return Err(EngineError::Config(format!(
                "overprovision_threshold_pct must be in (0, 100], got {}",
                self.overprovision_threshold_pct
            )));
        }
        if self.burst_threshold_pct <= self.overprovision_threshold_pct {
            return Err(EngineError::Config(format!(
                "burst_threshold_pct ({}) must exceed overprovision_threshold_pct ({})",
                self.burst_threshold_pct, self.overprovision_threshold_pct
            )));
        }
        if self.retention_days == 0 {
            return Err(EngineError::Config("retention_days must be > 0".to_string()));
        }
        if self.max_concurrency == 0 {
            return Err(EngineError::Config("max_concurrency must be > 0".to_string()));
        }
        if self.source_timeout_secs == 0 || self.action_timeout_secs == 0 {
            return Err(EngineError::Config("timeouts must be > 0".to_string()));
        }
        Ok(())
    }

    /// True if the resource carries any exclusion tag key
    pub fn is_excluded(&self, tags: &HashMap<String, String>) -> Option<&str> {
        self.exclusion_tag_keys
            .iter()
            .find(|key| tags.contains_key(key.as_str()))
            .map(|s| s.as_str())
    }
}
