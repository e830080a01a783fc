//! Policy guard between recommendation and execution
//!
//! Rules are evaluated in order, first match wins:
//! 1. exclusion tag present -> blocked
//! 2. global dry-run flag -> needs-review
//! 3. action's opt-in tag missing -> blocked
//! 4. otherwise -> allowed
//!
//! This guard is the sole gate before execution; the executor refuses
//! anything not allowed.

use crate::config::RunConfig;
use crate::models::{Action, Recommendation, ResourceRecord, Verdict};

/// Verdict plus the rule that produced it
#[derive(Debug, Clone)]
pub struct PolicyDecision {
    pub verdict: Verdict,
    pub reason: Option<String>,
}

pub struct PolicyGuard {
    dry_run: bool,
    exclusion_tag_keys: Vec<String>,
}

impl PolicyGuard {
    pub fn new(config: &RunConfig) -> Self {
        Self {
            dry_run: config.dry_run,
            exclusion_tag_keys: config.exclusion_tag_keys.clone(),
        }
    }

    pub fn evaluate(&self, record: &ResourceRecord, action: &Action) -> PolicyDecision {
        if let Some(key) = self
            .exclusion_tag_keys
            .iter()
            .find(|key| record.tags.contains_key(key.as_str()))
        {
            return PolicyDecision {
                verdict: Verdict::Blocked,
                reason: Some(format!("exclusion tag '{}' present", key)),
            };
        }

        if self.dry_run {
            return PolicyDecision {
                verdict: Verdict::NeedsReview,
                reason: Some("dry-run mode".to_string()),
            };
        }

        if let Some(opt_in) = action.required_opt_in() {
            if !record.has_tag(opt_in) {
                return PolicyDecision {
                    verdict: Verdict::Blocked,
                    reason: Some(format!("missing opt-in tag '{}'", opt_in)),
                };
            }
        }

        PolicyDecision {
            verdict: Verdict::Allowed,
            reason: None,
        }
    }

    /// Resolve a draft recommendation's verdict
    pub fn apply(&self, record: &ResourceRecord, recommendation: Recommendation) -> Recommendation {
        let decision = self.evaluate(record, &recommendation.action);
        Recommendation {
            verdict: decision.verdict,
            verdict_reason: decision.reason,
            ..recommendation
        }
    }
}
