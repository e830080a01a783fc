//! Classification to recommendation mapping
//!
//! A fixed lookup per label: idle -> stop, unattached volume -> delete
//! after review, unused address -> release, expired snapshot -> delete,
//! untagged -> apply default tags, over-provisioned -> resize to the next
//! smaller compatible type. Confidence is inherited from the source
//! classification.

mod pricing;

pub use pricing::{RateBook, HOURS_PER_MONTH};

use crate::config::{RunConfig, SchedulerAction};
use crate::models::{
    Action, Classification, ClassificationLabel, Recommendation, ResourceRecord, ResourceState,
    ResourceType, Savings, Verdict,
};

pub struct RecommendationEngine {
    rates: RateBook,
}

impl RecommendationEngine {
    pub fn new(rates: RateBook) -> Self {
        Self { rates }
    }

    /// Map one classification to its remediation, if one exists.
    ///
    /// Compliant classifications and over-provisioned instances already at
    /// the bottom of the size ladder produce nothing.
    pub fn recommend(
        &self,
        record: &ResourceRecord,
        classification: &Classification,
    ) -> Option<Recommendation> {
        let (action, savings) = match classification.label {
            ClassificationLabel::Idle => (Action::Stop, self.stop_savings(record)),
            ClassificationLabel::Unattached => match record.resource_type {
                ResourceType::EbsVolume => (
                    Action::DeleteVolume,
                    record
                        .size_gb
                        .map(|gb| Savings::known(self.rates.volume_monthly(gb)))
                        .unwrap_or(Savings::Unknown),
                ),
                ResourceType::ElasticIp => (
                    Action::ReleaseAddress,
                    Savings::known(self.rates.address_monthly()),
                ),
                _ => return None,
            },
            ClassificationLabel::OverProvisioned => {
                let current = record.instance_type.as_deref()?;
                let target = RateBook::next_smaller(current)?;
                let savings = match (
                    self.rates.instance_monthly(current),
                    self.rates.instance_monthly(&target),
                ) {
                    (Some(from), Some(to)) => Savings::known(from - to),
                    _ => Savings::Unknown,
                };
                (
                    Action::ResizeTo {
                        instance_type: target,
                    },
                    savings,
                )
            }
            ClassificationLabel::Expired => (
                Action::DeleteSnapshot,
                record
                    .size_gb
                    .map(|gb| Savings::known(self.rates.snapshot_monthly(gb)))
                    .unwrap_or(Savings::Unknown),
            ),
            ClassificationLabel::Untagged => (Action::ApplyDefaultTags, Savings::known(0.0)),
            ClassificationLabel::Compliant => return None,
        };

        Some(self.draft(record, action, savings, classification.evidence.clone(), classification.confidence))
    }

    /// Scheduled stop/start recommendations for the window this run
    /// services; the policy guard's opt-in rule is what enforces the tags.
    pub fn schedule_action(
        &self,
        record: &ResourceRecord,
        config: &RunConfig,
    ) -> Option<Recommendation> {
        if record.resource_type != ResourceType::Ec2Instance {
            return None;
        }
        match config.scheduler_action? {
            SchedulerAction::Stop if record.state == ResourceState::Running => Some(self.draft(
                record,
                Action::Stop,
                self.stop_savings(record),
                "scheduled stop window".to_string(),
                1.0,
            )),
            SchedulerAction::Start if record.state == ResourceState::Stopped => Some(self.draft(
                record,
                Action::Start,
                Savings::known(0.0),
                "scheduled start window".to_string(),
                1.0,
            )),
            _ => None,
        }
    }

    fn draft(
        &self,
        record: &ResourceRecord,
        action: Action,
        savings: Savings,
        rationale: String,
        confidence: f32,
    ) -> Recommendation {
        Recommendation {
            resource_id: record.resource_id.clone(),
            resource_type: record.resource_type,
            region: record.region.clone(),
            action,
            estimated_savings: savings,
            rationale,
            confidence,
            // Verdict is resolved by the policy guard
            verdict: Verdict::NeedsReview,
            verdict_reason: None,
        }
    }

    fn stop_savings(&self, record: &ResourceRecord) -> Savings {
        record
            .instance_type
            .as_deref()
            .and_then(|t| self.rates.instance_monthly(t))
            .map(Savings::known)
            .unwrap_or(Savings::Unknown)
    }
}
