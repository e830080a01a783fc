//! Deterministic threshold classification
//!
//! One classifier per rule, selected by resource type. A resource may
//! receive several labels at once (e.g. idle AND untagged); the set emits
//! one classification per applicable rule, never a single best match.

mod expired;
mod idle;
mod orphan;
mod rightsize;
mod tagging;

pub use expired::ExpiredSnapshotClassifier;
pub use idle::IdleInstanceClassifier;
pub use orphan::{UnattachedVolumeClassifier, UnusedAddressClassifier};
pub use rightsize::RightsizeClassifier;
pub use tagging::TagPolicyClassifier;

use crate::config::RunConfig;
use crate::models::{Classification, ClassificationLabel, ResourceRecord, ResourceState, ResourceType};

/// A single classification rule
pub trait Classifier: Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this rule evaluates the given resource type
    fn applies_to(&self, resource_type: ResourceType) -> bool;

    /// Evaluate the rule; `now` is the run's reference timestamp
    fn classify(
        &self,
        record: &ResourceRecord,
        config: &RunConfig,
        now: i64,
    ) -> Option<Classification>;
}

/// The full rule set applied to every resource in a run
pub struct ClassifierSet {
    classifiers: Vec<Box<dyn Classifier>>,
}

impl ClassifierSet {
    pub fn standard() -> Self {
        Self {
            classifiers: vec![
                Box::new(IdleInstanceClassifier),
                Box::new(RightsizeClassifier),
                Box::new(UnattachedVolumeClassifier),
                Box::new(UnusedAddressClassifier),
                Box::new(ExpiredSnapshotClassifier),
                Box::new(TagPolicyClassifier),
            ],
        }
    }

    /// Apply every applicable rule; resources with no findings are compliant.
    ///
    /// Running instances without enough utilization samples are never
    /// guessed at: they come back compliant with confidence 0.
    pub fn classify(&self, record: &ResourceRecord, config: &RunConfig, now: i64) -> Vec<Classification> {
        let mut out: Vec<Classification> = self
            .classifiers
            .iter()
            .filter(|c| c.applies_to(record.resource_type))
            .filter_map(|c| c.classify(record, config, now))
            .collect();

        if out.is_empty() {
            out.push(self.compliant_fallback(record, config));
        }
        out
    }

    fn compliant_fallback(&self, record: &ResourceRecord, config: &RunConfig) -> Classification {
        if let Some(samples) = insufficient_cpu_data(record, config) {
            return Classification {
                resource_id: record.resource_id.clone(),
                label: ClassificationLabel::Compliant,
                evidence: format!(
                    "insufficient utilization data ({} samples, require {})",
                    samples, config.min_samples
                ),
                confidence: 0.0,
            };
        }
        Classification {
            resource_id: record.resource_id.clone(),
            label: ClassificationLabel::Compliant,
            evidence: "no findings".to_string(),
            confidence: 1.0,
        }
    }
}

/// Sample count when a running instance lacks usable CPU data
fn insufficient_cpu_data(record: &ResourceRecord, config: &RunConfig) -> Option<usize> {
    if record.resource_type != ResourceType::Ec2Instance || record.state != ResourceState::Running {
        return None;
    }
    let count = record
        .utilization
        .as_ref()
        .and_then(|u| u.cpu)
        .map(|cpu| cpu.sample_count)
        .unwrap_or(0);
    (count < config.min_samples).then_some(count)
}
