//! Tag policy enforcement
//!
//! Applies to every resource type: required tag keys must be present
//! with non-empty values.

use super::Classifier;
use crate::config::RunConfig;
use crate::models::{Classification, ClassificationLabel, ResourceRecord, ResourceType};

pub struct TagPolicyClassifier;

impl Classifier for TagPolicyClassifier {
    fn name(&self) -> &'static str {
        "tag-policy"
    }

    fn applies_to(&self, _resource_type: ResourceType) -> bool {
        true
    }

    fn classify(
        &self,
        record: &ResourceRecord,
        config: &RunConfig,
        _now: i64,
    ) -> Option<Classification> {
        let missing: Vec<&str> = config
            .required_tag_keys
            .iter()
            .filter(|key| !record.has_tag(key))
            .map(|key| key.as_str())
            .collect();

        if missing.is_empty() {
            return None;
        }

        Some(Classification {
            resource_id: record.resource_id.clone(),
            label: ClassificationLabel::Untagged,
            evidence: format!("missing required tags: {}", missing.join(", ")),
            confidence: 1.0,
        })
    }
}
