//! Expired snapshot detection
//!
//! Age alone decides the label. Retention tags do not suppress the
//! classification; they block execution at the policy guard, so the
//! finding stays visible in reports.

use super::Classifier;
use crate::config::RunConfig;
use crate::models::{Classification, ClassificationLabel, ResourceRecord, ResourceType};

pub struct ExpiredSnapshotClassifier;

impl Classifier for ExpiredSnapshotClassifier {
    fn name(&self) -> &'static str {
        "expired-snapshot"
    }

    fn applies_to(&self, resource_type: ResourceType) -> bool {
        resource_type == ResourceType::EbsSnapshot
    }

    fn classify(
        &self,
        record: &ResourceRecord,
        config: &RunConfig,
        now: i64,
    ) -> Option<Classification> {
        let age_days = record.age_days(now);
        if age_days <= f64::from(config.retention_days) {
            return None;
        }

        Some(Classification {
            resource_id: record.resource_id.clone(),
            label: ClassificationLabel::Expired,
            evidence: format!(
                "snapshot age {:.0}d exceeds retention of {}d",
                age_days, config.retention_days
            ),
            confidence: 1.0,
        })
    }
}
