//! Unattached volume and unused address detection

use super::Classifier;
use crate::config::RunConfig;
use crate::models::{Classification, ClassificationLabel, ResourceRecord, ResourceState, ResourceType};

/// Volumes in `available` state past the provisioning grace period.
/// The grace period avoids flagging volumes mid-provisioning.
pub struct UnattachedVolumeClassifier;

impl Classifier for UnattachedVolumeClassifier {
    fn name(&self) -> &'static str {
        "unattached-volume"
    }

    fn applies_to(&self, resource_type: ResourceType) -> bool {
        resource_type == ResourceType::EbsVolume
    }

    fn classify(
        &self,
        record: &ResourceRecord,
        config: &RunConfig,
        now: i64,
    ) -> Option<Classification> {
        if record.state != ResourceState::Available || record.association.is_some() {
            return None;
        }

        let hours = record.state_age_hours(now);
        if hours <= f64::from(config.volume_grace_hours) {
            return None;
        }

        Some(Classification {
            resource_id: record.resource_id.clone(),
            label: ClassificationLabel::Unattached,
            evidence: format!(
                "available and unattached for {:.0}h (grace {}h)",
                hours, config.volume_grace_hours
            ),
            confidence: 1.0,
        })
    }
}

/// Elastic IPs not associated with any instance or network interface
pub struct UnusedAddressClassifier;

impl Classifier for UnusedAddressClassifier {
    fn name(&self) -> &'static str {
        "unused-address"
    }

    fn applies_to(&self, resource_type: ResourceType) -> bool {
        resource_type == ResourceType::ElasticIp
    }

    fn classify(
        &self,
        record: &ResourceRecord,
        _config: &RunConfig,
        _now: i64,
    ) -> Option<Classification> {
        if record.association.is_some() {
            return None;
        }

        Some(Classification {
            resource_id: record.resource_id.clone(),
            label: ClassificationLabel::Unattached,
            evidence: "not associated with any instance or network interface".to_string(),
            confidence: 1.0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::required_tags;
    use super::*;
    use crate::models::ResourceRecord;

    const NOW: i64 = 1_754_000_000;

    fn volume(id: &str, state: ResourceState, state_since: Option<i64>) -> ResourceRecord {
        ResourceRecord {
            resource_id: id.to_string(),
            resource_type: ResourceType::EbsVolume,
            region: "us-east-1".to_string(),
            tags: required_tags(),
            state,
            created_at: NOW - 90 * 86_400,
            state_since,
            instance_type: None,
            size_gb: Some(100),
            association: None,
            utilization: None,
        }
    }

    #[test]
    fn test_volume_unattached_past_grace() {
        let classifier = UnattachedVolumeClassifier;
        let config = RunConfig::default();
        // Unattached for 48 hours, grace is 24
        let record = volume("vol-1", ResourceState::Available, Some(NOW - 48 * 3_600));

        let classification = classifier.classify(&record, &config, NOW).unwrap();
        assert_eq!(classification.label, ClassificationLabel::Unattached);
        assert!(classification.evidence.contains("48h"));
    }

    #[test]
    fn test_volume_within_grace_not_flagged() {
        let classifier = UnattachedVolumeClassifier;
        let config = RunConfig::default();
        let record = volume("vol-2", ResourceState::Available, Some(NOW - 3_600));

        assert!(classifier.classify(&record, &config, NOW).is_none());
    }

    #[test]
    fn test_attached_volume_not_flagged() {
        let classifier = UnattachedVolumeClassifier;
        let config = RunConfig::default();
        let mut record = volume("vol-3", ResourceState::InUse, None);
        record.association = Some("i-0abc".to_string());

        assert!(classifier.classify(&record, &config, NOW).is_none());
    }

    #[test]
    fn test_unassociated_address_flagged() {
        let classifier = UnusedAddressClassifier;
        let config = RunConfig::default();
        let record = ResourceRecord {
            resource_id: "eipalloc-1".to_string(),
            resource_type: ResourceType::ElasticIp,
            region: "us-east-1".to_string(),
            tags: required_tags(),
            state: ResourceState::Available,
            created_at: NOW - 86_400,
            state_since: None,
            instance_type: None,
            size_gb: None,
            association: None,
            utilization: None,
        };

        let classification = classifier.classify(&record, &config, NOW).unwrap();
        assert_eq!(classification.label, ClassificationLabel::Unattached);
        assert_eq!(classification.confidence, 1.0);
    }
}
