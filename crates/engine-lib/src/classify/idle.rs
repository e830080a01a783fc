//! Idle instance detection
//!
//! A running instance is idle when its average CPU stays below the
//! configured threshold for the full lookback window and no keep-alive
//! tag contradicts the finding.

use super::Classifier;
use crate::config::RunConfig;
use crate::models::{Classification, ClassificationLabel, ResourceRecord, ResourceState, ResourceType};

pub struct IdleInstanceClassifier;

impl Classifier for IdleInstanceClassifier {
    fn name(&self) -> &'static str {
        "idle-instance"
    }

    fn applies_to(&self, resource_type: ResourceType) -> bool {
        resource_type == ResourceType::Ec2Instance
    }

    fn classify(
        &self,
        record: &ResourceRecord,
        config: &RunConfig,
        _now: i64,
    ) -> Option<Classification> {
        if record.state != ResourceState::Running {
            return None;
        }
        if record.has_tag(&config.keep_alive_tag_key) {
            return None;
        }

        let cpu = record.utilization.as_ref()?.cpu?;
        if cpu.sample_count < config.min_samples {
            return None;
        }

        let threshold = config.idle_cpu_threshold_pct;
        if cpu.average >= threshold {
            return None;
        }

        // Further below the threshold means higher confidence
        let confidence = ((threshold - cpu.average) / threshold).clamp(0.0, 1.0) as f32;

        Some(Classification {
            resource_id: record.resource_id.clone(),
            label: ClassificationLabel::Idle,
            evidence: format!(
                "average CPU {:.2}% below {:.1}% over {}d",
                cpu.average, threshold, cpu.window_days
            ),
            confidence,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::*;
    use super::*;

    const NOW: i64 = 1_754_000_000;

    #[test]
    fn test_low_cpu_instance_is_idle() {
        let classifier = IdleInstanceClassifier;
        let config = RunConfig::default();
        let record = with_cpu(instance("i-idle", ResourceState::Running), 2.0, 4.0, 14);

        let classification = classifier.classify(&record, &config, NOW).unwrap();

        assert_eq!(classification.label, ClassificationLabel::Idle);
        assert!(classification.confidence > 0.0);
        assert!(classification.evidence.contains("2.00%"));
    }

    #[test]
    fn test_busy_instance_not_idle() {
        let classifier = IdleInstanceClassifier;
        let config = RunConfig::default();
        let record = with_cpu(instance("i-busy", ResourceState::Running), 42.0, 80.0, 14);

        assert!(classifier.classify(&record, &config, NOW).is_none());
    }

    #[test]
    fn test_keep_alive_tag_contradicts_idle() {
        let classifier = IdleInstanceClassifier;
        let config = RunConfig::default();
        let mut record = with_cpu(instance("i-keep", ResourceState::Running), 1.0, 2.0, 14);
        record.tags.insert("KeepAlive".to_string(), "true".to_string());

        assert!(classifier.classify(&record, &config, NOW).is_none());
    }

    #[test]
    fn test_stopped_instance_not_evaluated() {
        let classifier = IdleInstanceClassifier;
        let config = RunConfig::default();
        let record = with_cpu(instance("i-stopped", ResourceState::Stopped), 0.0, 0.0, 14);

        assert!(classifier.classify(&record, &config, NOW).is_none());
    }

    #[test]
    fn test_insufficient_samples_not_guessed() {
        let classifier = IdleInstanceClassifier;
        let config = RunConfig::default();
        let record = with_cpu(instance("i-sparse", ResourceState::Running), 1.0, 2.0, 3);

        assert!(classifier.classify(&record, &config, NOW).is_none());
    }
}
