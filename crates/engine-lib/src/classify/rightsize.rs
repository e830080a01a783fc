//! Over-provisioned instance detection
//!
//! Flags instances whose utilization sits below the lower threshold for
//! the whole window with no burst above the upper threshold, so that
//! legitimately bursty workloads are left alone.

use super::Classifier;
use crate::config::RunConfig;
use crate::models::{Classification, ClassificationLabel, ResourceRecord, ResourceState, ResourceType};

pub struct RightsizeClassifier;

impl Classifier for RightsizeClassifier {
    fn name(&self) -> &'static str {
        "rightsize"
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

        let utilization = record.utilization.as_ref()?;
        let cpu = utilization.cpu?;
        if cpu.sample_count < config.min_samples {
            return None;
        }

        let lower = config.overprovision_threshold_pct;
        let burst = config.burst_threshold_pct;

        if cpu.average >= lower || cpu.maximum >= burst {
            return None;
        }

        // Memory is only consulted when the provider reports it
        let mut worst_average = cpu.average;
        if let Some(memory) = utilization.memory {
            if memory.average >= lower {
                return None;
            }
            worst_average = worst_average.max(memory.average);
        }

        let confidence = ((lower - worst_average) / lower).clamp(0.0, 1.0) as f32;
        let memory_note = utilization
            .memory
            .map(|m| format!(", memory {:.2}%", m.average))
            .unwrap_or_default();

        Some(Classification {
            resource_id: record.resource_id.clone(),
            label: ClassificationLabel::OverProvisioned,
            evidence: format!(
                "average CPU {:.2}%{} below {:.1}% with no burst above {:.1}% over {}d",
                cpu.average, memory_note, lower, burst, cpu.window_days
            ),
            confidence,
        })
    }
}
