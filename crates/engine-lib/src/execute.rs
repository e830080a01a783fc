//! Remediation execution
//!
//! Applies allowed recommendations through the cloud provider. Execution
//! is idempotent: stopping an already-stopped instance or deleting an
//! already-deleted snapshot yields a skipped outcome, not a failure.
//! Nothing is retried within a run; the next scheduled run naturally
//! retries via re-classification.

use crate::error::ProviderError;
use crate::models::{Action, ActionOutcome, OutcomeResult, Recommendation, ResourceRecord, Verdict};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Provider-reported result of a remediation call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionStatus {
    Applied,
    /// The resource was already in the requested state
    AlreadyInTargetState,
}

/// Write-side provider operations
#[async_trait]
pub trait ProviderActions: Send + Sync {
    async fn stop_instance(&self, resource_id: &str) -> Result<ActionStatus, ProviderError>;
    async fn start_instance(&self, resource_id: &str) -> Result<ActionStatus, ProviderError>;
    async fn modify_instance_type(
        &self,
        resource_id: &str,
        instance_type: &str,
    ) -> Result<ActionStatus, ProviderError>;
    async fn create_tags(
        &self,
        resource_id: &str,
        tags: &HashMap<String, String>,
    ) -> Result<ActionStatus, ProviderError>;
    async fn delete_snapshot(&self, resource_id: &str) -> Result<ActionStatus, ProviderError>;
    async fn delete_volume(&self, resource_id: &str) -> Result<ActionStatus, ProviderError>;
    async fn release_address(&self, resource_id: &str) -> Result<ActionStatus, ProviderError>;
}

pub struct RemediationExecutor {
    provider: Arc<dyn ProviderActions>,
    default_tags: HashMap<String, String>,
    timeout: Duration,
}

impl RemediationExecutor {
    pub fn new(
        provider: Arc<dyn ProviderActions>,
        default_tags: HashMap<String, String>,
        timeout: Duration,
    ) -> Self {
        Self {
            provider,
            default_tags,
            timeout,
        }
    }

    /// Apply one recommendation. Refuses anything the policy guard did not
    /// allow; provider rejections are captured verbatim, never retried.
    pub async fn execute(
        &self,
        record: &ResourceRecord,
        recommendation: &Recommendation,
    ) -> ActionOutcome {
        let executed_at = chrono::Utc::now().timestamp();

        if recommendation.verdict != Verdict::Allowed {
            return ActionOutcome {
                resource_id: recommendation.resource_id.clone(),
                action: recommendation.action.clone(),
                executed_at,
                result: OutcomeResult::Skipped,
                failure_reason: Some(format!(
                    "policy verdict is {}, not allowed",
                    recommendation.verdict
                )),
            };
        }

        let (result, failure_reason) = match self.dispatch(record, &recommendation.action).await {
            Ok(ActionStatus::Applied) => (OutcomeResult::Succeeded, None),
            Ok(ActionStatus::AlreadyInTargetState) => (
                OutcomeResult::Skipped,
                Some("already in target state".to_string()),
            ),
            Err(e) => (OutcomeResult::Failed, Some(e.to_string())),
        };

        match result {
            OutcomeResult::Failed => warn!(
                resource_id = %recommendation.resource_id,
                action = %recommendation.action,
                reason = failure_reason.as_deref().unwrap_or(""),
                "Remediation failed"
            ),
            _ => debug!(
                resource_id = %recommendation.resource_id,
                action = %recommendation.action,
                result = %result,
                "Remediation applied"
            ),
        }

        ActionOutcome {
            resource_id: recommendation.resource_id.clone(),
            action: recommendation.action.clone(),
            executed_at,
            result,
            failure_reason,
        }
    }

    async fn dispatch(
        &self,
        record: &ResourceRecord,
        action: &Action,
    ) -> Result<ActionStatus, ProviderError> {
        let id = record.resource_id.as_str();
        let call = async {
            match action {
                Action::Stop => self.provider.stop_instance(id).await,
                Action::Start => self.provider.start_instance(id).await,
                Action::ResizeTo { instance_type } => {
                    self.provider.modify_instance_type(id, instance_type).await
                }
                Action::ApplyDefaultTags => self.apply_default_tags(record).await,
                Action::DeleteSnapshot => self.provider.delete_snapshot(id).await,
                Action::DeleteVolume => self.provider.delete_volume(id).await,
                Action::ReleaseAddress => self.provider.release_address(id).await,
            }
        };

        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout(self.timeout.as_secs())),
        }
    }

    /// Merge semantics: only keys the resource does not already carry are
    /// sent, so a human-set tag is never overwritten.
    async fn apply_default_tags(
        &self,
        record: &ResourceRecord,
    ) -> Result<ActionStatus, ProviderError> {
        let to_add: HashMap<String, String> = self
            .default_tags
            .iter()
            .filter(|(key, _)| !record.has_tag(key))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        if to_add.is_empty() {
            return Ok(ActionStatus::AlreadyInTargetState);
        }

        self.provider.create_tags(&record.resource_id, &to_add).await
    }
}
