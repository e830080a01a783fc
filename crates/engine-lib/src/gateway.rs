//! HTTP client for the internal cloud gateway
//!
//! The gateway proxies billing, metrics, inventory, and remediation calls
//! to the provider. One client implements both the read-only data source
//! and the write-side provider actions.

use crate::error::{ProviderError, SourceError};
use crate::execute::{ActionStatus, ProviderActions};
use crate::models::{ResourceRecord, ResourceType, UtilizationSample};
use crate::source::{CostDimension, CostRecord, Page, ResourceFilter, TimeRange, UsageDataSource};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use url::Url;

pub struct GatewayClient {
    client: reqwest::Client,
    base_url: Url,
    timeout_secs: u64,
}

#[derive(Debug, Deserialize)]
struct CostPage {
    records: Vec<CostRecord>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Deserialize)]
struct InventoryPage {
    resources: Vec<ResourceRecord>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Serialize)]
struct ActionRequest<'a> {
    resource_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    instance_type: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<&'a HashMap<String, String>>,
}

#[derive(Debug, Deserialize)]
struct ActionReply {
    status: String,
}

impl GatewayClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;
        let base_url = Url::parse(base_url).context("Invalid gateway URL")?;

        Ok(Self {
            client,
            base_url,
            timeout_secs: timeout.as_secs(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, SourceError> {
        let url = self
            .base_url
            .join(path)
            .map_err(|e| SourceError::Provider(e.to_string()))?;

        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(source_error_for_status(status, &body));
        }

        response
            .json()
            .await
            .map_err(|e| SourceError::Provider(format!("malformed response: {}", e)))
    }

    async fn post_action(
        &self,
        verb: &str,
        request: &ActionRequest<'_>,
    ) -> Result<ActionStatus, ProviderError> {
        let url = self
            .base_url
            .join(&format!("v1/actions/{}", verb))
            .map_err(|e| ProviderError::Other(e.to_string()))?;

        let response = self
            .client
            .post(url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(self.timeout_secs)
                } else {
                    ProviderError::Other(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(provider_error_for_status(status, &body));
        }

        let reply: ActionReply = response
            .json()
            .await
            .map_err(|e| ProviderError::Other(format!("malformed response: {}", e)))?;
        parse_action_status(&reply.status)
    }

    fn map_request_error(&self, e: reqwest::Error) -> SourceError {
        if e.is_timeout() {
            SourceError::Timeout(self.timeout_secs)
        } else {
            SourceError::Provider(e.to_string())
        }
    }
}

fn source_error_for_status(status: StatusCode, body: &str) -> SourceError {
    match status {
        StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => {
            SourceError::PermissionDenied(body.to_string())
        }
        StatusCode::TOO_MANY_REQUESTS => SourceError::Throttled,
        _ => SourceError::Provider(format!("gateway returned {}: {}", status, body)),
    }
}

fn provider_error_for_status(status: StatusCode, body: &str) -> ProviderError {
    match status {
        StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => {
            ProviderError::PermissionDenied(body.to_string())
        }
        StatusCode::NOT_FOUND => ProviderError::NotFound(body.to_string()),
        StatusCode::CONFLICT => ProviderError::Conflict(body.to_string()),
        StatusCode::TOO_MANY_REQUESTS => ProviderError::Throttled,
        _ => ProviderError::Other(format!("gateway returned {}: {}", status, body)),
    }
}

fn parse_action_status(status: &str) -> Result<ActionStatus, ProviderError> {
    match status {
        "applied" => Ok(ActionStatus::Applied),
        "already-in-target-state" => Ok(ActionStatus::AlreadyInTargetState),
        other => Err(ProviderError::Other(format!(
            "unexpected action status '{}'",
            other
        ))),
    }
}

#[async_trait]
impl UsageDataSource for GatewayClient {
    async fn get_cost_and_usage(
        &self,
        range: TimeRange,
        group_by: CostDimension,
    ) -> Result<Page<CostRecord>, SourceError> {
        let page: CostPage = self
            .get_json(
                "v1/costs",
                &[
                    ("start", range.start.to_string()),
                    ("end", range.end.to_string()),
                    ("group_by", group_by.to_string()),
                ],
            )
            .await?;

        Ok(Page {
            items: page.records,
            complete: !page.truncated,
        })
    }

    async fn get_utilization(
        &self,
        resource_id: &str,
        metric: &str,
        range: TimeRange,
        granularity_secs: u32,
    ) -> Result<UtilizationSample, SourceError> {
        self.get_json(
            &format!("v1/metrics/{}", resource_id),
            &[
                ("metric", metric.to_string()),
                ("start", range.start.to_string()),
                ("end", range.end.to_string()),
                ("period", granularity_secs.to_string()),
            ],
        )
        .await
    }

    async fn list_resources(
        &self,
        resource_type: ResourceType,
        filter: &ResourceFilter,
    ) -> Result<Page<ResourceRecord>, SourceError> {
        let mut query: Vec<(&str, String)> = Vec::new();
        if !filter.states.is_empty() {
            let states: Vec<String> = filter
                .states
                .iter()
                .filter_map(|s| serde_json::to_value(s).ok())
                .filter_map(|v| v.as_str().map(String::from))
                .collect();
            query.push(("state", states.join(",")));
        }

        let page: InventoryPage = self
            .get_json(&format!("v1/inventory/{}", resource_type), &query)
            .await?;

        Ok(Page {
            items: page.resources,
            complete: !page.truncated,
        })
    }
}

#[async_trait]
impl ProviderActions for GatewayClient {
    async fn stop_instance(&self, resource_id: &str) -> Result<ActionStatus, ProviderError> {
        self.post_action(
            "stop-instance",
            &ActionRequest {
                resource_id,
                instance_type: None,
                tags: None,
            },
        )
        .await
    }

    async fn start_instance(&self, resource_id: &str) -> Result<ActionStatus, ProviderError> {
        self.post_action(
            "start-instance",
            &ActionRequest {
                resource_id,
                instance_type: None,
                tags: None,
            },
        )
        .await
    }

    async fn modify_instance_type(
        &self,
        resource_id: &str,
        instance_type: &str,
    ) -> Result<ActionStatus, ProviderError> {
        self.post_action(
            "modify-instance-type",
            &ActionRequest {
                resource_id,
                instance_type: Some(instance_type),
                tags: None,
            },
        )
        .await
    }

    async fn create_tags(
        &self,
        resource_id: &str,
        tags: &HashMap<String, String>,
    ) -> Result<ActionStatus, ProviderError> {
        self.post_action(
            "create-tags",
            &ActionRequest {
                resource_id,
                instance_type: None,
                tags: Some(tags),
            },
        )
        .await
    }

    async fn delete_snapshot(&self, resource_id: &str) -> Result<ActionStatus, ProviderError> {
        self.post_action(
            "delete-snapshot",
            &ActionRequest {
                resource_id,
                instance_type: None,
                tags: None,
            },
        )
        .await
    }

    async fn delete_volume(&self, resource_id: &str) -> Result<ActionStatus, ProviderError> {
        self.post_action(
            "delete-volume",
            &ActionRequest {
                resource_id,
                instance_type: None,
                tags: None,
            },
        )
        .await
    }

    async fn release_address(&self, resource_id: &str) -> Result<ActionStatus, ProviderError> {
        self.post_action(
            "release-address",
            &ActionRequest {
                resource_id,
                instance_type: None,
                tags: None,
            },
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_status_parsing() {
        assert_eq!(parse_action_status("applied").unwrap(), ActionStatus::Applied);
        assert_eq!(
            parse_action_status("already-in-target-state").unwrap(),
            ActionStatus::AlreadyInTargetState
        );
        assert!(parse_action_status("exploded").is_err());
    }

    #[test]
    fn test_provider_error_mapping() {
        let err = provider_error_for_status(StatusCode::NOT_FOUND, "snap-1 gone");
        assert!(matches!(err, ProviderError::NotFound(_)));

        let err = provider_error_for_status(StatusCode::CONFLICT, "in use");
        assert!(matches!(err, ProviderError::Conflict(_)));

        let err = provider_error_for_status(StatusCode::TOO_MANY_REQUESTS, "");
        assert!(matches!(err, ProviderError::Throttled));
    }

    #[test]
    fn test_source_error_mapping() {
        let err = source_error_for_status(StatusCode::FORBIDDEN, "no ce:GetCostAndUsage");
        assert!(matches!(err, SourceError::PermissionDenied(_)));

        let err = source_error_for_status(StatusCode::INTERNAL_SERVER_ERROR, "boom");
        assert!(matches!(err, SourceError::Provider(_)));
    }

    #[test]
    fn test_rejects_invalid_base_url() {
        assert!(GatewayClient::new("not a url", Duration::from_secs(5)).is_err());
    }
}
