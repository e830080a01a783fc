//! Read-only access to billing, metrics, and inventory data
//!
//! All queries are side-effect free. A truncated page is not an error:
//! callers continue with what was returned and flag the run as partial.

use crate::error::SourceError;
use crate::models::{ResourceRecord, ResourceState, ResourceType, UtilizationSample};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Closed interval of unix timestamps for a query
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: i64,
    pub end: i64,
}

impl TimeRange {
    pub fn last_days(now: i64, days: u32) -> Self {
        Self {
            start: now - i64::from(days) * 86_400,
            end: now,
        }
    }
}

/// Grouping dimension for cost queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostDimension {
    Service,
    Region,
    UsageType,
    InstanceType,
}

impl std::fmt::Display for CostDimension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CostDimension::Service => write!(f, "service"),
            CostDimension::Region => write!(f, "region"),
            CostDimension::UsageType => write!(f, "usage-type"),
            CostDimension::InstanceType => write!(f, "instance-type"),
        }
    }
}

/// Cost attributed to one dimension value over one period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostRecord {
    pub period_start: String,
    pub period_end: String,
    pub dimension: CostDimension,
    pub dimension_value: String,
    pub cost: f64,
    pub unit: String,
}

/// Query result that may have been truncated by pagination or rate limits
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// False when the provider truncated the listing
    pub complete: bool,
}

impl<T> Page<T> {
    pub fn complete(items: Vec<T>) -> Self {
        Self {
            items,
            complete: true,
        }
    }

    pub fn truncated(items: Vec<T>) -> Self {
        Self {
            items,
            complete: false,
        }
    }
}

/// Inventory listing filter
#[derive(Debug, Clone, Default)]
pub struct ResourceFilter {
    /// Restrict to these states; empty means any state
    pub states: Vec<ResourceState>,
}

/// Abstraction over the billing/metrics/inventory provider
#[async_trait]
pub trait UsageDataSource: Send + Sync {
    /// Cost grouped by a dimension over a time range
    async fn get_cost_and_usage(
        &self,
        range: TimeRange,
        group_by: CostDimension,
    ) -> Result<Page<CostRecord>, SourceError>;

    /// Utilization time series for one resource and metric
    async fn get_utilization(
        &self,
        resource_id: &str,
        metric: &str,
        range: TimeRange,
        granularity_secs: u32,
    ) -> Result<UtilizationSample, SourceError>;

    /// Inventory snapshot for one resource type
    async fn list_resources(
        &self,
        resource_type: ResourceType,
        filter: &ResourceFilter,
    ) -> Result<Page<ResourceRecord>, SourceError>;
}

/// One line of a ranked cost summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostLine {
    pub dimension_value: String,
    pub cost: f64,
    pub percentage: f64,
}

/// Cost records ranked by spend with share-of-total percentages
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostSummary {
    pub dimension: CostDimension,
    pub total_cost: f64,
    pub unit: String,
    pub complete: bool,
    pub lines: Vec<CostLine>,
}

impl CostSummary {
    /// Rank a page of cost records by descending spend
    pub fn from_page(dimension: CostDimension, page: Page<CostRecord>) -> Self {
        let total: f64 = page.items.iter().map(|r| r.cost).sum();
        let unit = page
            .items
            .first()
            .map(|r| r.unit.clone())
            .unwrap_or_else(|| "USD".to_string());

        let mut lines: Vec<CostLine> = page
            .items
            .into_iter()
            .map(|r| CostLine {
                percentage: if total > 0.0 { r.cost / total * 100.0 } else { 0.0 },
                dimension_value: r.dimension_value,
                cost: r.cost,
            })
            .collect();
        lines.sort_by(|a, b| b.cost.partial_cmp(&a.cost).unwrap_or(std::cmp::Ordering::Equal));

        Self {
            dimension,
            total_cost: total,
            unit,
            complete: page.complete,
            lines,
        }
    }
}
