//! API client for communicating with the cost engine

use anyhow::{Context, Result};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

/// API client for the cost engine
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("API error ({}): {}", status, body);
        }

        response.json().await.context("Failed to parse response")
    }
}

// API response types

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum Savings {
    Known { monthly_usd: f64 },
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRow {
    pub resource_id: String,
    pub resource_type: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub classification: Option<String>,
    pub evidence: String,
    pub confidence: f32,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub estimated_savings: Option<Savings>,
    #[serde(default)]
    pub verdict: Option<String>,
    #[serde(default)]
    pub verdict_reason: Option<String>,
    #[serde(default)]
    pub outcome: Option<String>,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkippedResource {
    pub scope: String,
    pub reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub resources_scanned: usize,
    pub counts_by_label: HashMap<String, usize>,
    pub recommendations: usize,
    pub allowed: usize,
    pub blocked: usize,
    pub needs_review: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped_actions: usize,
    pub total_estimated_savings_usd: f64,
    pub savings_unknown: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub region: String,
    pub started_at: i64,
    pub completed_at: i64,
    pub dry_run: bool,
    pub partial: bool,
    pub rows: Vec<ReportRow>,
    pub skipped: Vec<SkippedResource>,
    pub summary: RunSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationList {
    pub recommendations: Vec<ReportRow>,
    pub total: usize,
    pub run_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostLine {
    pub dimension_value: String,
    pub cost: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostSummary {
    pub dimension: String,
    pub total_cost: f64,
    pub unit: String,
    pub complete: bool,
    pub lines: Vec<CostLine>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanAccepted {
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: String,
    #[serde(default)]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub components: HashMap<String, ComponentHealth>,
}
