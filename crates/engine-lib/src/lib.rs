//! Engine library for cloud cost optimization
//!
//! This crate provides the core functionality for:
//! - Inventory, billing, and utilization queries against the cloud gateway
//! - Threshold classification of unused and over-provisioned resources
//! - Recommendation generation with savings estimates
//! - Policy guarding (retention tags, dry-run, opt-in tags)
//! - Idempotent remediation execution
//! - Run reports, notifications, health checks, and observability

pub mod classify;
pub mod config;
pub mod error;
pub mod execute;
pub mod gateway;
pub mod health;
pub mod models;
pub mod notify;
pub mod observability;
pub mod policy;
pub mod recommend;
pub mod report;
pub mod run;
pub mod schedule;
pub mod source;

pub use config::{RunConfig, SchedulerAction};
pub use error::{EngineError, ProviderError, SourceError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{EngineMetrics, StructuredLogger};
pub use report::{ReportRow, RunReport, RunSummary};
pub use run::AnalysisRunner;
pub use schedule::{AnalysisLoop, LoopConfig, ScanRequest};
