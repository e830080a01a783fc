//! Error taxonomy for the analysis pipeline
//!
//! Resource-scoped failures (source queries, provider calls) are isolated
//! and reported per resource; only configuration errors abort a run.

use thiserror::Error;

/// Failure of a read-only data source query
#[derive(Debug, Clone, Error)]
pub enum SourceError {
    #[error("provider API error: {0}")]
    Provider(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("request throttled by provider")]
    Throttled,
    #[error("source query timed out after {0}s")]
    Timeout(u64),
}

/// Rejection of a remediation call by the cloud provider
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("resource not found: {0}")]
    NotFound(String),
    #[error("concurrent modification: {0}")]
    Conflict(String),
    #[error("request throttled by provider")]
    Throttled,
    #[error("action timed out after {0}s")]
    Timeout(u64),
    #[error("{0}")]
    Other(String),
}

/// Top-level engine errors
#[derive(Debug, Error)]
pub enum EngineError {
    /// Invalid configuration; fatal, aborts before any resource is processed
    #[error("invalid configuration: {0}")]
    Config(String),
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("report sink error: {0}")]
    ReportSink(String),
    #[error("notification error: {0}")]
    Notification(String),
}
