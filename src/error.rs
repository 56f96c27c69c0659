// src/error.rs
//! Error taxonomy of the report pipeline.
//!
//! Per-source failures (`SourceUnavailable`) are absorbed by the aggregator and
//! only surface as diagnostics. Everything in `PipelineError` reaches the caller
//! with its kind intact.

use std::time::Duration;

use crate::model::SourceKind;
use crate::orchestrator::PipelineState;

/// Why a single source could not deliver.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceFault {
    #[error("network error: {0}")]
    Network(String),
    #[error("credentials rejected (HTTP {0})")]
    Auth(u16),
    #[error("rate limited")]
    RateLimited,
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{origin} unavailable: {fault}")]
pub struct SourceUnavailable {
    pub origin: SourceKind,
    pub fault: SourceFault,
}

impl SourceUnavailable {
    pub fn new(origin: SourceKind, fault: SourceFault) -> Self {
        Self { origin, fault }
    }
}

/// Failure of one narrative-backend call.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("credentials rejected (HTTP {0})")]
    Auth(u16),
    #[error("quota exhausted")]
    Quota,
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("backend returned no text")]
    Empty,
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("query is empty")]
    InvalidQuery,

    #[error("all {} configured sources failed{}", .failures.len(), describe_failures(.failures))]
    AllSourcesFailed { failures: Vec<SourceUnavailable> },

    #[error("synthesis via {backend} failed: {cause}")]
    SynthesisFailed {
        backend: String,
        #[source]
        cause: BackendError,
    },

    #[error("rendering failed: {0}")]
    RenderFailed(String),

    #[error("cancelled during {phase}")]
    Cancelled { phase: PipelineState },
}

impl PipelineError {
    /// Stable machine-readable kind for API payloads and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::InvalidQuery => "invalid_query",
            PipelineError::AllSourcesFailed { .. } => "all_sources_failed",
            PipelineError::SynthesisFailed { .. } => "synthesis_failed",
            PipelineError::RenderFailed(_) => "render_failed",
            PipelineError::Cancelled { .. } => "cancelled",
        }
    }
}

fn describe_failures(failures: &[SourceUnavailable]) -> String {
    if failures.is_empty() {
        return String::new();
    }
    let parts: Vec<String> = failures.iter().map(|f| f.to_string()).collect();
    format!(": {}", parts.join("; "))
}
