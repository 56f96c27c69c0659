// src/lib.rs
// Public library surface for the binaries and integration tests.

pub mod aggregate;
pub mod api;
pub mod bootstrap;
pub mod config;
pub mod error;
pub mod metrics;
pub mod model;
pub mod orchestrator;
pub mod render;
pub mod sources;
pub mod synth;
pub mod telemetry;

// ---- Re-exports for stable public API ----
pub use crate::api::create_router;
pub use crate::bootstrap::ReportRuntime;
pub use crate::error::{BackendError, PipelineError, SourceFault, SourceUnavailable};
pub use crate::model::{AnalysisResult, NormalizedItem, Query, RawItem, SourceKind};
pub use crate::orchestrator::{Backends, Orchestrator, PipelineState, RunFailure, RunOutcome};
pub use crate::render::{ReportArtifact, ReportFormat, ReportRenderer};
