// src/orchestrator.rs
//! One query, end to end: Idle → Fetching → Synthesizing → Rendering → Done,
//! with `Failed` reachable from every non-terminal state.

use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::aggregate::{Aggregator, SourceStatus};
use crate::error::PipelineError;
use crate::model::{AnalysisResult, NormalizedItem, Query};
use crate::render::{ReportArtifact, ReportFormat, ReportRenderer};
use crate::sources::SourceClient;
use crate::synth::{NarrativeBackend, Synthesizer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Fetching,
    Synthesizing,
    Rendering,
    Done,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PipelineState::Idle => "idle",
            PipelineState::Fetching => "fetching",
            PipelineState::Synthesizing => "synthesizing",
            PipelineState::Rendering => "rendering",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        })
    }
}

/// Narrative backends for one run. `primary == None` means extractive synthesis.
#[derive(Clone, Default)]
pub struct Backends {
    pub primary: Option<Arc<dyn NarrativeBackend>>,
    /// Tried once if the primary fails.
    pub fallback: Option<Arc<dyn NarrativeBackend>>,
}

#[derive(Debug)]
pub struct RunOutcome {
    pub artifact: ReportArtifact,
    pub analysis: AnalysisResult,
    pub statuses: Vec<SourceStatus>,
    pub transitions: Vec<PipelineState>,
}

/// Why a run stopped, plus everything learned before it did.
#[derive(Debug)]
pub struct RunFailure {
    /// State the run was in when it failed.
    pub phase: PipelineState,
    pub error: PipelineError,
    pub statuses: Vec<SourceStatus>,
    pub transitions: Vec<PipelineState>,
}

impl fmt::Display for RunFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.phase, self.error)
    }
}

impl std::error::Error for RunFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

pub struct Orchestrator {
    sources: Vec<Arc<dyn SourceClient>>,
    aggregator: Aggregator,
    synthesizer: Synthesizer,
    backends: Backends,
    renderer: ReportRenderer,
    state: PipelineState,
    transitions: Vec<PipelineState>,
    statuses: Vec<SourceStatus>,
}

impl Orchestrator {
    pub fn new(
        sources: Vec<Arc<dyn SourceClient>>,
        aggregator: Aggregator,
        synthesizer: Synthesizer,
        backends: Backends,
        renderer: ReportRenderer,
    ) -> Self {
        Self {
            sources,
            aggregator,
            synthesizer,
            backends,
            renderer,
            state: PipelineState::Idle,
            transitions: vec![PipelineState::Idle],
            statuses: Vec::new(),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Runs the full pipeline for `input`. Consumes the orchestrator: one
    /// instance serves exactly one query.
    pub async fn run(
        self,
        input: &str,
        format: ReportFormat,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, RunFailure> {
        let t0 = Instant::now();
        let res = self.run_inner(input, format, cancel).await;
        histogram!("report_pipeline_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
        let outcome = match &res {
            Ok(_) => "done",
            Err(f) => f.error.kind(),
        };
        counter!("report_runs_total", "outcome" => outcome).increment(1);
        res
    }

    async fn run_inner(
        mut self,
        input: &str,
        format: ReportFormat,
        cancel: &CancellationToken,
    ) -> Result<RunOutcome, RunFailure> {
        let query = match Query::parse(input) {
            Ok(q) => q,
            Err(e) => return Err(self.fail(e)),
        };

        // Fetching
        self.check_cancelled(cancel, PipelineState::Fetching)?;
        self.enter(PipelineState::Fetching);
        tracing::info!(query = %query, sources = self.sources.len(), "fetching");
        let aggregation = match self
            .aggregator
            .aggregate_with_cancel(&query, &self.sources, cancel)
            .await
        {
            Ok(a) => a,
            Err(failure) => {
                self.statuses = failure.statuses;
                return Err(self.fail(failure.error));
            }
        };
        self.statuses = aggregation.statuses;
        let items = aggregation.items;

        // Synthesizing
        self.check_cancelled(cancel, PipelineState::Synthesizing)?;
        self.enter(PipelineState::Synthesizing);
        tracing::info!(query = %query, items = items.len(), "synthesizing");
        let analysis = tokio::select! {
            r = self.synthesize(&query, &items) => r,
            _ = cancel.cancelled() => Err(PipelineError::Cancelled { phase: PipelineState::Synthesizing }),
        };
        let analysis = match analysis {
            Ok(a) => a,
            Err(e) => return Err(self.fail(e)),
        };

        // Rendering runs to completion once started.
        self.check_cancelled(cancel, PipelineState::Rendering)?;
        self.enter(PipelineState::Rendering);
        let artifact = match self.renderer.render(&query, &analysis, format) {
            Ok(a) => a,
            Err(e) => return Err(self.fail(e)),
        };

        self.enter(PipelineState::Done);
        tracing::info!(
            query = %query,
            filename = %artifact.filename,
            bytes = artifact.bytes.len(),
            "report ready"
        );
        Ok(RunOutcome {
            artifact,
            analysis,
            statuses: self.statuses,
            transitions: self.transitions,
        })
    }

    /// Primary backend, then at most one retry on the fallback. Without any
    /// backend the analysis is extractive.
    async fn synthesize(
        &self,
        query: &Query,
        items: &[NormalizedItem],
    ) -> Result<AnalysisResult, PipelineError> {
        let Some(primary) = &self.backends.primary else {
            return Ok(self.synthesizer.summarize_extractive(query, items));
        };

        match self.synthesizer.synthesize(query, items, primary.as_ref()).await {
            Ok(a) => Ok(a),
            Err(first) => {
                let Some(fallback) = &self.backends.fallback else {
                    return Err(first);
                };
                tracing::warn!(
                    error = %first,
                    fallback = %fallback.name(),
                    "primary backend failed, retrying once"
                );
                counter!("report_synthesis_retries_total").increment(1);
                self.synthesizer
                    .synthesize(query, items, fallback.as_ref())
                    .await
            }
        }
    }

    fn enter(&mut self, next: PipelineState) {
        tracing::debug!(from = %self.state, to = %next, "state transition");
        self.state = next;
        self.transitions.push(next);
    }

    fn check_cancelled(
        &mut self,
        cancel: &CancellationToken,
        next: PipelineState,
    ) -> Result<(), RunFailure> {
        if cancel.is_cancelled() {
            tracing::info!(before = %next, "run cancelled");
            // Cancellation is attributed to the phase that would have started.
            self.state = next;
            return Err(self.fail_in_place(PipelineError::Cancelled { phase: next }));
        }
        Ok(())
    }

    fn fail(mut self, error: PipelineError) -> RunFailure {
        self.fail_in_place(error)
    }

    fn fail_in_place(&mut self, error: PipelineError) -> RunFailure {
        let phase = self.state;
        tracing::warn!(phase = %phase, kind = error.kind(), error = %error, "run failed");
        self.state = PipelineState::Failed;
        self.transitions.push(PipelineState::Failed);
        RunFailure {
            phase,
            error,
            statuses: std::mem::take(&mut self.statuses),
            transitions: std::mem::take(&mut self.transitions),
        }
    }
}
