// src/api.rs
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;

use crate::aggregate::{SourceStatus, SourceStatusView};
use crate::bootstrap::ReportRuntime;
use crate::error::PipelineError;
use crate::orchestrator::{PipelineState, RunFailure, RunOutcome};
use crate::render::ReportFormat;

pub const HDR_SOURCES_OK: &str = "x-sources-ok";
pub const HDR_SOURCES_FAILED: &str = "x-sources-failed";

#[derive(Clone)]
pub struct AppState {
    pub runtime: Arc<ReportRuntime>,
    /// Cancelled on shutdown; every run gets a child token.
    pub shutdown: CancellationToken,
}

pub fn create_router(runtime: Arc<ReportRuntime>) -> Router {
    create_router_with_shutdown(runtime, CancellationToken::new())
}

pub fn create_router_with_shutdown(
    runtime: Arc<ReportRuntime>,
    shutdown: CancellationToken,
) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/report", post(report))
        .layer(CorsLayer::very_permissive())
        .with_state(AppState { runtime, shutdown })
}

/// A missing `query` is treated as blank; `format` accepts anything
/// `ReportFormat::from_str` does.
#[derive(Debug, Deserialize)]
pub struct ReportReq {
    #[serde(default)]
    pub query: String,
    #[serde(default)]
    pub format: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResp {
    pub phase: PipelineState,
    pub kind: &'static str,
    pub message: String,
    pub sources: Vec<SourceStatusView>,
}

async fn report(
    State(state): State<AppState>,
    payload: Result<Json<ReportReq>, JsonRejection>,
) -> Response {
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => {
            tracing::debug!(error = %rejection.body_text(), "rejected report request");
            return request_error("invalid_request", rejection.body_text());
        }
    };
    let format = match body.format.as_deref() {
        None => state.runtime.config.report.default_format,
        Some(raw) => match raw.parse::<ReportFormat>() {
            Ok(f) => f,
            Err(msg) => return request_error("invalid_format", msg),
        },
    };
    let cancel = state.shutdown.child_token();

    match state
        .runtime
        .orchestrator()
        .run(&body.query, format, &cancel)
        .await
    {
        Ok(outcome) => artifact_response(outcome),
        Err(failure) => error_response(failure),
    }
}

fn artifact_response(outcome: RunOutcome) -> Response {
    let artifact = outcome.artifact;
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static(artifact.format.content_type()),
    );
    match HeaderValue::from_str(&content_disposition(&artifact.filename)) {
        Ok(v) => {
            headers.insert(header::CONTENT_DISPOSITION, v);
        }
        Err(e) => tracing::warn!(error = ?e, "content-disposition not representable"),
    }
    insert_ids(&mut headers, HDR_SOURCES_OK, &outcome.statuses, true);
    insert_ids(&mut headers, HDR_SOURCES_FAILED, &outcome.statuses, false);

    (StatusCode::OK, headers, artifact.bytes).into_response()
}

/// Non-ASCII names get an ASCII fallback plus an RFC 5987 `filename*`.
fn content_disposition(filename: &str) -> String {
    if filename.is_ascii() {
        return format!("attachment; filename=\"{filename}\"");
    }
    let fallback: String = filename
        .chars()
        .map(|c| if c.is_ascii_graphic() { c } else { '_' })
        .collect();
    let encoded: String = filename
        .bytes()
        .map(|b| match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'.' | b'-' | b'_' => (b as char).to_string(),
            _ => format!("%{b:02X}"),
        })
        .collect();
    format!("attachment; filename=\"{fallback}\"; filename*=UTF-8''{encoded}")
}

fn insert_ids(headers: &mut HeaderMap, name: &'static str, statuses: &[SourceStatus], ok: bool) {
    let ids = statuses
        .iter()
        .filter(|s| s.is_ok() == ok)
        .map(|s| s.source.id())
        .collect::<Vec<_>>()
        .join(",");
    if let Ok(v) = HeaderValue::from_str(&ids) {
        headers.insert(HeaderName::from_static(name), v);
    }
}

pub fn status_for(error: &PipelineError) -> StatusCode {
    match error {
        PipelineError::InvalidQuery => StatusCode::BAD_REQUEST,
        PipelineError::AllSourcesFailed { .. } | PipelineError::SynthesisFailed { .. } => {
            StatusCode::BAD_GATEWAY
        }
        PipelineError::RenderFailed(_) => StatusCode::INTERNAL_SERVER_ERROR,
        PipelineError::Cancelled { .. } => StatusCode::SERVICE_UNAVAILABLE,
    }
}

/// Requests refused before a run starts.
fn request_error(kind: &'static str, message: String) -> Response {
    let body = ErrorResp {
        phase: PipelineState::Idle,
        kind,
        message,
        sources: Vec::new(),
    };
    (StatusCode::BAD_REQUEST, Json(body)).into_response()
}

fn error_response(failure: RunFailure) -> Response {
    if let PipelineError::Cancelled { phase } = &failure.error {
        tracing::info!(phase = %phase, answered = failure.statuses.len(), "report run cancelled");
    }
    let status = status_for(&failure.error);
    let body = ErrorResp {
        phase: failure.phase,
        kind: failure.error.kind(),
        message: failure.error.to_string(),
        sources: failure.statuses.iter().map(SourceStatusView::from).collect(),
    };
    (status, Json(body)).into_response()
}
