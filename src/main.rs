//! Company intelligence report service: binary entrypoint.
//! Boots the Axum HTTP server with the report pipeline and Prometheus metrics.

use std::sync::Arc;

use anyhow::Context;
use shuttle_axum::ShuttleAxum;

use company_intel::bootstrap::ReportRuntime;
use company_intel::config::{credentials, PipelineConfig};
use company_intel::metrics::Metrics;
use company_intel::{api, telemetry};

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    telemetry::init_tracing();

    let config = PipelineConfig::load_default().context("loading pipeline config")?;
    let creds = credentials::init_global();
    let runtime = ReportRuntime::build(config, creds).context("building report runtime")?;

    let metrics = Metrics::init()?;
    let router = api::create_router(Arc::new(runtime)).merge(metrics.router());

    Ok(router.into())
}
