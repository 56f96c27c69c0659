// src/metrics.rs
use anyhow::Context;
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!(
            "report_runs_total",
            "Pipeline runs, labelled by outcome (done or error kind)."
        );
        describe_counter!(
            "report_source_errors_total",
            "Per-source fetch failures absorbed by the aggregator."
        );
        describe_counter!(
            "report_items_total",
            "Normalized evidence items produced by the aggregator."
        );
        describe_counter!(
            "report_synthesis_retries_total",
            "Synthesis retries on the fallback backend."
        );
        describe_histogram!(
            "report_pipeline_ms",
            "End-to-end pipeline time in milliseconds."
        );
    });
}

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder for this process.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .context("prometheus: install recorder")?;
        ensure_described();
        Ok(Self { handle })
    }

    /// Returns a router exposing `/metrics` with the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
