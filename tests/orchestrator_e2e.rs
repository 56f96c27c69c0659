// tests/orchestrator_e2e.rs
//
// End-to-end runs through the orchestrator with in-memory sources and backends.

mod common;

use std::sync::Arc;
use std::time::Duration;

use company_intel::aggregate::{Aggregator, SourceOutcome};
use company_intel::error::{BackendError, PipelineError, SourceFault};
use company_intel::model::{SourceKind, NO_DATA_OVERVIEW};
use company_intel::orchestrator::{Backends, Orchestrator, PipelineState};
use company_intel::render::ReportFormat;
use company_intel::sources::SourceClient;
use company_intel::synth::{NarrativeBackend, Synthesizer};
use tokio_util::sync::CancellationToken;

use common::*;

fn orchestrator(sources: Vec<Arc<dyn SourceClient>>, backends: Backends) -> Orchestrator {
    Orchestrator::new(
        sources,
        Aggregator::new(5, Duration::from_secs(2), 300),
        Synthesizer::new(5, 700, Duration::from_secs(5)),
        backends,
        renderer(),
    )
}

fn with_primary(b: Arc<dyn NarrativeBackend>) -> Backends {
    Backends {
        primary: Some(b),
        fallback: None,
    }
}

fn acme_items() -> Vec<company_intel::model::RawItem> {
    vec![
        raw(
            "Acme Co opens new anvil plant",
            "<p>Acme &amp; partners expand production.</p>",
            "https://news.test/acme-plant",
        ),
        raw(
            "Acme Co quarterly results",
            "Revenue grew 12% year over year.",
            "https://news.test/acme-q1",
        ),
        raw(
            "Acme Co hires new CTO",
            "The former Globex engineering lead joins in June.",
            "https://news.test/acme-cto",
        ),
    ]
}

const REPLY_WITHOUT_SENTIMENT: &str = "Overview: Acme Co builds anvils for the cartoon market.\n\
Key Findings:\n- Revenue grew in 2023.\n- New CTO hired.\n\
Recommendations:\n- Pitch durability testing.";

#[tokio::test(start_paused = true)]
async fn acme_report_survives_a_timed_out_source() {
    let web = StaticSource::new(SourceKind::WebSearch, acme_items());
    let slow = SlowSource::new(SourceKind::NewsData, Duration::from_secs(60), vec![]);
    let backend = CountingBackend::new("stub", REPLY_WITHOUT_SENTIMENT);

    let sources: Vec<Arc<dyn SourceClient>> = vec![web.clone(), slow];
    let out = orchestrator(sources, with_primary(backend.clone()))
        .run("Acme Co", ReportFormat::Text, &CancellationToken::new())
        .await
        .expect("run should succeed");

    assert_eq!(
        out.transitions,
        vec![
            PipelineState::Idle,
            PipelineState::Fetching,
            PipelineState::Synthesizing,
            PipelineState::Rendering,
            PipelineState::Done,
        ]
    );
    assert_eq!(out.statuses.len(), 2);
    assert_eq!(out.statuses[0].outcome, SourceOutcome::Ok { items: 3 });
    assert!(matches!(
        out.statuses[1].outcome,
        SourceOutcome::Failed(SourceFault::Timeout(_))
    ));

    assert_eq!(backend.calls(), 1);
    let prompt = backend.prompts.lock()[0].clone();
    assert!(prompt.contains("Acme Co opens new anvil plant"));
    assert!(prompt.contains("Acme & partners expand production."));

    assert_eq!(out.artifact.filename, "Acme_Co_2024-05-17.txt");
    let text = String::from_utf8(out.artifact.bytes).unwrap();
    assert!(text.starts_with("Company Intelligence Report: Acme Co\nGenerated: 2024-05-17\n"));
    assert!(text.contains("Overview\n--------\nAcme Co builds anvils for the cartoon market."));
    assert!(text.contains("- Revenue grew in 2023."));
    assert!(text.contains("https://news.test/acme-q1"));
    assert!(text.contains("https://news.test/acme-cto"));
    assert_eq!(out.analysis.sentiment, None);
    assert!(!text.contains("\nSentiment\n"));
}

#[tokio::test]
async fn blank_query_is_rejected_before_any_fetch() {
    let web = StaticSource::new(SourceKind::WebSearch, acme_items());
    let backend = CountingBackend::new("stub", STRUCTURED_REPLY);
    let sources: Vec<Arc<dyn SourceClient>> = vec![web.clone()];

    let err = orchestrator(sources, with_primary(backend.clone()))
        .run("   ", ReportFormat::Pdf, &CancellationToken::new())
        .await
        .expect_err("blank query must fail");

    assert!(matches!(err.error, PipelineError::InvalidQuery));
    assert_eq!(err.phase, PipelineState::Idle);
    assert_eq!(err.transitions, vec![PipelineState::Idle, PipelineState::Failed]);
    assert_eq!(web.calls(), 0);
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn all_sources_empty_yields_no_data_report_without_backend_call() {
    let a = StaticSource::new(SourceKind::WebSearch, vec![]);
    let b = StaticSource::new(SourceKind::GNews, vec![]);
    let backend = CountingBackend::new("stub", STRUCTURED_REPLY);
    let sources: Vec<Arc<dyn SourceClient>> = vec![a, b];

    let out = orchestrator(sources, with_primary(backend.clone()))
        .run("Nobody Inc", ReportFormat::Text, &CancellationToken::new())
        .await
        .expect("empty evidence is not an error");

    assert_eq!(out.analysis.overview, NO_DATA_OVERVIEW);
    assert_eq!(backend.calls(), 0);
    assert!(out.statuses.iter().all(|s| s.is_ok()));
    let text = String::from_utf8(out.artifact.bytes).unwrap();
    assert_eq!(
        text,
        format!(
            "Company Intelligence Report: Nobody Inc\nGenerated: 2024-05-17\n\n\
             Overview\n--------\n{NO_DATA_OVERVIEW}\n"
        )
    );
}

#[tokio::test]
async fn all_sources_failing_aborts_in_fetching() {
    let a = FailingSource::new(SourceKind::WebSearch, SourceFault::Auth(401));
    let b = FailingSource::new(SourceKind::NewsData, SourceFault::RateLimited);
    let backend = CountingBackend::new("stub", STRUCTURED_REPLY);
    let sources: Vec<Arc<dyn SourceClient>> = vec![a, b];

    let err = orchestrator(sources, with_primary(backend.clone()))
        .run("Acme Co", ReportFormat::Pdf, &CancellationToken::new())
        .await
        .expect_err("must fail");

    assert_eq!(err.phase, PipelineState::Fetching);
    match &err.error {
        PipelineError::AllSourcesFailed { failures } => assert_eq!(failures.len(), 2),
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(err.statuses.len(), 2);
    assert!(err.statuses.iter().all(|s| !s.is_ok()));
    assert_eq!(backend.calls(), 0);
    assert_eq!(err.transitions.last(), Some(&PipelineState::Failed));
}

#[tokio::test]
async fn no_sources_at_all_counts_as_all_failed() {
    let err = orchestrator(vec![], Backends::default())
        .run("Acme Co", ReportFormat::Text, &CancellationToken::new())
        .await
        .expect_err("no sources");
    assert!(matches!(
        err.error,
        PipelineError::AllSourcesFailed { ref failures } if failures.is_empty()
    ));
}

#[tokio::test]
async fn fallback_backend_is_tried_once_after_primary_fails() {
    let web = StaticSource::new(SourceKind::WebSearch, acme_items());
    let primary = FailingBackend::new("primary", BackendError::Quota);
    let fallback = CountingBackend::new("fallback", STRUCTURED_REPLY);
    let sources: Vec<Arc<dyn SourceClient>> = vec![web];

    let out = orchestrator(
        sources,
        Backends {
            primary: Some(primary.clone()),
            fallback: Some(fallback.clone()),
        },
    )
    .run("Acme Co", ReportFormat::Pdf, &CancellationToken::new())
    .await
    .expect("fallback should rescue the run");

    assert_eq!(primary.calls(), 1);
    assert_eq!(fallback.calls(), 1);
    assert_eq!(out.analysis.sentiment.as_deref(), Some("Positive"));
    assert!(out.artifact.bytes.starts_with(b"%PDF"));
}

#[tokio::test]
async fn both_backends_failing_is_synthesis_failed() {
    let web = StaticSource::new(SourceKind::WebSearch, acme_items());
    let primary = FailingBackend::new("primary", BackendError::Status(500));
    let fallback = FailingBackend::new("fallback", BackendError::Auth(401));
    let sources: Vec<Arc<dyn SourceClient>> = vec![web];

    let err = orchestrator(
        sources,
        Backends {
            primary: Some(primary.clone()),
            fallback: Some(fallback.clone()),
        },
    )
    .run("Acme Co", ReportFormat::Text, &CancellationToken::new())
    .await
    .expect_err("both backends down");

    assert_eq!(err.phase, PipelineState::Synthesizing);
    match &err.error {
        PipelineError::SynthesisFailed { backend, cause } => {
            assert_eq!(backend, "fallback");
            assert_eq!(cause, &BackendError::Auth(401));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(primary.calls(), 1);
    assert_eq!(fallback.calls(), 1);
    // Source diagnostics survive the failure.
    assert_eq!(err.statuses.len(), 1);
}

#[tokio::test]
async fn without_backend_the_report_is_extractive() {
    let web = StaticSource::new(SourceKind::WebSearch, acme_items());
    let sources: Vec<Arc<dyn SourceClient>> = vec![web];

    let out = orchestrator(sources, Backends::default())
        .run("Acme Co", ReportFormat::Text, &CancellationToken::new())
        .await
        .expect("extractive run");

    assert_eq!(out.analysis.overview, "Acme & partners expand production.");
    assert_eq!(
        out.analysis.findings[0],
        "Acme Co opens new anvil plant (https://news.test/acme-plant)"
    );
    assert_eq!(out.analysis.references.len(), 3);
    assert_eq!(out.analysis.sentiment, None);
}

#[tokio::test]
async fn cancelled_before_start_never_fetches() {
    let web = StaticSource::new(SourceKind::WebSearch, acme_items());
    let sources: Vec<Arc<dyn SourceClient>> = vec![web.clone()];
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = orchestrator(sources, Backends::default())
        .run("Acme Co", ReportFormat::Text, &cancel)
        .await
        .expect_err("cancelled");

    assert!(matches!(
        err.error,
        PipelineError::Cancelled {
            phase: PipelineState::Fetching
        }
    ));
    assert_eq!(err.phase, PipelineState::Fetching);
    assert_eq!(web.calls(), 0);
}

#[tokio::test(start_paused = true)]
async fn cancel_while_fetching_drops_in_flight_requests() {
    let slow = SlowSource::new(SourceKind::GNews, Duration::from_secs(1), acme_items());
    let sources: Vec<Arc<dyn SourceClient>> = vec![slow];
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = orchestrator(sources, Backends::default())
        .run("Acme Co", ReportFormat::Text, &cancel)
        .await
        .expect_err("cancelled mid-fetch");

    assert_eq!(err.phase, PipelineState::Fetching);
    assert_eq!(err.error.kind(), "cancelled");
}

#[tokio::test(start_paused = true)]
async fn cancel_while_fetching_keeps_answered_sources() {
    let fast = StaticSource::new(SourceKind::WebSearch, acme_items());
    let slow = SlowSource::new(SourceKind::GNews, Duration::from_secs(1), acme_items());
    let sources: Vec<Arc<dyn SourceClient>> = vec![fast.clone(), slow];
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let err = orchestrator(sources, Backends::default())
        .run("Acme Co", ReportFormat::Text, &cancel)
        .await
        .expect_err("cancelled mid-fetch");

    assert!(matches!(
        err.error,
        PipelineError::Cancelled {
            phase: PipelineState::Fetching
        }
    ));
    assert_eq!(fast.calls(), 1);
    assert_eq!(err.statuses.len(), 1);
    assert_eq!(err.statuses[0].source, SourceKind::WebSearch);
    assert_eq!(err.statuses[0].outcome, SourceOutcome::Ok { items: 3 });
}
