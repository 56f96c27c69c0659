// tests/common/mod.rs
//
// Shared stubs for integration tests: in-memory sources and narrative backends.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;

use company_intel::error::{BackendError, SourceFault, SourceUnavailable};
use company_intel::model::{NormalizedItem, Query, RawItem, SourceKind};
use company_intel::render::ReportRenderer;
use company_intel::synth::NarrativeBackend;
use company_intel::sources::SourceClient;

pub fn fixed_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 5, 17).expect("valid date")
}

pub fn renderer() -> ReportRenderer {
    ReportRenderer::on(fixed_date())
}

pub fn raw(title: &str, body: &str, url: &str) -> RawItem {
    RawItem {
        title: title.to_string(),
        body: body.to_string(),
        url: url.to_string(),
        source_id: "stub".to_string(),
    }
}

pub fn item(source: SourceKind, title: &str, excerpt: &str, link: &str) -> NormalizedItem {
    NormalizedItem {
        source,
        title: title.to_string(),
        excerpt: excerpt.to_string(),
        link: link.to_string(),
    }
}

/// Returns the same items on every call and counts calls.
pub struct StaticSource {
    pub kind: SourceKind,
    pub items: Vec<RawItem>,
    pub calls: AtomicUsize,
}

impl StaticSource {
    pub fn new(kind: SourceKind, items: Vec<RawItem>) -> Arc<Self> {
        Arc::new(Self {
            kind,
            items,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceClient for StaticSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(&self, _query: &Query, _limit: usize) -> Result<Vec<RawItem>, SourceUnavailable> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.items.clone())
    }
}

/// Always fails with the given fault.
pub struct FailingSource {
    pub kind: SourceKind,
    pub fault: SourceFault,
    pub calls: AtomicUsize,
}

impl FailingSource {
    pub fn new(kind: SourceKind, fault: SourceFault) -> Arc<Self> {
        Arc::new(Self {
            kind,
            fault,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceClient for FailingSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(&self, _query: &Query, _limit: usize) -> Result<Vec<RawItem>, SourceUnavailable> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(SourceUnavailable::new(self.kind, self.fault.clone()))
    }
}

/// Sleeps before answering; used to trip the per-source timeout.
pub struct SlowSource {
    pub kind: SourceKind,
    pub delay: Duration,
    pub items: Vec<RawItem>,
}

impl SlowSource {
    pub fn new(kind: SourceKind, delay: Duration, items: Vec<RawItem>) -> Arc<Self> {
        Arc::new(Self { kind, delay, items })
    }
}

#[async_trait]
impl SourceClient for SlowSource {
    fn kind(&self) -> SourceKind {
        self.kind
    }

    async fn fetch(&self, _query: &Query, _limit: usize) -> Result<Vec<RawItem>, SourceUnavailable> {
        tokio::time::sleep(self.delay).await;
        Ok(self.items.clone())
    }
}

/// Returns fixed text and records the prompts it saw.
pub struct CountingBackend {
    pub label: String,
    pub reply: String,
    pub calls: AtomicUsize,
    pub prompts: parking_lot::Mutex<Vec<String>>,
}

impl CountingBackend {
    pub fn new(label: &str, reply: &str) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            reply: reply.to_string(),
            calls: AtomicUsize::new(0),
            prompts: parking_lot::Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NarrativeBackend for CountingBackend {
    fn name(&self) -> String {
        self.label.clone()
    }

    async fn generate(&self, prompt: &str, _max_output_tokens: u32) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.to_string());
        Ok(self.reply.clone())
    }
}

/// Always fails with the given error.
pub struct FailingBackend {
    pub label: String,
    pub error: BackendError,
    pub calls: AtomicUsize,
}

impl FailingBackend {
    pub fn new(label: &str, error: BackendError) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            error,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl NarrativeBackend for FailingBackend {
    fn name(&self) -> String {
        self.label.clone()
    }

    async fn generate(&self, _prompt: &str, _max_output_tokens: u32) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(self.error.clone())
    }
}

pub const STRUCTURED_REPLY: &str = "Overview: Acme Co builds anvils for the cartoon market.\n\
Key Findings:\n- Revenue grew in 2023.\n- New factory opened.\n\
Sentiment: Positive\n\
Recommendations:\n- Pitch durability testing.\n\
Pitch: Acme needs faster QA.";
