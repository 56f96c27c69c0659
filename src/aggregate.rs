// src/aggregate.rs
//! Fan-out over the configured sources, normalization into `NormalizedItem`s.

use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use metrics::counter;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use tokio_util::sync::CancellationToken;

use crate::error::{PipelineError, SourceFault, SourceUnavailable};
use crate::model::{NormalizedItem, Query, RawItem, SourceKind};
use crate::orchestrator::PipelineState;
use crate::sources::SourceClient;

static RE_TAGS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)</?[^>]+>").expect("tag regex"));
static RE_WS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("whitespace regex"));

/// Normalize vendor text: decode entities, strip tags, fold typographic quotes,
/// collapse whitespace.
pub fn normalize_text(s: &str) -> String {
    let decoded = html_escape::decode_html_entities(s);
    let untagged = RE_TAGS.replace_all(&decoded, " ");
    let folded = untagged
        .replace(['\u{201C}', '\u{201D}', '\u{00AB}', '\u{00BB}'], "\"")
        .replace(['\u{2018}', '\u{2019}'], "'");
    RE_WS.replace_all(&folded, " ").trim().to_string()
}

/// Cut to at most `max_chars` characters; a cut text ends in `…`.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars.saturating_sub(1)).collect();
    let trimmed_len = out.trim_end().len();
    out.truncate(trimmed_len);
    out.push('…');
    out
}

/// Outcome of one source within a run; reported to the caller even when the run fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceOutcome {
    Ok { items: usize },
    Failed(SourceFault),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceStatus {
    pub source: SourceKind,
    pub outcome: SourceOutcome,
}

impl SourceStatus {
    pub fn is_ok(&self) -> bool {
        matches!(self.outcome, SourceOutcome::Ok { .. })
    }
}

/// Serializable view of a `SourceStatus` for API payloads.
#[derive(Debug, Clone, Serialize)]
pub struct SourceStatusView {
    pub source: &'static str,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&SourceStatus> for SourceStatusView {
    fn from(s: &SourceStatus) -> Self {
        match &s.outcome {
            SourceOutcome::Ok { items } => Self {
                source: s.source.id(),
                ok: true,
                items: Some(*items),
                error: None,
            },
            SourceOutcome::Failed(fault) => Self {
                source: s.source.id(),
                ok: false,
                items: None,
                error: Some(fault.to_string()),
            },
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Aggregation {
    pub items: Vec<NormalizedItem>,
    pub statuses: Vec<SourceStatus>,
}

/// A fetch that ended the run, with whatever the sources reported before it did.
#[derive(Debug)]
pub struct FetchFailure {
    pub error: PipelineError,
    pub statuses: Vec<SourceStatus>,
}

#[derive(Debug, Clone)]
pub struct Aggregator {
    limit: usize,
    timeout: Duration,
    excerpt_max_chars: usize,
}

impl Aggregator {
    pub fn new(limit: usize, timeout: Duration, excerpt_max_chars: usize) -> Self {
        Self {
            limit,
            timeout,
            excerpt_max_chars,
        }
    }

    pub async fn aggregate(
        &self,
        query: &Query,
        clients: &[Arc<dyn SourceClient>],
    ) -> Result<Aggregation, PipelineError> {
        self.aggregate_with_cancel(query, clients, &CancellationToken::new())
            .await
            .map_err(|f| f.error)
    }

    /// Calls every client concurrently and waits for all of them.
    ///
    /// Fails only when every client failed (`AllSourcesFailed`) or `cancel` fired
    /// while requests were in flight. Either way the failure carries the status of
    /// each source that had already answered.
    pub async fn aggregate_with_cancel(
        &self,
        query: &Query,
        clients: &[Arc<dyn SourceClient>],
        cancel: &CancellationToken,
    ) -> Result<Aggregation, FetchFailure> {
        if clients.is_empty() {
            tracing::warn!("no sources configured");
            return Err(FetchFailure {
                error: PipelineError::AllSourcesFailed {
                    failures: Vec::new(),
                },
                statuses: Vec::new(),
            });
        }

        let mut slots: Vec<Option<Result<Vec<RawItem>, SourceUnavailable>>> =
            clients.iter().map(|_| None).collect();
        let mut pending: FuturesUnordered<_> = clients
            .iter()
            .enumerate()
            .map(|(i, c)| async move { (i, self.fetch_one(c.as_ref(), query).await) })
            .collect();

        let mut cancelled = false;
        loop {
            tokio::select! {
                next = pending.next() => match next {
                    Some((i, result)) => slots[i] = Some(result),
                    None => break,
                },
                _ = cancel.cancelled() => {
                    cancelled = true;
                    break;
                }
            }
        }
        drop(pending);

        let (out, failures) = self.collect(clients, slots);

        if cancelled {
            tracing::info!(
                answered = out.statuses.len(),
                "fetch cancelled, dropping in-flight source requests"
            );
            return Err(FetchFailure {
                error: PipelineError::Cancelled {
                    phase: PipelineState::Fetching,
                },
                statuses: out.statuses,
            });
        }

        if failures.len() == clients.len() {
            return Err(FetchFailure {
                error: PipelineError::AllSourcesFailed { failures },
                statuses: out.statuses,
            });
        }

        counter!("report_items_total").increment(out.items.len() as u64);
        Ok(out)
    }

    /// Folds answered slots into items and statuses, in client order. Slots still
    /// empty (cancelled before answering) are skipped.
    fn collect(
        &self,
        clients: &[Arc<dyn SourceClient>],
        slots: Vec<Option<Result<Vec<RawItem>, SourceUnavailable>>>,
    ) -> (Aggregation, Vec<SourceUnavailable>) {
        let mut out = Aggregation::default();
        let mut failures = Vec::new();
        for (client, slot) in clients.iter().zip(slots) {
            let kind = client.kind();
            match slot {
                None => {}
                Some(Ok(raw)) => {
                    let before = out.items.len();
                    out.items.extend(
                        raw.into_iter()
                            .filter_map(|r| normalize_item(kind, r, self.excerpt_max_chars)),
                    );
                    let n = out.items.len() - before;
                    tracing::debug!(source = kind.id(), items = n, "source ok");
                    out.statuses.push(SourceStatus {
                        source: kind,
                        outcome: SourceOutcome::Ok { items: n },
                    });
                }
                Some(Err(e)) => {
                    tracing::warn!(error = %e, source = kind.id(), "source failed");
                    counter!("report_source_errors_total", "source" => kind.id()).increment(1);
                    out.statuses.push(SourceStatus {
                        source: kind,
                        outcome: SourceOutcome::Failed(e.fault.clone()),
                    });
                    failures.push(e);
                }
            }
        }
        (out, failures)
    }

    async fn fetch_one(
        &self,
        client: &dyn SourceClient,
        query: &Query,
    ) -> Result<Vec<RawItem>, SourceUnavailable> {
        match tokio::time::timeout(self.timeout, client.fetch(query, self.limit)).await {
            Ok(Ok(mut items)) => {
                items.truncate(self.limit);
                Ok(items)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(SourceUnavailable::new(
                client.kind(),
                SourceFault::Timeout(self.timeout),
            )),
        }
    }
}

/// Project a raw item onto the source-agnostic record. Items with neither a title
/// nor any body text carry no evidence and are dropped.
pub fn normalize_item(source: SourceKind, raw: RawItem, excerpt_max_chars: usize) -> Option<NormalizedItem> {
    let title = normalize_text(&raw.title);
    let excerpt = truncate_chars(&normalize_text(&raw.body), excerpt_max_chars);
    if title.is_empty() && excerpt.is_empty() {
        return None;
    }
    Some(NormalizedItem {
        source,
        title,
        excerpt,
        link: raw.url.trim().to_string(),
    })
}
