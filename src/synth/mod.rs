// src/synth/mod.rs
//! Synthesis: evidence → `AnalysisResult`, optionally through a narrative backend.

pub mod backend;

use std::fmt::Write as _;
use std::time::Duration;

use crate::error::{BackendError, PipelineError};
use crate::model::{AnalysisResult, NormalizedItem, Query, Reference};

pub use backend::{MockBackend, NarrativeBackend, OpenAiBackend};

#[derive(Debug, Clone)]
pub struct Synthesizer {
    top_n: usize,
    max_output_tokens: u32,
    timeout: Duration,
}

impl Synthesizer {
    pub fn new(top_n: usize, max_output_tokens: u32, timeout: Duration) -> Self {
        Self {
            top_n: top_n.max(1),
            max_output_tokens,
            timeout,
        }
    }

    /// Builds the analysis through `backend`.
    ///
    /// An empty evidence set never reaches the backend and yields the
    /// "no data available" result. Backend failures are returned as
    /// `SynthesisFailed`; choosing another backend is up to the caller.
    pub async fn synthesize(
        &self,
        query: &Query,
        items: &[NormalizedItem],
        backend: &dyn NarrativeBackend,
    ) -> Result<AnalysisResult, PipelineError> {
        if items.is_empty() {
            tracing::info!(query = %query, "no evidence, skipping narrative backend");
            return Ok(AnalysisResult::no_data());
        }

        let evidence = &items[..items.len().min(self.top_n)];
        let prompt = build_prompt(query, evidence);
        tracing::debug!(
            backend = %backend.name(),
            evidence = evidence.len(),
            prompt_chars = prompt.chars().count(),
            "calling narrative backend"
        );

        let raw = match tokio::time::timeout(
            self.timeout,
            backend.generate(&prompt, self.max_output_tokens),
        )
        .await
        {
            Ok(Ok(text)) => text,
            Ok(Err(cause)) => return Err(synthesis_failed(backend, cause)),
            Err(_) => return Err(synthesis_failed(backend, BackendError::Timeout(self.timeout))),
        };

        if raw.trim().is_empty() {
            return Err(synthesis_failed(backend, BackendError::Empty));
        }

        let mut analysis = parse_sections(&raw).unwrap_or_else(|| AnalysisResult::from_prose(&raw));
        analysis.references = references(evidence);
        Ok(analysis)
    }

    /// Deterministic analysis straight from the evidence, used when no narrative
    /// backend is configured.
    pub fn summarize_extractive(&self, query: &Query, items: &[NormalizedItem]) -> AnalysisResult {
        if items.is_empty() {
            return AnalysisResult::no_data();
        }
        let evidence = &items[..items.len().min(self.top_n)];

        let overview = items
            .iter()
            .find(|i| !i.excerpt.is_empty())
            .map(|i| i.excerpt.clone())
            .unwrap_or_else(|| format!("{} items found for {query}.", items.len()));

        let findings = evidence
            .iter()
            .map(|i| {
                let label = if i.title.is_empty() { &i.excerpt } else { &i.title };
                if i.link.is_empty() {
                    label.clone()
                } else {
                    format!("{label} ({})", i.link)
                }
            })
            .collect();

        AnalysisResult {
            overview,
            findings,
            references: references(evidence),
            ..AnalysisResult::default()
        }
    }
}

fn synthesis_failed(backend: &dyn NarrativeBackend, cause: BackendError) -> PipelineError {
    tracing::warn!(backend = %backend.name(), error = %cause, "narrative backend failed");
    PipelineError::SynthesisFailed {
        backend: backend.name(),
        cause,
    }
}

fn references(evidence: &[NormalizedItem]) -> Vec<Reference> {
    evidence
        .iter()
        .filter(|i| !i.link.is_empty())
        .map(|i| Reference {
            title: if i.title.is_empty() {
                i.link.clone()
            } else {
                i.title.clone()
            },
            link: i.link.clone(),
        })
        .collect()
}

/// Single bounded prompt: the query plus `title + excerpt` of each evidence item.
pub fn build_prompt(query: &Query, evidence: &[NormalizedItem]) -> String {
    let mut p = String::new();
    let _ = writeln!(p, "Subject: {query}");
    let _ = writeln!(p);
    let _ = writeln!(p, "Evidence:");
    for (i, item) in evidence.iter().enumerate() {
        let _ = writeln!(p, "{}. [{}] {}", i + 1, item.source, item.title);
        if !item.excerpt.is_empty() {
            let _ = writeln!(p, "   {}", item.excerpt);
        }
    }
    let _ = writeln!(p);
    p.push_str(
        "Write a short intelligence brief about the subject using these labelled sections:\n\
         Overview: one paragraph on who they are and what they do.\n\
         Key Findings: 3-5 bullet points drawn from the evidence.\n\
         Sentiment: one line on the public/media sentiment, if the evidence shows any.\n\
         Recommendations: 2-3 bullet points on pain points we could help with.\n\
         Pitch: two sentences pitching our services to them.\n",
    );
    p
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Overview,
    Findings,
    Sentiment,
    Recommendations,
    Pitch,
}

fn section_for_label(label: &str) -> Option<Section> {
    match label.trim().to_ascii_lowercase().as_str() {
        "overview" | "summary" | "company overview" => Some(Section::Overview),
        "key findings" | "findings" | "pain points" => Some(Section::Findings),
        "sentiment" | "social sentiment" | "media sentiment" => Some(Section::Sentiment),
        "recommendations" | "suggested actions" => Some(Section::Recommendations),
        "pitch" | "sales pitch" => Some(Section::Pitch),
        _ => None,
    }
}

/// Recognises `Label: text`, `**Label:** text`, `## Label` and `Label` heading lines.
/// Returns the section and any text following the label on the same line.
fn match_heading(line: &str) -> Option<(Section, &str)> {
    let t = line.trim().trim_start_matches('#').trim_start();
    // Only bold markup is noise; a single `* ` is a list bullet.
    let t = t.strip_prefix("**").unwrap_or(t);
    if let Some((label, rest)) = t.split_once(':') {
        if let Some(sec) = section_for_label(label.trim_end_matches('*')) {
            return Some((sec, rest.trim_start_matches('*').trim()));
        }
    }
    let bare = t.trim_end_matches(['*', ' ']);
    section_for_label(bare).map(|sec| (sec, ""))
}

fn strip_bullet(line: &str) -> &str {
    let t = line.trim();
    for prefix in ["- ", "* ", "• ", "· "] {
        if let Some(rest) = t.strip_prefix(prefix) {
            return rest.trim();
        }
    }
    // "1. text" / "1) text"
    let digits = t.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &t[digits..];
        if let Some(r) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return r.trim();
        }
    }
    t
}

/// Best-effort split of labelled backend output. `None` unless an Overview and
/// at least one other section are present.
pub fn parse_sections(text: &str) -> Option<AnalysisResult> {
    let mut buckets: Vec<(Section, Vec<String>)> = Vec::new();

    for line in text.lines() {
        if let Some((sec, rest)) = match_heading(line) {
            buckets.push((sec, Vec::new()));
            if !rest.is_empty() {
                if let Some((_, lines)) = buckets.last_mut() {
                    lines.push(rest.to_string());
                }
            }
            continue;
        }
        if line.trim().is_empty() {
            continue;
        }
        if let Some((_, lines)) = buckets.last_mut() {
            lines.push(line.trim().to_string());
        }
    }

    let has = |s: Section| buckets.iter().any(|(sec, _)| *sec == s);
    if !has(Section::Overview) || buckets.len() < 2 {
        return None;
    }

    let mut out = AnalysisResult::default();
    for (sec, lines) in buckets {
        match sec {
            Section::Overview => append_paragraph(&mut out.overview, &lines),
            Section::Sentiment => append_optional(&mut out.sentiment, &lines),
            Section::Pitch => append_optional(&mut out.pitch, &lines),
            Section::Findings => out.findings.extend(list_items(&lines)),
            Section::Recommendations => out.recommendations.extend(list_items(&lines)),
        }
    }
    if out.overview.is_empty() {
        return None;
    }
    Some(out)
}

fn append_paragraph(target: &mut String, lines: &[String]) {
    let text = lines
        .iter()
        .map(|l| l.trim().trim_matches('*').trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    if text.is_empty() {
        return;
    }
    if !target.is_empty() {
        target.push('\n');
    }
    target.push_str(&text);
}

fn append_optional(target: &mut Option<String>, lines: &[String]) {
    let mut s = target.take().unwrap_or_default();
    append_paragraph(&mut s, lines);
    *target = (!s.is_empty()).then_some(s);
}

fn list_items(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .map(|l| strip_bullet(l).to_string())
        .filter(|l| !l.is_empty())
        .collect()
}
