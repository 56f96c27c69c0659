// src/render/mod.rs
//! Report rendering: `AnalysisResult` → text or PDF artifact.
//!
//! Rendering is a pure function of the query, the analysis and the renderer's
//! date. Both formats share the section list built by [`sections`].

pub mod pdf;
pub mod sanitize;
pub mod text;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::PipelineError;
use crate::model::{AnalysisResult, Query};

pub const REPORT_TITLE: &str = "Company Intelligence Report";
const FILENAME_SEPARATOR: &str = "_";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Text,
    #[default]
    Pdf,
}

impl ReportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ReportFormat::Text => "txt",
            ReportFormat::Pdf => "pdf",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ReportFormat::Text => "text/plain; charset=utf-8",
            ReportFormat::Pdf => "application/pdf",
        }
    }
}

impl FromStr for ReportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "txt" => Ok(ReportFormat::Text),
            "pdf" => Ok(ReportFormat::Pdf),
            other => Err(format!("unknown report format '{other}' (expected text or pdf)")),
        }
    }
}

impl fmt::Display for ReportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ReportFormat::Text => "text",
            ReportFormat::Pdf => "pdf",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifact {
    pub format: ReportFormat,
    pub filename: String,
    pub bytes: Vec<u8>,
}

impl ReportArtifact {
    /// Writes the artifact into `dir` (created if missing) and returns the file path.
    pub fn write_to(&self, dir: &Path) -> Result<PathBuf, PipelineError> {
        std::fs::create_dir_all(dir).map_err(|e| {
            PipelineError::RenderFailed(format!("creating {}: {e}", dir.display()))
        })?;
        let path = dir.join(&self.filename);
        std::fs::write(&path, &self.bytes).map_err(|e| {
            PipelineError::RenderFailed(format!("writing {}: {e}", path.display()))
        })?;
        Ok(path)
    }
}

/// Body of one report section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionBody {
    Paragraph(String),
    List(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: &'static str,
    pub body: SectionBody,
}

/// Non-empty sections in report order: Overview, Findings, Sentiment,
/// Recommendations, Pitch, Sources.
pub fn sections(analysis: &AnalysisResult) -> Vec<Section> {
    let refs: Vec<String> = analysis
        .references
        .iter()
        .map(|r| {
            if r.title == r.link {
                r.link.clone()
            } else {
                format!("{} - {}", r.title, r.link)
            }
        })
        .collect();

    [
        ("Overview", paragraph(Some(&analysis.overview))),
        ("Findings", list(&analysis.findings)),
        ("Sentiment", paragraph(analysis.sentiment.as_ref())),
        ("Recommendations", list(&analysis.recommendations)),
        ("Pitch", paragraph(analysis.pitch.as_ref())),
        ("Sources", list(&refs)),
    ]
    .into_iter()
    .filter_map(|(title, body)| body.map(|body| Section { title, body }))
    .collect()
}

fn paragraph(text: Option<&String>) -> Option<SectionBody> {
    text.map(|t| t.trim())
        .filter(|t| !t.is_empty())
        .map(|t| SectionBody::Paragraph(t.to_string()))
}

fn list(items: &[String]) -> Option<SectionBody> {
    let v: Vec<String> = items
        .iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    (!v.is_empty()).then_some(SectionBody::List(v))
}

/// `{normalized-query}_{YYYY-MM-DD}.{ext}`.
pub fn report_filename(query: &Query, date: NaiveDate, format: ReportFormat) -> String {
    format!(
        "{}{}{}.{}",
        filename_stem(query.as_str()),
        FILENAME_SEPARATOR,
        date.format("%Y-%m-%d"),
        format.extension()
    )
}

/// Whitespace runs become `_`; path-hostile characters are dropped.
pub fn filename_stem(query: &str) -> String {
    let cleaned: String = query
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|'))
        .collect();
    let stem = cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(FILENAME_SEPARATOR);
    let stem = stem.trim_matches('.').to_string();
    if stem.is_empty() {
        "report".to_string()
    } else {
        stem
    }
}

/// Renders reports stamped with a fixed generation date.
#[derive(Debug, Clone, Copy)]
pub struct ReportRenderer {
    date: NaiveDate,
}

impl ReportRenderer {
    pub fn on(date: NaiveDate) -> Self {
        Self { date }
    }

    pub fn today() -> Self {
        Self::on(chrono::Local::now().date_naive())
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn render(
        &self,
        query: &Query,
        analysis: &AnalysisResult,
        format: ReportFormat,
    ) -> Result<ReportArtifact, PipelineError> {
        let secs = sections(analysis);
        let bytes = match format {
            ReportFormat::Text => text::render_text(query, self.date, &secs).into_bytes(),
            ReportFormat::Pdf => pdf::render_pdf(query, self.date, &secs),
        };
        if bytes.is_empty() {
            return Err(PipelineError::RenderFailed(format!(
                "{format} renderer produced no output"
            )));
        }
        Ok(ReportArtifact {
            format,
            filename: report_filename(query, self.date, format),
            bytes,
        })
    }
}
