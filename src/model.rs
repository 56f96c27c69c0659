// src/model.rs
//! Data carried through one pipeline run: query, raw and normalized evidence,
//! the synthesized analysis.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PipelineError;

/// Free-text subject of one run. Always non-empty and trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query(String);

impl Query {
    /// Rejects empty / whitespace-only input with `InvalidQuery`.
    pub fn parse(input: &str) -> Result<Self, PipelineError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(PipelineError::InvalidQuery);
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The external data providers the pipeline knows how to talk to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    WebSearch,
    #[serde(rename = "newsdata")]
    NewsData,
    #[serde(rename = "gnews")]
    GNews,
    Social,
}

impl SourceKind {
    pub const ALL: [SourceKind; 4] = [
        SourceKind::WebSearch,
        SourceKind::NewsData,
        SourceKind::GNews,
        SourceKind::Social,
    ];

    /// Stable id used in config, logs and metric labels.
    pub fn id(self) -> &'static str {
        match self {
            SourceKind::WebSearch => "web_search",
            SourceKind::NewsData => "newsdata",
            SourceKind::GNews => "gnews",
            SourceKind::Social => "social",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        let id = id.trim();
        Self::ALL.into_iter().find(|k| k.id().eq_ignore_ascii_case(id))
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// One result as a vendor reported it, already mapped out of the vendor schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawItem {
    pub title: String,
    pub body: String,
    pub url: String,
    /// Publisher/outlet when the vendor names one, otherwise the client id.
    pub source_id: String,
}

/// Source-agnostic evidence record consumed by synthesis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedItem {
    pub source: SourceKind,
    pub title: String,
    pub excerpt: String,
    pub link: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub title: String,
    pub link: String,
}

pub const NO_DATA_OVERVIEW: &str = "no data available";

/// Structured synthesis output. Rendered section by section; empty parts are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub overview: String,
    pub findings: Vec<String>,
    pub sentiment: Option<String>,
    pub recommendations: Vec<String>,
    pub pitch: Option<String>,
    /// Evidence the analysis was built from.
    pub references: Vec<Reference>,
}

impl AnalysisResult {
    pub fn no_data() -> Self {
        Self {
            overview: NO_DATA_OVERVIEW.to_string(),
            ..Self::default()
        }
    }

    /// Unstructured backend output: the whole text becomes the overview.
    pub fn from_prose(text: &str) -> Self {
        Self {
            overview: text.to_string(),
            ..Self::default()
        }
    }
}
