// src/config/pipeline.rs
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::model::SourceKind;
use crate::render::ReportFormat;

pub const ENV_CONFIG_PATH: &str = "COMPANY_INTEL_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "config/pipeline.toml";

fn default_order() -> Vec<String> {
    SourceKind::ALL.iter().map(|k| k.id().to_string()).collect()
}
fn default_limit() -> usize {
    5
}
fn default_source_timeout_secs() -> u64 {
    10
}
fn default_enabled() -> bool {
    true
}
fn default_top_n() -> usize {
    5
}
fn default_excerpt_max_chars() -> usize {
    300
}
fn default_max_output_tokens() -> u32 {
    700
}
fn default_synthesis_timeout_secs() -> u64 {
    30
}
fn default_primary_model() -> String {
    "gpt-4o-mini".to_string()
}
fn default_fallback_model() -> Option<String> {
    Some("gpt-3.5-turbo".to_string())
}
fn default_output_dir() -> PathBuf {
    PathBuf::from("reports")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// Fetch/report order. Unknown ids are dropped with a warning.
    #[serde(default = "default_order")]
    pub order: Vec<String>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default = "default_source_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            order: default_order(),
            limit: default_limit(),
            timeout_secs: default_source_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SynthesisConfig {
    /// `false` skips the narrative backend and builds an extractive report.
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_top_n")]
    pub top_n: usize,
    #[serde(default = "default_excerpt_max_chars")]
    pub excerpt_max_chars: usize,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    #[serde(default = "default_synthesis_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_primary_model")]
    pub primary_model: String,
    /// Used for the single retry after the primary backend fails. `None` disables the retry.
    #[serde(default = "default_fallback_model")]
    pub fallback_model: Option<String>,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            top_n: default_top_n(),
            excerpt_max_chars: default_excerpt_max_chars(),
            max_output_tokens: default_max_output_tokens(),
            timeout_secs: default_synthesis_timeout_secs(),
            primary_model: default_primary_model(),
            fallback_model: default_fallback_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    #[serde(default)]
    pub default_format: ReportFormat,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            default_format: ReportFormat::default(),
            output_dir: default_output_dir(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub sources: SourcesConfig,
    #[serde(default)]
    pub synthesis: SynthesisConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

impl PipelineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: PipelineConfig = toml::from_str(s).context("parsing pipeline config")?;
        Ok(cfg.sanitized())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading pipeline config from {}", path.display()))?;
        Self::from_toml_str(&content)
    }

    /// Lookup order:
    /// 1) $COMPANY_INTEL_CONFIG (must exist)
    /// 2) config/pipeline.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if pb.exists() {
                return Self::load_from(&pb);
            }
            return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
        }
        let fallback = PathBuf::from(DEFAULT_CONFIG_PATH);
        if fallback.exists() {
            return Self::load_from(&fallback);
        }
        Ok(Self::default())
    }

    /// Configured sources in fetch order, unknown ids and repeats removed.
    pub fn source_order(&self) -> Vec<SourceKind> {
        let mut out = Vec::new();
        for id in &self.sources.order {
            match SourceKind::from_id(id) {
                Some(k) if !out.contains(&k) => out.push(k),
                Some(_) => {}
                None => tracing::warn!(source = %id, "unknown source id in config, skipping"),
            }
        }
        out
    }

    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.sources.timeout_secs)
    }

    pub fn synthesis_timeout(&self) -> Duration {
        Duration::from_secs(self.synthesis.timeout_secs)
    }

    /// Zero limits and timeouts fall back to defaults; a blank fallback model disables the retry.
    fn sanitized(mut self) -> Self {
        if self.sources.limit == 0 {
            self.sources.limit = default_limit();
        }
        if self.sources.timeout_secs == 0 {
            self.sources.timeout_secs = default_source_timeout_secs();
        }
        if self.synthesis.top_n == 0 {
            self.synthesis.top_n = default_top_n();
        }
        if self.synthesis.excerpt_max_chars < 16 {
            self.synthesis.excerpt_max_chars = default_excerpt_max_chars();
        }
        if self.synthesis.max_output_tokens == 0 {
            self.synthesis.max_output_tokens = default_max_output_tokens();
        }
        if self.synthesis.timeout_secs == 0 {
            self.synthesis.timeout_secs = default_synthesis_timeout_secs();
        }
        if self.synthesis.primary_model.trim().is_empty() {
            self.synthesis.primary_model = default_primary_model();
        }
        self.synthesis.fallback_model = self
            .synthesis
            .fallback_model
            .take()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty() && *m != self.synthesis.primary_model);
        self
    }
}
