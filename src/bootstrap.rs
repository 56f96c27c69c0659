// src/bootstrap.rs
use std::sync::Arc;

use tracing::{info, warn};

use crate::aggregate::Aggregator;
use crate::config::{Credentials, PipelineConfig};
use crate::model::SourceKind;
use crate::orchestrator::{Backends, Orchestrator};
use crate::render::ReportRenderer;
use crate::sources::{GNewsClient, NewsDataClient, PhantomBusterClient, SerpApiClient, SourceClient};
use crate::synth::{MockBackend, NarrativeBackend, OpenAiBackend, Synthesizer};

pub const ENV_AI_TEST_MODE: &str = "AI_TEST_MODE";

/// Everything a run needs that outlives a single query.
pub struct ReportRuntime {
    pub config: PipelineConfig,
    pub sources: Vec<Arc<dyn SourceClient>>,
    pub backends: Backends,
}

impl ReportRuntime {
    pub fn from_parts(
        config: PipelineConfig,
        sources: Vec<Arc<dyn SourceClient>>,
        backends: Backends,
    ) -> Self {
        Self {
            config,
            sources,
            backends,
        }
    }

    pub fn build(config: PipelineConfig, creds: &Credentials) -> anyhow::Result<Self> {
        let sources = build_sources(&config, creds)?;
        let backends = build_backends(&config, creds)?;
        // Safe diagnostics: names only, never key material.
        info!(
            sources = ?sources.iter().map(|s| s.kind().id()).collect::<Vec<_>>(),
            backend = %backends
                .primary
                .as_ref()
                .map(|b| b.name())
                .unwrap_or_else(|| "extractive".into()),
            fallback = ?backends.fallback.as_ref().map(|b| b.name()),
            credentials = ?creds.present(),
            "report runtime ready"
        );
        Ok(Self::from_parts(config, sources, backends))
    }

    /// Fresh orchestrator for one query, dated today.
    pub fn orchestrator(&self) -> Orchestrator {
        self.orchestrator_with(ReportRenderer::today())
    }

    pub fn orchestrator_with(&self, renderer: ReportRenderer) -> Orchestrator {
        let cfg = &self.config;
        Orchestrator::new(
            self.sources.clone(),
            Aggregator::new(
                cfg.sources.limit,
                cfg.source_timeout(),
                cfg.synthesis.excerpt_max_chars,
            ),
            Synthesizer::new(
                cfg.synthesis.top_n,
                cfg.synthesis.max_output_tokens,
                cfg.synthesis_timeout(),
            ),
            self.backends.clone(),
            renderer,
        )
    }
}

/// Clients in configured order. A source without credentials is skipped.
pub fn build_sources(
    config: &PipelineConfig,
    creds: &Credentials,
) -> anyhow::Result<Vec<Arc<dyn SourceClient>>> {
    let mut out: Vec<Arc<dyn SourceClient>> = Vec::new();
    for kind in config.source_order() {
        let client: Option<Arc<dyn SourceClient>> = match kind {
            SourceKind::WebSearch => match &creds.serpapi_key {
                Some(k) => Some(Arc::new(SerpApiClient::new(k.clone())?)),
                None => None,
            },
            SourceKind::NewsData => match &creds.newsdata_key {
                Some(k) => Some(Arc::new(NewsDataClient::new(k.clone())?)),
                None => None,
            },
            SourceKind::GNews => match &creds.gnews_key {
                Some(k) => Some(Arc::new(GNewsClient::new(k.clone())?)),
                None => None,
            },
            SourceKind::Social => match (&creds.phantombuster_key, &creds.phantombuster_agent_id) {
                (Some(k), Some(agent)) => {
                    Some(Arc::new(PhantomBusterClient::new(k.clone(), agent.clone())?))
                }
                _ => None,
            },
        };
        match client {
            Some(c) => out.push(c),
            None => warn!(source = kind.id(), "no credentials, source disabled"),
        }
    }
    Ok(out)
}

/// Primary and fallback narrative backends.
///
/// `AI_TEST_MODE=mock` wins over everything else. Synthesis disabled in config
/// or a missing OpenAI key leaves both empty (extractive mode).
pub fn build_backends(config: &PipelineConfig, creds: &Credentials) -> anyhow::Result<Backends> {
    let mock = std::env::var(ENV_AI_TEST_MODE)
        .map(|v| v.eq_ignore_ascii_case("mock"))
        .unwrap_or(false);
    if mock {
        info!("AI_TEST_MODE=mock, using canned narrative backend");
        let primary: Arc<dyn NarrativeBackend> = Arc::new(MockBackend::structured());
        return Ok(Backends {
            primary: Some(primary),
            fallback: None,
        });
    }

    if !config.synthesis.enabled {
        info!("synthesis disabled in config, reports will be extractive");
        return Ok(Backends::default());
    }
    let Some(key) = creds.openai_key.as_deref() else {
        warn!("OPENAI_API_KEY not set, reports will be extractive");
        return Ok(Backends::default());
    };

    let primary: Arc<dyn NarrativeBackend> =
        Arc::new(OpenAiBackend::new(key, config.synthesis.primary_model.clone())?);
    let fallback = match &config.synthesis.fallback_model {
        Some(model) => {
            let b: Arc<dyn NarrativeBackend> = Arc::new(OpenAiBackend::new(key, model.clone())?);
            Some(b)
        }
        None => None,
    };
    Ok(Backends {
        primary: Some(primary),
        fallback,
    })
}
