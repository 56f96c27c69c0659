// src/sources/phantombuster.rs
//! Social snippets from a PhantomBuster agent.
//!
//! The agent (a social-media scraper configured on PhantomBuster's side) is not
//! query driven, so this client reads the agent's latest result object and keeps
//! the posts that mention the query.

use async_trait::async_trait;
use serde::Deserialize;

use super::{http, non_empty, SourceClient};
use crate::error::{SourceFault, SourceUnavailable};
use crate::model::{Query, RawItem, SourceKind};

pub const DEFAULT_BASE_URL: &str = "https://api.phantombuster.com";
const KEY_HEADER: &str = "X-Phantombuster-Key-1";
const SNIPPET_TITLE_MAX: usize = 80;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OutputResponse {
    status: Option<String>,
    /// JSON-encoded array of scraped posts, `null` before the first run.
    result_object: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Post {
    post_content: Option<String>,
    text: Option<String>,
    post_url: Option<String>,
    url: Option<String>,
    author: Option<String>,
    full_name: Option<String>,
}

pub struct PhantomBusterClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
    agent_id: String,
}

impl PhantomBusterClient {
    pub fn new(api_key: impl Into<String>, agent_id: impl Into<String>) -> anyhow::Result<Self> {
        Self::with_base_url(api_key, agent_id, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        agent_id: impl Into<String>,
        base_url: &str,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            http: http::build_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            agent_id: agent_id.into(),
        })
    }
}

/// Parses a fetch-output body and keeps posts mentioning `query` (case-insensitive).
pub fn parse_response(body: &str, query: &str) -> Result<Vec<RawItem>, SourceFault> {
    let resp: OutputResponse =
        serde_json::from_str(body).map_err(|e| SourceFault::Malformed(e.to_string()))?;

    if let Some(err) = non_empty(resp.error) {
        return Err(SourceFault::Malformed(err));
    }
    if resp.status.as_deref() == Some("error") {
        return Err(SourceFault::Malformed("agent run ended in error".to_string()));
    }

    let Some(raw) = non_empty(resp.result_object) else {
        return Ok(Vec::new());
    };
    let posts: Vec<Post> =
        serde_json::from_str(&raw).map_err(|e| SourceFault::Malformed(e.to_string()))?;

    let needle = query.to_lowercase();
    let items = posts
        .into_iter()
        .filter_map(|p| {
            let text = non_empty(p.post_content).or_else(|| non_empty(p.text))?;
            if !text.to_lowercase().contains(&needle) {
                return None;
            }
            let author = non_empty(p.author).or_else(|| non_empty(p.full_name));
            Some(RawItem {
                title: author.clone().unwrap_or_else(|| snippet_title(&text)),
                body: text,
                url: non_empty(p.post_url)
                    .or_else(|| non_empty(p.url))
                    .unwrap_or_default(),
                source_id: author.unwrap_or_else(|| SourceKind::Social.id().to_string()),
            })
        })
        .collect();
    Ok(items)
}

fn snippet_title(text: &str) -> String {
    text.chars().take(SNIPPET_TITLE_MAX).collect()
}

#[async_trait]
impl SourceClient for PhantomBusterClient {
    fn kind(&self) -> SourceKind {
        SourceKind::Social
    }

    async fn fetch(&self, query: &Query, limit: usize) -> Result<Vec<RawItem>, SourceUnavailable> {
        let req = self
            .http
            .get(format!("{}/api/v2/agents/fetch-output", self.base_url))
            .header(KEY_HEADER, &self.api_key)
            .query(&[("id", self.agent_id.as_str())]);

        let body = http::fetch_body(req, self.kind()).await?;
        let mut items = parse_response(&body, query.as_str())
            .map_err(|f| SourceUnavailable::new(self.kind(), f))?;
        items.truncate(limit);
        Ok(items)
    }
}
