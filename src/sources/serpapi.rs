// src/sources/serpapi.rs
use async_trait::async_trait;
use serde::Deserialize;

use super::{http, non_empty, SourceClient};
use crate::error::{SourceFault, SourceUnavailable};
use crate::model::{Query, RawItem, SourceKind};

pub const DEFAULT_BASE_URL: &str = "https://serpapi.com";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    organic_results: Vec<OrganicResult>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OrganicResult {
    title: Option<String>,
    link: Option<String>,
    snippet: Option<String>,
    source: Option<String>,
}

/// Google web search through SerpAPI.
pub struct SerpApiClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SerpApiClient {
    pub fn new(api_key: impl Into<String>) -> anyhow::Result<Self> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(api_key: impl Into<String>, base_url: &str) -> anyhow::Result<Self> {
        Ok(Self {
            http: http::build_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.into(),
        })
    }
}

/// Maps a `search.json` body onto raw items.
///
/// SerpAPI answers an empty result page with HTTP 200 and an `error` string;
/// that case is zero results, any other `error` is a failure.
pub fn parse_response(body: &str) -> Result<Vec<RawItem>, SourceFault> {
    let resp: SearchResponse =
        serde_json::from_str(body).map_err(|e| SourceFault::Malformed(e.to_string()))?;

    if let Some(err) = resp.error {
        if err.to_ascii_lowercase().contains("hasn't returned any results") {
            return Ok(Vec::new());
        }
        if err.to_ascii_lowercase().contains("invalid api key") {
            return Err(SourceFault::Auth(401));
        }
        return Err(SourceFault::Malformed(err));
    }

    let items = resp
        .organic_results
        .into_iter()
        .filter_map(|r| {
            let url = non_empty(r.link)?;
            Some(RawItem {
                title: non_empty(r.title).unwrap_or_default(),
                body: non_empty(r.snippet).unwrap_or_default(),
                url,
                source_id: non_empty(r.source)
                    .unwrap_or_else(|| SourceKind::WebSearch.id().to_string()),
            })
        })
        .collect();
    Ok(items)
}

#[async_trait]
impl SourceClient for SerpApiClient {
    fn kind(&self) -> SourceKind {
        SourceKind::WebSearch
    }

    async fn fetch(&self, query: &Query, limit: usize) -> Result<Vec<RawItem>, SourceUnavailable> {
        let num = limit.to_string();
        let req = self
            .http
            .get(format!("{}/search.json", self.base_url))
            .query(&[
                ("engine", "google"),
                ("q", query.as_str()),
                ("num", num.as_str()),
                ("api_key", self.api_key.as_str()),
            ]);

        let body = http::fetch_body(req, self.kind()).await?;
        let mut items =
            parse_response(&body).map_err(|f| SourceUnavailable::new(self.kind(), f))?;
        items.truncate(limit);
        Ok(items)
    }
}
