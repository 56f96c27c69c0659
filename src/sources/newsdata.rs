// src/sources/newsdata.rs
use async_trait::async_trait;
use serde::Deserialize;

use super::{http, non_empty, SourceClient};
use crate::error::{SourceFault, SourceUnavailable};
use crate::model::{Query, RawItem, SourceKind};

pub const DEFAULT_BASE_URL: &str = "https://newsdata.io";

// Free-plan placeholder NewsData puts into `content`.
const PAID_ONLY_MARKER: &str = "ONLY AVAILABLE IN PAID PLANS";

#[derive(Debug, Deserialize)]
struct NewsResponse {
    status: Option<String>,
    /// Array of articles on success, an error object on failure, `null` for no hits.
    results: Option<serde_json::Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Article {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    content: Option<String>,
    source_id: Option<String>,
}

/// NewsData.io latest-news search.
pub struct NewsDataClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl NewsDataClient {
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

pub fn parse_response(body: &str) -> Result<Vec<RawItem>, SourceFault> {
    let resp: NewsResponse =
        serde_json::from_str(body).map_err(|e| SourceFault::Malformed(e.to_string()))?;

    if resp.status.as_deref() == Some("error") {
        let err = resp
            .results
            .map(serde_json::from_value::<ErrorBody>)
            .transpose()
            .ok()
            .flatten()
            .unwrap_or_default();
        return Err(match err.code.as_deref() {
            Some("Unauthorized") => SourceFault::Auth(401),
            Some("RateLimitExceeded") => SourceFault::RateLimited,
            _ => SourceFault::Malformed(
                err.message
                    .unwrap_or_else(|| "newsdata reported an error".to_string()),
            ),
        });
    }

    let articles: Vec<Article> = match resp.results {
        None | Some(serde_json::Value::Null) => Vec::new(),
        Some(v) => serde_json::from_value(v).map_err(|e| SourceFault::Malformed(e.to_string()))?,
    };

    let items = articles
        .into_iter()
        .filter_map(|a| {
            let url = non_empty(a.link)?;
            let content = non_empty(a.content).filter(|c| !c.contains(PAID_ONLY_MARKER));
            Some(RawItem {
                title: non_empty(a.title).unwrap_or_default(),
                body: non_empty(a.description).or(content).unwrap_or_default(),
                url,
                source_id: non_empty(a.source_id)
                    .unwrap_or_else(|| SourceKind::NewsData.id().to_string()),
            })
        })
        .collect();
    Ok(items)
}

#[async_trait]
impl SourceClient for NewsDataClient {
    fn kind(&self) -> SourceKind {
        SourceKind::NewsData
    }

    async fn fetch(&self, query: &Query, limit: usize) -> Result<Vec<RawItem>, SourceUnavailable> {
        let req = self
            .http
            .get(format!("{}/api/1/news", self.base_url))
            .query(&[
                ("apikey", self.api_key.as_str()),
                ("q", query.as_str()),
                ("language", "en"),
            ]);

        let body = http::fetch_body(req, self.kind()).await?;
        let mut items =
            parse_response(&body).map_err(|f| SourceUnavailable::new(self.kind(), f))?;
        items.truncate(limit);
        Ok(items)
    }
}
