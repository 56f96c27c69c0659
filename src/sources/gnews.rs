// src/sources/gnews.rs
use async_trait::async_trait;
use serde::Deserialize;

use super::{http, non_empty, SourceClient};
use crate::error::{SourceFault, SourceUnavailable};
use crate::model::{Query, RawItem, SourceKind};

pub const DEFAULT_BASE_URL: &str = "https://gnews.io";

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    articles: Vec<Article>,
    #[serde(default)]
    errors: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Article {
    title: Option<String>,
    description: Option<String>,
    content: Option<String>,
    url: Option<String>,
    source: Option<Publisher>,
}

#[derive(Debug, Deserialize)]
struct Publisher {
    name: Option<String>,
}

/// GNews v4 article search.
pub struct GNewsClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
}

impl GNewsClient {
    pub fn new(token: impl Into<String>) -> anyhow::Result<Self> {
        Self::with_base_url(token, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(token: impl Into<String>, base_url: &str) -> anyhow::Result<Self> {
        Ok(Self {
            http: http::build_client()?,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }
}

pub fn parse_response(body: &str) -> Result<Vec<RawItem>, SourceFault> {
    let resp: SearchResponse =
        serde_json::from_str(body).map_err(|e| SourceFault::Malformed(e.to_string()))?;

    if !resp.errors.is_empty() {
        return Err(SourceFault::Malformed(resp.errors.join("; ")));
    }

    let items = resp
        .articles
        .into_iter()
        .filter_map(|a| {
            let url = non_empty(a.url)?;
            Some(RawItem {
                title: non_empty(a.title).unwrap_or_default(),
                body: non_empty(a.description)
                    .or_else(|| non_empty(a.content))
                    .unwrap_or_default(),
                url,
                source_id: a
                    .source
                    .and_then(|p| non_empty(p.name))
                    .unwrap_or_else(|| SourceKind::GNews.id().to_string()),
            })
        })
        .collect();
    Ok(items)
}

#[async_trait]
impl SourceClient for GNewsClient {
    fn kind(&self) -> SourceKind {
        SourceKind::GNews
    }

    async fn fetch(&self, query: &Query, limit: usize) -> Result<Vec<RawItem>, SourceUnavailable> {
        let max = limit.to_string();
        let req = self
            .http
            .get(format!("{}/api/v4/search", self.base_url))
            .query(&[
                ("q", query.as_str()),
                ("token", self.token.as_str()),
                ("lang", "en"),
                ("max", max.as_str()),
            ]);

        let body = http::fetch_body(req, self.kind()).await?;
        let mut items =
            parse_response(&body).map_err(|f| SourceUnavailable::new(self.kind(), f))?;
        items.truncate(limit);
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_array_fails() {
        let body = r#"{"errors":["You did not provide an API key."]}"#;
        assert_eq!(
            parse_response(body),
            Err(SourceFault::Malformed("You did not provide an API key.".into()))
        );
    }

    #[test]
    fn publisher_name_becomes_source_id() {
        let body = r#"{"totalArticles":1,"articles":[{"title":"Acme hires","description":"","content":"Acme hired 40 people.","url":"https://g.test/a","source":{"name":"Daily Anvil","url":"https://da.test"}}]}"#;
        let items = parse_response(body).unwrap();
        assert_eq!(items[0].source_id, "Daily Anvil");
        assert_eq!(items[0].body, "Acme hired 40 people.");
    }
}
