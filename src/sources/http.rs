// src/sources/http.rs
use std::time::Duration;

use reqwest::{RequestBuilder, StatusCode};

use crate::error::{SourceFault, SourceUnavailable};
use crate::model::SourceKind;

pub(crate) const USER_AGENT: &str = "company-intel/0.1";

/// Per-source timeouts are enforced by the aggregator; only the connect phase is bounded here.
pub(crate) fn build_client() -> anyhow::Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .connect_timeout(Duration::from_secs(4))
        .build()?;
    Ok(client)
}

pub(crate) fn fault_for_status(status: StatusCode) -> Option<SourceFault> {
    if status.is_success() {
        return None;
    }
    Some(match status.as_u16() {
        401 | 403 => SourceFault::Auth(status.as_u16()),
        429 => SourceFault::RateLimited,
        other => SourceFault::Status(other),
    })
}

/// Sends the request and returns the body of a 2xx response.
pub(crate) async fn fetch_body(
    req: RequestBuilder,
    origin: SourceKind,
) -> Result<String, SourceUnavailable> {
    let resp = req.send().await.map_err(|e| {
        tracing::warn!(error = ?e, source = origin.id(), "source http error");
        SourceUnavailable::new(origin, SourceFault::Network(e.to_string()))
    })?;

    if let Some(fault) = fault_for_status(resp.status()) {
        return Err(SourceUnavailable::new(origin, fault));
    }

    resp.text()
        .await
        .map_err(|e| SourceUnavailable::new(origin, SourceFault::Network(e.to_string())))
}
