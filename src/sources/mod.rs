// src/sources/mod.rs
//! Source adapters. Each vendor's response schema stays inside its own module;
//! everything leaving a client is a `RawItem`.

pub mod gnews;
pub(crate) mod http;
pub mod newsdata;
pub mod phantombuster;
pub mod serpapi;

use async_trait::async_trait;

use crate::error::SourceUnavailable;
use crate::model::{Query, RawItem, SourceKind};

pub use gnews::GNewsClient;
pub use newsdata::NewsDataClient;
pub use phantombuster::PhantomBusterClient;
pub use serpapi::SerpApiClient;

#[async_trait]
pub trait SourceClient: Send + Sync {
    fn kind(&self) -> SourceKind;

    /// One outbound request per call. Zero hits is `Ok(vec![])`, never an error.
    async fn fetch(&self, query: &Query, limit: usize) -> Result<Vec<RawItem>, SourceUnavailable>;
}

/// Empty strings become `None`; used when vendors send `""` instead of omitting a field.
pub(crate) fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
