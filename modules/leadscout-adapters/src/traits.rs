// Narrow adapter capabilities the core depends on (spec §6). Kept as async
// traits so production implementations (HTTP, language model) and
// deterministic `Mock*` implementations are interchangeable behind one
// capability set, the way `ContentFetcher`/`SignalStore` do in the scout
// pipeline this crate is modeled on.

use async_trait::async_trait;
use serde::Serialize;

/// Which source worker is asking for raw material.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Community,
    News,
    CompetitorEngagement,
}

/// Opaque payload returned by [`SourceFetch`]; shape is documented per
/// worker, not prescribed by the adapter surface.
#[derive(Debug, Clone, Serialize)]
pub struct RawBatch(pub serde_json::Value);

#[async_trait]
pub trait SourceFetch: Send + Sync {
    async fn fetch(&self, kind: SourceKind, query_slice: &str) -> anyhow::Result<RawBatch>;
}

/// A language-model call returning data matching a requested schema. Must
/// surface parse failures as errors rather than silently returning partial
/// data; the core never retries classification internally.
#[async_trait]
pub trait Classify: Send + Sync {
    async fn classify<T: ai_client::StructuredOutput>(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> anyhow::Result<T>;
}

#[derive(Debug, Clone)]
pub struct WebSearchHit {
    pub title: String,
    pub url: String,
    pub snippet: String,
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str) -> anyhow::Result<Vec<WebSearchHit>>;
}
