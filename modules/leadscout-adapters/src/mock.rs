//! Deterministic in-memory adapters for tests: no network, no credentials.
//! Mirrors the `MockFetcher`/`MockSignalStore` pattern the scout pipeline
//! uses so its workflow can run in `cargo test` in seconds.

use std::collections::HashMap;
use std::sync::Mutex;

use ai_client::StructuredOutput;
use async_trait::async_trait;
use serde_json::Value;

use crate::traits::{Classify, RawBatch, SourceFetch, SourceKind, WebSearch, WebSearchHit};

/// Returns a canned [`RawBatch`] per `(kind, query_slice)`, or an empty
/// batch if the combination wasn't registered.
#[derive(Default)]
pub struct MockSourceFetch {
    responses: Mutex<HashMap<(SourceKindKey, String), Value>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum SourceKindKey {
    Community,
    News,
    CompetitorEngagement,
}

impl From<SourceKind> for SourceKindKey {
    fn from(k: SourceKind) -> Self {
        match k {
            SourceKind::Community => SourceKindKey::Community,
            SourceKind::News => SourceKindKey::News,
            SourceKind::CompetitorEngagement => SourceKindKey::CompetitorEngagement,
        }
    }
}

impl MockSourceFetch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, kind: SourceKind, query_slice: impl Into<String>, payload: Value) {
        self.responses
            .lock()
            .unwrap()
            .insert((kind.into(), query_slice.into()), payload);
    }
}

#[async_trait]
impl SourceFetch for MockSourceFetch {
    async fn fetch(&self, kind: SourceKind, query_slice: &str) -> anyhow::Result<RawBatch> {
        let payload = self
            .responses
            .lock()
            .unwrap()
            .get(&(kind.into(), query_slice.to_string()))
            .cloned()
            .unwrap_or_else(|| serde_json::json!({ "items": [] }));
        Ok(RawBatch(payload))
    }
}

/// Always fails, for exercising Review-layer retry/fail-open behavior.
pub struct FailingSourceFetch;

#[async_trait]
impl SourceFetch for FailingSourceFetch {
    async fn fetch(&self, _kind: SourceKind, _query_slice: &str) -> anyhow::Result<RawBatch> {
        Err(anyhow::anyhow!("mock source fetch failure"))
    }
}

/// Runs a caller-supplied closure instead of calling a language model.
/// Tests build `T` directly from the raw prompt text; production code never
/// sees this adapter.
pub struct MockClassifier<F>(pub F)
where
    F: Fn(&str, &str) -> anyhow::Result<Value> + Send + Sync;

#[async_trait]
impl<F> Classify for MockClassifier<F>
where
    F: Fn(&str, &str) -> anyhow::Result<Value> + Send + Sync,
{
    async fn classify<T: StructuredOutput>(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> anyhow::Result<T> {
        let value = (self.0)(system_prompt, user_prompt)?;
        Ok(serde_json::from_value(value)?)
    }
}

/// Always errors; used to prove fail-open behavior in the seller filter.
pub struct FailingClassifier;

#[async_trait]
impl Classify for FailingClassifier {
    async fn classify<T: StructuredOutput>(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
    ) -> anyhow::Result<T> {
        Err(anyhow::anyhow!("mock classifier failure"))
    }
}

#[derive(Default)]
pub struct MockWebSearch {
    responses: Mutex<HashMap<String, Vec<WebSearchHit>>>,
}

impl MockWebSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, query: impl Into<String>, hits: Vec<WebSearchHit>) {
        self.responses.lock().unwrap().insert(query.into(), hits);
    }
}

#[async_trait]
impl WebSearch for MockWebSearch {
    async fn search(&self, query: &str) -> anyhow::Result<Vec<WebSearchHit>> {
        Ok(self
            .responses
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_default())
    }
}
