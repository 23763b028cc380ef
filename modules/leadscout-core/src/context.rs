use std::collections::HashMap;
use std::collections::HashSet;

use leadscout_common::{DedupeKey, Lead};
use tokio::sync::Mutex;

/// Per-job mutable record of work already performed and identities already
/// emitted. The only shared mutable structure in a job: every mutation is
/// an explicit method on this type and acquires the same exclusive region,
/// so compound read-then-write sequences (e.g. "read the used set then
/// extend it") never race. Workers never reach into the fields directly.
pub struct Context {
    inner: Mutex<ContextInner>,
}

#[derive(Default, Clone)]
struct ContextInner {
    news_pages_fetched: HashSet<u32>,
    community_queries_used: Vec<String>,
    competitors_scraped: Vec<String>,
    admission_order: Vec<DedupeKey>,
    admitted: HashMap<DedupeKey, Lead>,
}

/// Snapshot of Context state for planner prompts and test assertions.
#[derive(Debug, Clone, Default)]
pub struct ContextSummary {
    pub news_pages_fetched: Vec<u32>,
    pub community_queries_used: Vec<String>,
    pub competitors_scraped: Vec<String>,
    pub emitted_lead_count: usize,
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl Context {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(ContextInner::default()),
        }
    }

    /// Returns the `n` page numbers immediately after
    /// `max(news_pages_fetched)` (or starting at 1), inserting them
    /// atomically with the read that selected them.
    pub async fn next_news_pages(&self, n: u32) -> Vec<u32> {
        let mut inner = self.inner.lock().await;
        let start = inner.news_pages_fetched.iter().max().copied().unwrap_or(0) + 1;
        let pages: Vec<u32> = (start..start + n).collect();
        inner.news_pages_fetched.extend(pages.iter().copied());
        pages
    }

    /// Marks pages as fetched without allocating new ones (used to record
    /// Phase II's initial fetch of pages 1,2).
    pub async fn mark_news_pages(&self, pages: &[u32]) {
        let mut inner = self.inner.lock().await;
        inner.news_pages_fetched.extend(pages.iter().copied());
    }

    pub async fn mark_community_queries(&self, queries: &[String]) {
        let mut inner = self.inner.lock().await;
        for q in queries {
            if !inner.community_queries_used.contains(q) {
                inner.community_queries_used.push(q.clone());
            }
        }
    }

    pub async fn mark_competitors_scraped(&self, competitors: &[String]) {
        let mut inner = self.inner.lock().await;
        for c in competitors {
            if !inner.competitors_scraped.contains(c) {
                inner.competitors_scraped.push(c.clone());
            }
        }
    }

    /// Filters `candidates` down to those not already in `used`, read under
    /// the same exclusive region as every other mutation so a caller can
    /// safely act on the result before another task changes `used`.
    pub async fn unused_queries(&self, candidates: &[String]) -> Vec<String> {
        let inner = self.inner.lock().await;
        candidates
            .iter()
            .filter(|c| !inner.community_queries_used.contains(c))
            .cloned()
            .collect()
    }

    pub async fn unused_competitors(&self, candidates: &[String]) -> Vec<String> {
        let inner = self.inner.lock().await;
        candidates
            .iter()
            .filter(|c| !inner.competitors_scraped.contains(c))
            .cloned()
            .collect()
    }

    /// Merges `leads` into the canonical admitted set, keyed by dedupe key,
    /// mirroring `aggregator::dedupe`'s collision rule: on collision, keep
    /// the higher-scoring lead (ties keep whichever was admitted first).
    /// Returns the leads that caused a first admission or a score upgrade —
    /// a later-processed worker or compensation round can still outscore
    /// and replace an earlier admission, it's never first-seen-wins.
    pub async fn add_leads(&self, leads: Vec<Lead>) -> Vec<Lead> {
        let mut inner = self.inner.lock().await;
        let mut changed = Vec::with_capacity(leads.len());
        for lead in leads {
            let key = lead.dedupe_key();
            match inner.admitted.get(&key) {
                Some(existing) if lead.intent_score > existing.intent_score => {
                    inner.admitted.insert(key, lead.clone());
                    changed.push(lead);
                }
                Some(_) => {}
                None => {
                    inner.admission_order.push(key.clone());
                    inner.admitted.insert(key, lead.clone());
                    changed.push(lead);
                }
            }
        }
        changed
    }

    /// Current canonical admitted set, in first-admission order. The source
    /// of truth for the job's lead count and final result — the caller no
    /// longer needs to track its own running total alongside Context's.
    pub async fn leads(&self) -> Vec<Lead> {
        let inner = self.inner.lock().await;
        inner
            .admission_order
            .iter()
            .map(|key| inner.admitted.get(key).expect("admission_order key always present").clone())
            .collect()
    }

    pub async fn lead_count(&self) -> usize {
        self.inner.lock().await.admitted.len()
    }

    pub async fn summary(&self) -> ContextSummary {
        let inner = self.inner.lock().await;
        ContextSummary {
            news_pages_fetched: {
                let mut pages: Vec<u32> = inner.news_pages_fetched.iter().copied().collect();
                pages.sort_unstable();
                pages
            },
            community_queries_used: inner.community_queries_used.clone(),
            competitors_scraped: inner.competitors_scraped.clone(),
            emitted_lead_count: inner.admitted.len(),
        }
    }
}
