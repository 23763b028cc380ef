//! Community worker: mines discussion-platform posts for buying intent.
//!
//! Raw batch shape fetched via `SourceFetch::fetch(SourceKind::Community, query)`:
//! `{ "posts": [ { "author": str, "title": str, "body": str, "url": str }, ... ] }`

use futures::stream::{self, StreamExt};
use leadscout_adapters::{Classify, SourceFetch, SourceKind};
use leadscout_common::{Lead, Priority};
use schemars::JsonSchema;
use serde::Deserialize;

use crate::filter::filter_sellers;
use crate::worker::{with_step_timeout, WorkerResult};

const SCORE_CONCURRENCY: usize = 5;
const MIN_RELEVANCE_RATIO: f64 = 0.3;
const MIN_INTENT_SCORE: u8 = 50;
const EXCLUDED_AUTHORS: [&str; 3] = ["[deleted]", "Unknown", "AutoModerator"];

#[derive(Debug, Clone, Deserialize)]
struct RawPost {
    author: String,
    title: String,
    #[serde(default)]
    body: String,
    url: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct IntentScore {
    /// 0-100: explicit shopping (80-100) down to promoter/off-topic (5-19).
    score: u8,
}

pub struct CommunityWorker<'a, F, C> {
    fetcher: &'a F,
    classifier: &'a C,
}

impl<'a, F, C> CommunityWorker<'a, F, C>
where
    F: SourceFetch,
    C: Classify,
{
    pub fn new(fetcher: &'a F, classifier: &'a C) -> Self {
        Self { fetcher, classifier }
    }

    pub async fn run(
        &self,
        queries: &[String],
        target: usize,
        cancel: &crate::cancel::CancelSignal,
    ) -> WorkerResult {
        let mut trace = Vec::new();
        let mut leads = Vec::new();

        for query in queries {
            if leads.len() >= target {
                break;
            }
            if cancel.is_cancelled() {
                trace.push("cancelled before next query".to_string());
                break;
            }

            let batch = match with_step_timeout(self.fetcher.fetch(SourceKind::Community, query)).await {
                Ok(b) => b,
                Err(e) => {
                    trace.push(format!("fetch failed for query '{query}': {e}"));
                    return WorkerResult::failed(e.to_string(), "fetch", trace);
                }
            };

            let posts: Vec<RawPost> = match batch.0.get("posts") {
                Some(v) => serde_json::from_value(v.clone()).unwrap_or_default(),
                None => Vec::new(),
            };

            if posts.is_empty() {
                trace.push(format!("query '{query}' returned no posts"));
                continue;
            }

            let ratio = relevance_ratio(query, &posts);
            if ratio < MIN_RELEVANCE_RATIO {
                trace.push(format!(
                    "query '{query}' quality LOW (relevance {ratio:.2}), continuing anyway"
                ));
            }

            let scored = self.score_posts(&posts).await;
            let high_intent: Vec<(RawPost, u8)> = scored
                .into_iter()
                .filter(|(_, score)| *score >= MIN_INTENT_SCORE)
                .collect();

            let extracted: Vec<Lead> = high_intent
                .into_iter()
                .filter(|(post, _)| !EXCLUDED_AUTHORS.contains(&post.author.as_str()))
                .map(|(post, score)| Lead {
                    name: post.author,
                    title: String::new(),
                    company: String::new(),
                    profile_url: None,
                    email: None,
                    intent_signal: post.title.chars().take(200).collect(),
                    intent_score: score,
                    source_platform: "community".to_string(),
                    source_url: post.url,
                    priority: Priority::Cold,
                })
                .collect();

            let filtered = filter_sellers(self.classifier, extracted, &mut trace).await;
            leads.extend(filtered);
        }

        leads.truncate(target);
        WorkerResult::ok(leads, "filter", trace)
    }

    async fn score_posts(&self, posts: &[RawPost]) -> Vec<(RawPost, u8)> {
        stream::iter(posts.iter().cloned())
            .map(|post| async move {
                let user = format!("Title: {}\nBody: {}", post.title, post.body);
                let score = self
                    .classifier
                    .classify::<IntentScore>(
                        "Score this community post's buying intent from 0-100.",
                        &user,
                    )
                    .await
                    .map(|s| s.score)
                    .unwrap_or(0);
                (post, score)
            })
            .buffer_unordered(SCORE_CONCURRENCY)
            .collect()
            .await
    }
}

/// Fraction of `posts` whose title+body contains at least one query keyword
/// longer than 3 characters, case-insensitively.
fn relevance_ratio(query: &str, posts: &[RawPost]) -> f64 {
    if posts.is_empty() {
        return 0.0;
    }
    let keywords: Vec<String> = query
        .split_whitespace()
        .filter(|w| w.len() > 3)
        .map(|w| w.to_lowercase())
        .collect();
    if keywords.is_empty() {
        return 1.0;
    }
    let matching = posts
        .iter()
        .filter(|p| {
            let haystack = format!("{} {}", p.title, p.body).to_lowercase();
            keywords.iter().any(|k| haystack.contains(k.as_str()))
        })
        .count();
    matching as f64 / posts.len() as f64
}
