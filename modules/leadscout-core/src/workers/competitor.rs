//! Competitor worker: surfaces people engaging with competitors' posts.
//!
//! Raw batch shape fetched via
//! `SourceFetch::fetch(SourceKind::CompetitorEngagement, page_url)`:
//! `{ "engagers": [ { "profile_url": str, "name": str, "excerpt": str }, ... ] }`

use std::collections::HashSet;

use leadscout_adapters::{Classify, SourceFetch, SourceKind, WebSearch};
use leadscout_common::{Lead, Priority};
use serde::Deserialize;

use crate::filter::filter_sellers;
use crate::worker::{with_step_timeout, WorkerResult};

const MAX_POSTS_PER_ORG: usize = 5;
const COMPETITOR_INTENT_SCORE: u8 = 65;

#[derive(Debug, Clone, Deserialize)]
struct RawEngager {
    profile_url: String,
    name: String,
    excerpt: String,
}

pub struct CompetitorWorker<'a, F, C, W> {
    fetcher: &'a F,
    classifier: &'a C,
    web_search: &'a W,
}

impl<'a, F, C, W> CompetitorWorker<'a, F, C, W>
where
    F: SourceFetch,
    C: Classify,
    W: WebSearch,
{
    pub fn new(fetcher: &'a F, classifier: &'a C, web_search: &'a W) -> Self {
        Self {
            fetcher,
            classifier,
            web_search,
        }
    }

    pub async fn run(
        &self,
        competitors: &[String],
        target: usize,
        cancel: &crate::cancel::CancelSignal,
    ) -> WorkerResult {
        let mut trace = Vec::new();

        if competitors.is_empty() {
            return WorkerResult::failed("no competitors provided", "fetch", trace);
        }

        let mut leads = Vec::new();
        for competitor in competitors {
            if leads.len() >= target {
                break;
            }
            if cancel.is_cancelled() {
                trace.push("cancelled before next competitor".to_string());
                break;
            }

            let page_url = self.resolve_page(competitor).await;
            let batch = match with_step_timeout(
                self.fetcher.fetch(SourceKind::CompetitorEngagement, &page_url),
            )
            .await
            {
                Ok(b) => b,
                Err(e) => {
                    trace.push(format!("fetch failed for {competitor}: {e}"));
                    continue;
                }
            };

            let mut engagers: Vec<RawEngager> = batch
                .0
                .get("engagers")
                .and_then(|v| serde_json::from_value(v.clone()).ok())
                .unwrap_or_default();
            engagers.truncate(MAX_POSTS_PER_ORG);

            let mut seen = HashSet::new();
            let extracted: Vec<Lead> = engagers
                .into_iter()
                .filter(|e| seen.insert(e.profile_url.clone()))
                .map(|e| Lead {
                    name: e.name,
                    title: String::new(),
                    company: String::new(),
                    profile_url: Some(e.profile_url.clone()),
                    email: None,
                    intent_signal: format!("Engaged with {competitor} post: {}", e.excerpt),
                    intent_score: COMPETITOR_INTENT_SCORE,
                    source_platform: "competitor".to_string(),
                    source_url: e.profile_url,
                    priority: Priority::Cold,
                })
                .collect();

            let filtered = filter_sellers(self.classifier, extracted, &mut trace).await;
            leads.extend(filtered);
        }

        leads.truncate(target);
        WorkerResult::ok(leads, "filter", trace)
    }

    async fn resolve_page(&self, competitor: &str) -> String {
        match self.web_search.search(&format!("{competitor} official page")).await {
            Ok(hits) if !hits.is_empty() => hits[0].url.clone(),
            _ => format!("https://example-org.invalid/{}", slugify(competitor)),
        }
    }
}

fn slugify(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadscout_adapters::mock::{MockClassifier, MockSourceFetch, MockWebSearch};
    use leadscout_adapters::WebSearchHit;

    fn engagers_payload(engagers: &[(&str, &str, &str)]) -> serde_json::Value {
        serde_json::json!({
            "engagers": engagers.iter().map(|(url, name, excerpt)| {
                serde_json::json!({ "profile_url": url, "name": name, "excerpt": excerpt })
            }).collect::<Vec<_>>()
        })
    }

    #[tokio::test]
    async fn empty_competitor_list_fails_immediately() {
        let fetcher = MockSourceFetch::new();
        let classifier = MockClassifier(|_, _| Ok(serde_json::json!({ "is_seller": false, "reason": "" })));
        let web_search = MockWebSearch::new();
        let worker = CompetitorWorker::new(&fetcher, &classifier, &web_search);
        let result = worker.run(&[], 10, &crate::cancel::CancelSignal::new()).await;
        assert!(!result.success);
    }

    #[tokio::test]
    async fn dedupes_engagers_by_profile_url_and_tags_competitor_platform() {
        let fetcher = MockSourceFetch::new();
        let web_search = MockWebSearch::new();
        web_search.register(
            "Acme official page",
            vec![WebSearchHit {
                title: "Acme".into(),
                url: "https://acme.invalid/page".into(),
                snippet: "".into(),
            }],
        );
        fetcher.register(
            SourceKind::CompetitorEngagement,
            "https://acme.invalid/page",
            engagers_payload(&[
                ("https://x/in/bob", "Bob", "nice post"),
                ("https://x/in/bob", "Bob", "commented twice"),
            ]),
        );
        let classifier = MockClassifier(|_, _| Ok(serde_json::json!({ "is_seller": false, "reason": "" })));

        let worker = CompetitorWorker::new(&fetcher, &classifier, &web_search);
        let result = worker
            .run(&["Acme".to_string()], 10, &crate::cancel::CancelSignal::new())
            .await;

        assert_eq!(result.leads.len(), 1);
        assert_eq!(result.leads[0].source_platform, "competitor");
        assert_eq!(result.leads[0].intent_score, 65);
    }

    #[tokio::test]
    async fn falls_back_to_slug_url_when_search_fails() {
        let fetcher = MockSourceFetch::new();
        fetcher.register(
            SourceKind::CompetitorEngagement,
            "https://example-org.invalid/acme-co",
            engagers_payload(&[("https://x/in/carl", "Carl", "hi")]),
        );
        let classifier = MockClassifier(|_, _| Ok(serde_json::json!({ "is_seller": false, "reason": "" })));
        let web_search = MockWebSearch::new();
        let worker = CompetitorWorker::new(&fetcher, &classifier, &web_search);
        let result = worker
            .run(&["Acme Co".to_string()], 10, &crate::cancel::CancelSignal::new())
            .await;
        assert_eq!(result.leads.len(), 1);
    }
}
