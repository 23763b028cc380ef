//! News worker: surfaces decision makers at recently-funded companies.
//!
//! Raw batch shape fetched via `SourceFetch::fetch(SourceKind::News, page)`:
//! `{ "articles": [ { "company": str, "funding_amount": str, "headline": str,
//! "date": str }, ... ] }`

use futures::stream::{self, StreamExt};
use leadscout_adapters::{Classify, SourceFetch, SourceKind, WebSearch};
use leadscout_common::{Lead, Priority};
use schemars::JsonSchema;
use serde::Deserialize;

use crate::worker::{with_step_timeout, WorkerResult};

const FETCH_CONCURRENCY: usize = 5;
const MAX_SELECTED_COMPANIES: usize = 5;
const MAX_POSTS_PER_COMPANY: usize = 3;
const NEWS_INTENT_SCORE: u8 = 75;

#[derive(Debug, Clone, Deserialize)]
struct RawArticle {
    company: String,
    funding_amount: String,
    #[allow(dead_code)]
    headline: String,
    #[allow(dead_code)]
    date: String,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ArticleSelection {
    /// Company names, from the given list, that would plausibly use the
    /// product.
    companies: Vec<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct DecisionMakerPicks {
    /// Indices (0-based) into the candidate list, 1-3 entries.
    picks: Vec<usize>,
}

pub struct NewsWorker<'a, F, C, W> {
    fetcher: &'a F,
    classifier: &'a C,
    web_search: &'a W,
}

impl<'a, F, C, W> NewsWorker<'a, F, C, W>
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
        industry_focus: &str,
        product_context: &str,
        target_titles: &[String],
        pages: &[u32],
        target: usize,
        cancel: &crate::cancel::CancelSignal,
    ) -> WorkerResult {
        let mut trace = Vec::new();

        let articles = self.fetch_pages(pages, &mut trace).await;
        if articles.is_empty() {
            return WorkerResult::failed("no articles fetched from any page", "fetch", trace);
        }

        let selected = self.select_articles(industry_focus, product_context, &articles).await;
        if selected.is_empty() {
            trace.push("no companies selected as plausible fits".to_string());
            return WorkerResult::ok(Vec::new(), "select", trace);
        }

        let first_title = target_titles.first().cloned().unwrap_or_default();
        let mut leads = Vec::new();

        for article in selected.into_iter().take(MAX_SELECTED_COMPANIES) {
            if leads.len() >= target {
                break;
            }
            if cancel.is_cancelled() {
                trace.push("cancelled before next company".to_string());
                break;
            }
            let company_leads = self
                .decision_makers_for(&article, product_context, &first_title, &mut trace)
                .await;
            leads.extend(company_leads);
        }

        leads.truncate(target);
        WorkerResult::ok(leads, "filter", trace)
    }

    async fn fetch_pages(&self, pages: &[u32], trace: &mut Vec<String>) -> Vec<RawArticle> {
        let fetched: Vec<(u32, Option<Vec<RawArticle>>)> = stream::iter(pages.iter().copied())
            .map(|page| async move {
                match with_step_timeout(self.fetcher.fetch(SourceKind::News, &page.to_string())).await {
                    Ok(batch) => {
                        let articles: Vec<RawArticle> = batch
                            .0
                            .get("articles")
                            .and_then(|v| serde_json::from_value(v.clone()).ok())
                            .unwrap_or_default();
                        (page, Some(articles))
                    }
                    Err(_) => (page, None),
                }
            })
            .buffer_unordered(FETCH_CONCURRENCY)
            .collect()
            .await;

        let mut ordered = fetched;
        ordered.sort_by_key(|(page, _)| *page);
        for (page, result) in &ordered {
            if result.is_none() {
                trace.push(format!("fetch failed for page {page}"));
            }
        }
        ordered.into_iter().filter_map(|(_, r)| r).flatten().collect()
    }

    async fn select_articles(
        &self,
        industry_focus: &str,
        product_context: &str,
        articles: &[RawArticle],
    ) -> Vec<RawArticle> {
        let companies: Vec<String> = articles.iter().map(|a| a.company.clone()).collect();
        let user = format!(
            "Industry focus: {industry_focus}\nProduct: {product_context}\nCandidate companies: {companies:?}"
        );
        let selection: anyhow::Result<ArticleSelection> = self
            .classifier
            .classify(
                "Select which companies would plausibly buy this product.",
                &user,
            )
            .await;

        match selection {
            Ok(sel) => articles
                .iter()
                .filter(|a| sel.companies.contains(&a.company))
                .take(MAX_SELECTED_COMPANIES)
                .cloned()
                .collect(),
            Err(_) => articles.iter().take(MAX_SELECTED_COMPANIES).cloned().collect(),
        }
    }

    async fn decision_makers_for(
        &self,
        article: &RawArticle,
        product_context: &str,
        first_title: &str,
        trace: &mut Vec<String>,
    ) -> Vec<Lead> {
        let query = format!("{} {} decision maker", article.company, first_title);
        let hits = match self.web_search.search(&query).await {
            Ok(h) => h,
            Err(e) => {
                trace.push(format!("web search failed for {}: {e}", article.company));
                Vec::new()
            }
        };
        if hits.is_empty() {
            return Vec::new();
        }

        let candidates = hits
            .iter()
            .enumerate()
            .map(|(i, h)| format!("{i}: {} ({})", h.title, h.snippet))
            .collect::<Vec<_>>()
            .join("\n");
        let user = format!(
            "Company: {}\nProduct: {product_context}\nRole hint: {first_title}\nCandidates:\n{candidates}",
            article.company
        );
        let picks: anyhow::Result<DecisionMakerPicks> = self
            .classifier
            .classify(
                "Pick 1-3 candidates whose role matches the product's buyer.",
                &user,
            )
            .await;

        let indices: Vec<usize> = match picks {
            Ok(p) if !p.picks.is_empty() => {
                p.picks.into_iter().take(MAX_POSTS_PER_COMPANY).collect()
            }
            _ => {
                trace.push(format!(
                    "decision-maker classifier unavailable for {}, falling back to first candidate",
                    article.company
                ));
                vec![0]
            }
        };

        indices
            .into_iter()
            .filter_map(|i| hits.get(i))
            .map(|hit| Lead {
                name: hit.title.clone(),
                title: first_title.to_string(),
                company: article.company.clone(),
                profile_url: Some(hit.url.clone()),
                email: None,
                intent_signal: format!(
                    "Decision maker at {} with {}",
                    article.company, article.funding_amount
                ),
                intent_score: NEWS_INTENT_SCORE,
                source_platform: "news".to_string(),
                source_url: hit.url.clone(),
                priority: Priority::Cold,
            })
            .collect()
    }
}
