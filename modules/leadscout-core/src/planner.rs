use async_trait::async_trait;
use leadscout_adapters::Classify;
use schemars::JsonSchema;
use serde::Deserialize;

use crate::context::ContextSummary;
use crate::strategy::{Icp, Strategy};

/// Which worker a compensation round should re-invoke, in priority order
/// when the planner returns more than one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrategyTag {
    News,
    Competitor,
    Community,
}

/// One completed compensation round, fed back to the planner on the next
/// round so it can see what has already been tried.
#[derive(Debug, Clone)]
pub struct RoundHistory {
    pub tag: StrategyTag,
    pub new_leads: usize,
    pub succeeded: bool,
}

/// Language-model-backed decision component. Any concrete implementation —
/// Claude-backed or deterministic — satisfies the supervisor through this
/// interface alone; every operation may fail or return an empty/partial
/// result, which the supervisor (not the planner) is responsible for
/// falling back on.
#[async_trait]
pub trait Planner: Send + Sync {
    async fn initial_strategy(
        &self,
        product: &str,
        target: usize,
        icp: Option<&Icp>,
    ) -> anyhow::Result<Strategy>;

    async fn choose_compensation(
        &self,
        current_count: usize,
        target: usize,
        context: &ContextSummary,
        history: &[RoundHistory],
    ) -> anyhow::Result<Vec<StrategyTag>>;

    async fn more_competitors(
        &self,
        product: &str,
        exclude: &[String],
    ) -> anyhow::Result<Vec<String>>;

    async fn more_community_queries(
        &self,
        product: &str,
        exclude: &[String],
    ) -> anyhow::Result<Vec<String>>;
}

#[derive(Debug, Deserialize, JsonSchema)]
struct StrategyExtraction {
    product_category: String,
    target_titles: Vec<String>,
    community_queries: Vec<String>,
    news_focus: String,
    competitors: Vec<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct CompensationExtraction {
    /// Ordered tags from {"news", "competitor", "community"}, or empty to
    /// stop the compensation loop.
    tags: Vec<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SuggestionExtraction {
    suggestions: Vec<String>,
}

fn parse_tag(s: &str) -> Option<StrategyTag> {
    match s {
        "news" => Some(StrategyTag::News),
        "competitor" => Some(StrategyTag::Competitor),
        "community" => Some(StrategyTag::Community),
        _ => None,
    }
}

/// Planner backed by a [`Classify`] adapter (Claude in production).
pub struct LlmPlanner<C: Classify> {
    classifier: C,
}

impl<C: Classify> LlmPlanner<C> {
    pub fn new(classifier: C) -> Self {
        Self { classifier }
    }
}

#[async_trait]
impl<C: Classify> Planner for LlmPlanner<C> {
    async fn initial_strategy(
        &self,
        product: &str,
        target: usize,
        icp: Option<&Icp>,
    ) -> anyhow::Result<Strategy> {
        let icp_text = icp
            .map(|m| {
                m.iter()
                    .map(|(k, v)| format!("{k}: {v}"))
                    .collect::<Vec<_>>()
                    .join("; ")
            })
            .unwrap_or_default();
        let user = format!(
            "Product: {product}\nTarget leads: {target}\nIdeal customer profile: {icp_text}\n\
             Produce community search queries, a news focus phrase, competitor names, and target titles."
        );
        let extraction: StrategyExtraction = self
            .classifier
            .classify(
                "You design a lead-prospecting strategy for a product.",
                &user,
            )
            .await?;
        Ok(Strategy {
            product_category: extraction.product_category,
            target_titles: extraction.target_titles,
            community_queries: extraction.community_queries,
            news_focus: extraction.news_focus,
            competitors: extraction.competitors,
        })
    }

    async fn choose_compensation(
        &self,
        current_count: usize,
        target: usize,
        context: &ContextSummary,
        history: &[RoundHistory],
    ) -> anyhow::Result<Vec<StrategyTag>> {
        let history_text = history
            .iter()
            .map(|h| format!("{:?} -> {} new leads (succeeded={})", h.tag, h.new_leads, h.succeeded))
            .collect::<Vec<_>>()
            .join("; ");
        let user = format!(
            "Current leads: {current_count}/{target}. News pages fetched: {:?}. \
             Community queries used: {:?}. Competitors scraped: {:?}. History: {history_text}. \
             Which strategies should run next, in priority order? Use \"news\", \"competitor\", \
             \"community\", or return no tags to stop.",
            context.news_pages_fetched, context.community_queries_used, context.competitors_scraped
        );
        let extraction: CompensationExtraction = self
            .classifier
            .classify(
                "You choose which lead-sourcing strategy to run next given a shortfall.",
                &user,
            )
            .await?;
        Ok(extraction.tags.iter().filter_map(|s| parse_tag(s)).collect())
    }

    async fn more_competitors(
        &self,
        product: &str,
        exclude: &[String],
    ) -> anyhow::Result<Vec<String>> {
        let user = format!(
            "Product: {product}. Suggest competitor company names, excluding: {:?}.",
            exclude
        );
        let extraction: SuggestionExtraction = self
            .classifier
            .classify("You suggest competitor companies for a product.", &user)
            .await?;
        Ok(extraction.suggestions)
    }

    async fn more_community_queries(
        &self,
        product: &str,
        exclude: &[String],
    ) -> anyhow::Result<Vec<String>> {
        let user = format!(
            "Product: {product}. Suggest community search queries, excluding: {:?}.",
            exclude
        );
        let extraction: SuggestionExtraction = self
            .classifier
            .classify("You suggest community search queries for a product.", &user)
            .await?;
        Ok(extraction.suggestions)
    }
}

/// Deterministic, classifier-free planner: template strategy, one
/// "news"-only compensation suggestion while pages remain, no further
/// competitor/community suggestions. Used as a fallback and directly in
/// tests that need reproducible planning.
pub struct DeterministicPlanner;

#[async_trait]
impl Planner for DeterministicPlanner {
    async fn initial_strategy(
        &self,
        product: &str,
        _target: usize,
        _icp: Option<&Icp>,
    ) -> anyhow::Result<Strategy> {
        Ok(Strategy::fallback(product))
    }

    async fn choose_compensation(
        &self,
        _current_count: usize,
        _target: usize,
        _context: &ContextSummary,
        _history: &[RoundHistory],
    ) -> anyhow::Result<Vec<StrategyTag>> {
        Ok(vec![StrategyTag::News])
    }

    async fn more_competitors(
        &self,
        _product: &str,
        _exclude: &[String],
    ) -> anyhow::Result<Vec<String>> {
        Ok(Vec::new())
    }

    async fn more_community_queries(
        &self,
        _product: &str,
        _exclude: &[String],
    ) -> anyhow::Result<Vec<String>> {
        Ok(Vec::new())
    }
}
