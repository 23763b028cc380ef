//! The Supervisor Orchestrator: drives a single job from a product
//! description to a [`RunResult`] while streaming [`Event`]s. Composes the
//! planner, the three source workers, [`Context`], and the aggregator.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use leadscout_adapters::{Classify, SourceFetch, WebSearch};
use leadscout_common::{Event, EventSink, Lead, RunResult};
use tracing::warn;

use crate::aggregator::aggregate;
use crate::cancel::CancelSignal;
use crate::context::Context;
use crate::filter::retry_worker;
use crate::planner::{Planner, RoundHistory, StrategyTag};
use crate::strategy::{Icp, Strategy};
use crate::worker::{per_worker_target, WorkerResult};
use crate::workers::{CommunityWorker, CompetitorWorker, NewsWorker};

const WORKER_COUNT: usize = 3;
const PER_WORKER_BUFFER: usize = 5;
const MAX_ROUNDS: u32 = 3;
const MAX_WORKER_RETRIES: u32 = 2;
const NEWS_PAGE_BATCH: u32 = 2;

fn now() -> chrono::DateTime<Utc> {
    Utc::now()
}

/// Runs `attempt` through the Review layer (retry on failure, up to
/// [`MAX_WORKER_RETRIES`] extra tries), logs validity/emptiness per
/// §4.1.1, and emits `worker_complete` / `worker_update` events.
async fn review<F, Fut>(source: &str, sink: &dyn EventSink, attempt: F) -> WorkerResult
where
    F: FnMut() -> Fut,
    Fut: Future<Output = WorkerResult>,
{
    let result = retry_worker(MAX_WORKER_RETRIES, attempt).await;

    if result.success {
        if result.leads.is_empty() {
            warn!(source, "worker completed with no leads");
        } else {
            let invalid = result.leads.iter().filter(|l| !l.is_valid()).count();
            if invalid > result.leads.len() - invalid {
                warn!(source, invalid, total = result.leads.len(), "most leads failed structural validity");
            }
        }
    }

    for line in &result.trace {
        sink.emit(Event::WorkerUpdate {
            at: now(),
            source: source.to_string(),
            message: line.clone(),
        });
    }
    sink.emit(Event::WorkerComplete {
        at: now(),
        source: source.to_string(),
        lead_count: result.leads.len(),
        success: result.success,
    });

    result
}

/// The job engine. Generic over the three adapter capabilities; holds a
/// planner as a trait object since [`Planner`] is dyn-safe (unlike
/// [`Classify`], whose generic method forces static dispatch on workers).
pub struct Supervisor<'a, F, C, W> {
    fetcher: &'a F,
    classifier: &'a C,
    web_search: &'a W,
    planner: Arc<dyn Planner>,
}

impl<'a, F, C, W> Supervisor<'a, F, C, W>
where
    F: SourceFetch,
    C: Classify,
    W: WebSearch,
{
    pub fn new(fetcher: &'a F, classifier: &'a C, web_search: &'a W, planner: Arc<dyn Planner>) -> Self {
        Self {
            fetcher,
            classifier,
            web_search,
            planner,
        }
    }

    /// Drives one job to completion. Never raises for worker-level
    /// failures (they land in `RunResult.errors`); the only way this
    /// returns an empty failing result is an unusable strategy with no
    /// fallback, which cannot happen here since [`Strategy::fallback`] is
    /// always constructible from `product`.
    pub async fn run(
        &self,
        product: &str,
        target: usize,
        icp: Option<&Icp>,
        sink: &dyn EventSink,
        cancel: &CancelSignal,
    ) -> RunResult {
        let start = Instant::now();
        let mut errors: Vec<String> = Vec::new();
        let context = Context::new();

        sink.emit(Event::Status {
            at: now(),
            message: format!("job started: product={product:?} target={target}"),
        });

        let strategy = self.plan(product, target, icp).await;
        sink.emit(Event::Thought {
            at: now(),
            message: format!(
                "strategy: {} community queries, {} competitors, news_focus={:?}, {} target titles",
                strategy.community_queries.len(),
                strategy.competitors.len(),
                strategy.news_focus,
                strategy.target_titles.len(),
            ),
        });

        if cancel.is_cancelled() {
            return self.finish_cancelled(context.leads().await, target, start, errors, sink);
        }

        let (community_result, news_result, competitor_result) =
            self.fan_out(&strategy, product, target, &context, sink, cancel).await;

        context.mark_community_queries(&strategy.community_queries).await;
        context.mark_competitors_scraped(&strategy.competitors).await;

        for (source, result) in [
            ("community", &community_result),
            ("news", &news_result),
            ("competitor", &competitor_result),
        ] {
            if let Some(err) = &result.error {
                errors.push(format!("{source}: {err}"));
                sink.emit(Event::Error {
                    at: now(),
                    message: format!("{source} worker failed: {err}"),
                });
            }
        }

        // Context is the canonical admitted set (score-aware on collision,
        // per aggregator::dedupe's rule); these calls register each
        // worker's leads but a later-registered, higher-scoring duplicate
        // can still replace an earlier one.
        for result in [community_result, news_result, competitor_result] {
            context.add_leads(result.leads).await;
        }

        if cancel.is_cancelled() {
            return self.finish_cancelled(context.leads().await, target, start, errors, sink);
        }

        self.compensate(&strategy, product, target, &context, &mut errors, sink, cancel)
            .await;

        if cancel.is_cancelled() {
            return self.finish_cancelled(context.leads().await, target, start, errors, sink);
        }

        let elapsed = start.elapsed();
        let result = aggregate(context.leads().await, target, elapsed, errors);
        self.emit_final(&result, sink);
        result
    }

    async fn plan(&self, product: &str, target: usize, icp: Option<&Icp>) -> Strategy {
        match self.planner.initial_strategy(product, target, icp).await {
            Ok(s) if !s.is_empty() => s,
            Ok(_) => {
                warn!("planner returned an empty strategy, using deterministic fallback");
                Strategy::fallback(product)
            }
            Err(e) => {
                warn!(error = %e, "initial strategy planning failed, using deterministic fallback");
                Strategy::fallback(product)
            }
        }
    }

    /// Phase II: exactly one instance of each worker, launched concurrently.
    async fn fan_out(
        &self,
        strategy: &Strategy,
        product: &str,
        target: usize,
        context: &Context,
        sink: &dyn EventSink,
        cancel: &CancelSignal,
    ) -> (WorkerResult, WorkerResult, WorkerResult) {
        let per_target = per_worker_target(target, WORKER_COUNT, PER_WORKER_BUFFER);
        let news_pages = context.next_news_pages(NEWS_PAGE_BATCH).await;

        sink.emit(Event::WorkerStart { at: now(), source: "community".to_string() });
        sink.emit(Event::WorkerStart { at: now(), source: "news".to_string() });
        sink.emit(Event::WorkerStart { at: now(), source: "competitor".to_string() });

        let community_worker = CommunityWorker::new(self.fetcher, self.classifier);
        let news_worker = NewsWorker::new(self.fetcher, self.classifier, self.web_search);
        let competitor_worker = CompetitorWorker::new(self.fetcher, self.classifier, self.web_search);

        tokio::join!(
            review("community", sink, || community_worker.run(
                &strategy.community_queries,
                per_target,
                cancel,
            )),
            review("news", sink, || news_worker.run(
                &strategy.news_focus,
                product,
                &strategy.target_titles,
                &news_pages,
                per_target,
                cancel,
            )),
            review("competitor", sink, || competitor_worker.run(
                &strategy.competitors,
                per_target,
                cancel,
            )),
        )
    }

    /// Phase III: the bounded compensation loop.
    #[allow(clippy::too_many_arguments)]
    async fn compensate(
        &self,
        strategy: &Strategy,
        product: &str,
        target: usize,
        context: &Context,
        errors: &mut Vec<String>,
        sink: &dyn EventSink,
        cancel: &CancelSignal,
    ) {
        let mut rounds = 0u32;
        let mut history: Vec<RoundHistory> = Vec::new();

        while context.lead_count().await < target && rounds < MAX_ROUNDS {
            if cancel.is_cancelled() {
                break;
            }

            let context_summary = context.summary().await;
            let current_count = context_summary.emitted_lead_count;
            let tags = match self
                .planner
                .choose_compensation(current_count, target, &context_summary, &history)
                .await
            {
                Ok(tags) if !tags.is_empty() => tags,
                Ok(_) => break,
                Err(e) => {
                    warn!(error = %e, "compensation planning failed, falling back to news-only");
                    if context_summary.news_pages_fetched.is_empty() {
                        break;
                    }
                    vec![StrategyTag::News]
                }
            };

            rounds += 1;
            sink.emit(Event::Thought {
                at: now(),
                message: format!("compensation round {rounds}: {tags:?}"),
            });

            for tag in tags {
                let count = context.lead_count().await;
                if cancel.is_cancelled() || count >= target {
                    break;
                }
                let remaining = target - count + PER_WORKER_BUFFER;
                let entry = self
                    .run_compensation_tag(tag, strategy, product, remaining, context, sink, cancel)
                    .await;
                if let Some((error, hist)) = entry {
                    if let Some(err) = error {
                        errors.push(err);
                    }
                    history.push(hist);
                } else {
                    history.push(RoundHistory {
                        tag,
                        new_leads: 0,
                        succeeded: false,
                    });
                }
            }
        }
    }

    #[allow(clippy::too_many_arguments)]
    async fn run_compensation_tag(
        &self,
        tag: StrategyTag,
        strategy: &Strategy,
        product: &str,
        remaining_target: usize,
        context: &Context,
        sink: &dyn EventSink,
        cancel: &CancelSignal,
    ) -> Option<(Option<String>, RoundHistory)> {
        match tag {
            StrategyTag::News => {
                let pages = context.next_news_pages(NEWS_PAGE_BATCH).await;
                sink.emit(Event::WorkerStart { at: now(), source: "news".to_string() });
                let worker = NewsWorker::new(self.fetcher, self.classifier, self.web_search);
                let result = review("news", sink, || {
                    worker.run(
                        &strategy.news_focus,
                        product,
                        &strategy.target_titles,
                        &pages,
                        remaining_target,
                        cancel,
                    )
                })
                .await;
                let error = result.error.as_ref().map(|e| format!("news: {e}"));
                let newly = context.add_leads(result.leads).await;
                let hist = RoundHistory {
                    tag,
                    new_leads: newly.len(),
                    succeeded: error.is_none(),
                };
                Some((error, hist))
            }
            StrategyTag::Competitor => {
                let exclude = context.summary().await.competitors_scraped;
                let suggested = match self.planner.more_competitors(product, &exclude).await {
                    Ok(v) => v,
                    Err(e) => {
                        warn!(error = %e, "competitor suggestion failed");
                        Vec::new()
                    }
                };
                let fresh = context.unused_competitors(&suggested).await;
                if fresh.is_empty() {
                    return None;
                }
                context.mark_competitors_scraped(&fresh).await;
                sink.emit(Event::WorkerStart { at: now(), source: "competitor".to_string() });
                let worker = CompetitorWorker::new(self.fetcher, self.classifier, self.web_search);
                let result = review("competitor", sink, || worker.run(&fresh, remaining_target, cancel)).await;
                let error = result.error.as_ref().map(|e| format!("competitor: {e}"));
                let newly = context.add_leads(result.leads).await;
                let hist = RoundHistory {
                    tag,
                    new_leads: newly.len(),
                    succeeded: error.is_none(),
                };
                Some((error, hist))
            }
            StrategyTag::Community => {
                let exclude = context.summary().await.community_queries_used;
                let suggested = match self.planner.more_community_queries(product, &exclude).await {
                    Ok(v) => v,
                    Err(e) => {
                        warn!(error = %e, "community query suggestion failed");
                        Vec::new()
                    }
                };
                let fresh = context.unused_queries(&suggested).await;
                if fresh.is_empty() {
                    return None;
                }
                context.mark_community_queries(&fresh).await;
                sink.emit(Event::WorkerStart { at: now(), source: "community".to_string() });
                let worker = CommunityWorker::new(self.fetcher, self.classifier);
                let result = review("community", sink, || worker.run(&fresh, remaining_target, cancel)).await;
                let error = result.error.as_ref().map(|e| format!("community: {e}"));
                let newly = context.add_leads(result.leads).await;
                let hist = RoundHistory {
                    tag,
                    new_leads: newly.len(),
                    succeeded: error.is_none(),
                };
                Some((error, hist))
            }
        }
    }

    fn finish_cancelled(
        &self,
        admitted: Vec<Lead>,
        target: usize,
        start: Instant,
        errors: Vec<String>,
        sink: &dyn EventSink,
    ) -> RunResult {
        let elapsed = start.elapsed();
        let result = aggregate(admitted, target, elapsed, errors).mark_cancelled();
        sink.emit(Event::Cancelled { at: now() });
        result
    }

    fn emit_final(&self, result: &RunResult, sink: &dyn EventSink) {
        let mut grouped: Vec<(String, Vec<Lead>)> = Vec::new();
        for lead in &result.leads {
            match grouped.iter_mut().find(|(platform, _)| platform == &lead.source_platform) {
                Some((_, leads)) => leads.push(lead.clone()),
                None => grouped.push((lead.source_platform.clone(), vec![lead.clone()])),
            }
        }
        for (source, leads) in grouped {
            sink.emit(Event::LeadBatch { at: now(), source, leads });
        }
        sink.emit(Event::Completed {
            at: now(),
            summary: format!(
                "{} leads ({} hot, {} warm, {} cold), {} duplicates removed, {} errors",
                result.leads.len(),
                result.hot_count,
                result.warm_count,
                result.cold_count,
                result.duplicates_removed,
                result.errors.len(),
            ),
        });
    }
}
