use futures::stream::{self, StreamExt};
use leadscout_adapters::Classify;
use leadscout_common::Lead;
use schemars::JsonSchema;
use serde::Deserialize;

use crate::worker::WorkerResult;

/// Seller-filter classifier's per-lead verdict. Kept as a single boolean
/// plus a short reason, per the open question in the design notes: the
/// internal representation isn't prescribed beyond {buyer, seller}.
#[derive(Debug, Deserialize, JsonSchema)]
struct SellerVerdict {
    is_seller: bool,
    #[allow(dead_code)]
    reason: String,
}

const FILTER_CONCURRENCY: usize = 5;

/// Removes candidates whose content indicates they're offering a product
/// rather than seeking one. On classifier failure for any individual
/// candidate, that candidate is kept (fail-open) and a trace line is
/// recorded — a classifier outage must never empty the lead set.
pub async fn filter_sellers<C: Classify>(
    classifier: &C,
    leads: Vec<Lead>,
    trace: &mut Vec<String>,
) -> Vec<Lead> {
    let system = "You judge whether a lead's intent signal indicates they are \
        seeking a solution (buyer) or promoting/selling one themselves (seller). \
        Sellers must be filtered out.";

    let verdicts: Vec<(Lead, anyhow::Result<SellerVerdict>)> = stream::iter(leads)
        .map(|lead| async {
            let user = format!(
                "Name: {}\nTitle: {}\nIntent signal: {}",
                lead.name, lead.title, lead.intent_signal
            );
            let verdict = classifier.classify::<SellerVerdict>(system, &user).await;
            (lead, verdict)
        })
        .buffer_unordered(FILTER_CONCURRENCY)
        .collect()
        .await;

    let mut survivors = Vec::new();
    for (lead, verdict) in verdicts {
        match verdict {
            Ok(SellerVerdict { is_seller: true, reason }) => {
                trace.push(format!("filtered seller {}: {reason}", lead.name));
            }
            Ok(SellerVerdict { is_seller: false, .. }) => survivors.push(lead),
            Err(e) => {
                trace.push(format!(
                    "seller filter failed for {}, failing open: {e}",
                    lead.name
                ));
                survivors.push(lead);
            }
        }
    }
    survivors
}

/// Shared retry wrapper for the Review layer: re-runs `attempt` up to
/// `MAX_WORKER_RETRIES` (2) additional times if it fails, constructing a
/// fresh attempt each time (workers carry no durable state across
/// invocations). Does not retry a successful-but-empty result.
pub async fn retry_worker<F, Fut>(max_retries: u32, mut attempt: F) -> WorkerResult
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = WorkerResult>,
{
    let mut result = attempt().await;
    let mut tries = 0;
    while !result.success && result.error.is_some() && tries < max_retries {
        tries += 1;
        result = attempt().await;
    }
    result
}
