use std::collections::HashMap;
use std::time::Duration;

use leadscout_common::{DedupeKey, Lead, Priority, RunResult};

/// Pure, deterministic final pass over the admitted lead set: dedupe
/// globally, sort, truncate, derive priority, summarize. Given the same
/// admitted set and target this always produces the same output.
pub fn aggregate(
    admitted: Vec<Lead>,
    target: usize,
    elapsed: Duration,
    errors: Vec<String>,
) -> RunResult {
    let (deduped, duplicates_removed) = dedupe(admitted);

    let mut sorted = deduped;
    sorted.sort_by_key(|l| std::cmp::Reverse(l.intent_score));
    sorted.truncate(target);

    for lead in &mut sorted {
        lead.priority = Priority::derive(lead.intent_score);
    }

    RunResult::summarize(sorted, duplicates_removed, elapsed, errors)
}

/// Applies the §3 dedupe-key rule across the whole set: on collision keep
/// the higher-scoring lead; on tie keep the first encountered.
fn dedupe(leads: Vec<Lead>) -> (Vec<Lead>, usize) {
    let mut best: HashMap<DedupeKey, Lead> = HashMap::new();
    let mut order: Vec<DedupeKey> = Vec::new();
    let mut duplicates = 0;

    for lead in leads {
        let key = lead.dedupe_key();
        match best.get(&key) {
            Some(existing) if lead.intent_score > existing.intent_score => {
                best.insert(key, lead);
                duplicates += 1;
            }
            Some(_) => {
                duplicates += 1;
            }
            None => {
                order.push(key.clone());
                best.insert(key, lead);
            }
        }
    }

    let deduped = order.into_iter().map(|k| best.remove(&k).unwrap()).collect();
    (deduped, duplicates)
}
