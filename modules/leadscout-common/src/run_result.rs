use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::lead::{Lead, Priority};

/// The aggregated outcome of one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// True iff the aggregator produced at least one lead.
    pub success: bool,
    pub leads: Vec<Lead>,
    pub hot_count: usize,
    pub warm_count: usize,
    pub cold_count: usize,
    pub per_platform: HashMap<String, usize>,
    pub duplicates_removed: usize,
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
    /// One string per non-fatal failure encountered during the run.
    pub errors: Vec<String>,
}

impl RunResult {
    pub fn summarize(
        leads: Vec<Lead>,
        duplicates_removed: usize,
        elapsed: Duration,
        errors: Vec<String>,
    ) -> Self {
        let mut per_platform: HashMap<String, usize> = HashMap::new();
        let mut hot_count = 0;
        let mut warm_count = 0;
        let mut cold_count = 0;

        for lead in &leads {
            *per_platform.entry(lead.source_platform.clone()).or_insert(0) += 1;
            match lead.priority {
                Priority::Hot => hot_count += 1,
                Priority::Warm => warm_count += 1,
                Priority::Cold => cold_count += 1,
            }
        }

        Self {
            success: !leads.is_empty(),
            leads,
            hot_count,
            warm_count,
            cold_count,
            per_platform,
            duplicates_removed,
            elapsed,
            errors,
        }
    }

    /// A RunResult for a cancelled job: whatever was admitted before the
    /// cancel check, success forced false, one error entry recorded.
    pub fn cancelled(leads: Vec<Lead>, elapsed: Duration, errors: Vec<String>) -> Self {
        Self::summarize(leads, 0, elapsed, errors).mark_cancelled()
    }

    /// Records the cancellation and forces `success = false` on an
    /// already-built result. Shared by `cancelled` (built via `summarize`)
    /// and callers that need the aggregator's dedupe/sort/priority pass
    /// applied first (`summarize` alone does not re-derive `priority`).
    pub fn mark_cancelled(mut self) -> Self {
        self.errors.push("job cancelled".to_string());
        self.success = false;
        self
    }
}

mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u128(d.as_millis())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let millis = u64::deserialize(d)?;
        Ok(Duration::from_millis(millis))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lead::Priority;

    fn lead(platform: &str, score: u8, priority: Priority) -> Lead {
        Lead {
            name: "A".into(),
            title: String::new(),
            company: String::new(),
            profile_url: None,
            email: None,
            intent_signal: "s".into(),
            intent_score: score,
            source_platform: platform.into(),
            source_url: "u".into(),
            priority,
        }
    }

    #[test]
    fn summarize_counts_tiers_and_platforms() {
        let leads = vec![
            lead("community", 90, Priority::Hot),
            lead("news", 70, Priority::Warm),
            lead("competitor", 65, Priority::Warm),
        ];
        let result = RunResult::summarize(leads, 2, Duration::from_secs(1), vec![]);
        assert!(result.success);
        assert_eq!(result.hot_count, 1);
        assert_eq!(result.warm_count, 2);
        assert_eq!(result.per_platform["community"], 1);
        assert_eq!(result.duplicates_removed, 2);
    }

    #[test]
    fn empty_leads_means_not_success() {
        let result = RunResult::summarize(vec![], 0, Duration::from_secs(0), vec![]);
        assert!(!result.success);
    }

    #[test]
    fn cancelled_forces_failure_and_records_error() {
        let result = RunResult::cancelled(vec![lead("news", 90, Priority::Hot)], Duration::from_secs(0), vec![]);
        assert!(!result.success);
        assert_eq!(result.errors.len(), 1);
    }
}
