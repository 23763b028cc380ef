use serde::{Deserialize, Serialize};

/// One qualified prospect surfaced by a source worker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lead {
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub profile_url: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Short human-readable quote or reason this person is a prospect.
    pub intent_signal: String,
    /// In [0, 100]. Derived by the worker's scoring step, never by a caller.
    pub intent_score: u8,
    pub source_platform: String,
    pub source_url: String,
    /// Set only by `Aggregator::aggregate`; any value set earlier is
    /// overwritten there.
    #[serde(default)]
    pub priority: Priority,
}

impl Lead {
    /// Required-field validity per the Worker Pipeline Contract: `name`,
    /// `intent_signal`, `source_platform` non-empty. `intent_score` >= 60
    /// additionally requires a non-empty `intent_signal` (redundant with the
    /// base rule but named explicitly by the data model).
    pub fn is_valid(&self) -> bool {
        !self.name.trim().is_empty()
            && !self.intent_signal.trim().is_empty()
            && !self.source_platform.trim().is_empty()
            && (self.intent_score < 60 || !self.intent_signal.trim().is_empty())
    }

    /// Canonical identity used to recognize the same person across workers
    /// and rounds. Priority order: profile_url > (name, company) > email >
    /// name alone.
    pub fn dedupe_key(&self) -> DedupeKey {
        if let Some(url) = self
            .profile_url
            .as_deref()
            .map(normalize_url)
            .filter(|s| !s.is_empty())
        {
            return DedupeKey(url);
        }
        let name = normalize(&self.name);
        let company = normalize(&self.company);
        if !name.is_empty() && !company.is_empty() {
            return DedupeKey(format!("{name}|{company}"));
        }
        if let Some(email) = self
            .email
            .as_deref()
            .map(normalize)
            .filter(|s| !s.is_empty())
        {
            return DedupeKey(format!("email:{email}"));
        }
        DedupeKey(format!("name:{name}"))
    }
}

/// Canonical identity derived from a [`Lead`] per the dedupe-key rules.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupeKey(String);

impl DedupeKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

fn normalize_url(s: &str) -> String {
    normalize(s).trim_end_matches('/').to_string()
}

/// Priority tier derived from `intent_score`. `hot` >= 80, `warm` in
/// [60, 80), `cold` < 60.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Cold,
    Warm,
    Hot,
}

impl Priority {
    pub fn derive(intent_score: u8) -> Self {
        if intent_score >= 80 {
            Priority::Hot
        } else if intent_score >= 60 {
            Priority::Warm
        } else {
            Priority::Cold
        }
    }
}
