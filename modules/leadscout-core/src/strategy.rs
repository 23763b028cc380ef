use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// The planner's output after analyzing a product description. Any field
/// may be empty; the supervisor tolerates partial strategies by skipping
/// the affected worker or asking the planner for a fallback.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Strategy {
    #[serde(default)]
    pub product_category: String,
    #[serde(default)]
    pub target_titles: Vec<String>,
    #[serde(default)]
    pub community_queries: Vec<String>,
    #[serde(default)]
    pub news_focus: String,
    #[serde(default)]
    pub competitors: Vec<String>,
}

impl Strategy {
    /// Deterministic fallback built from the product description alone:
    /// template queries, empty competitors, generic target titles.
    pub fn fallback(product: &str) -> Self {
        Self {
            product_category: product.to_string(),
            target_titles: vec!["Founder".to_string(), "Head of Growth".to_string()],
            community_queries: vec![
                format!("looking for {product}"),
                format!("{product} alternative"),
                format!("frustrated with current {product} solution"),
            ],
            news_focus: product.to_string(),
            competitors: Vec::new(),
        }
    }

    /// True if the planner returned nothing usable at all — triggers the
    /// deterministic fallback just as a planning error would.
    pub fn is_empty(&self) -> bool {
        self.target_titles.is_empty()
            && self.community_queries.is_empty()
            && self.news_focus.trim().is_empty()
            && self.competitors.is_empty()
    }
}

/// Free-form context handed to the planner alongside product/target.
pub type Icp = HashMap<String, String>;
