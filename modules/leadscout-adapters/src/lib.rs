pub mod classify;
pub mod mock;
pub mod traits;

pub use classify::ClaudeClassifier;
pub use traits::{Classify, RawBatch, SourceFetch, SourceKind, WebSearch, WebSearchHit};
