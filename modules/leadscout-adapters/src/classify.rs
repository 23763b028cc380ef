use ai_client::{Claude, StructuredOutput};
use async_trait::async_trait;

use crate::traits::Classify;

/// Production [`Classify`] adapter backed by Claude's tool-use extraction.
/// Mirrors the one-schema-per-decision, `Claude::extract::<T>` pattern used
/// throughout the scout-supervisor's LLM checks.
pub struct ClaudeClassifier {
    claude: Claude,
}

impl ClaudeClassifier {
    pub fn new(claude: Claude) -> Self {
        Self { claude }
    }
}

#[async_trait]
impl Classify for ClaudeClassifier {
    async fn classify<T: StructuredOutput>(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> anyhow::Result<T> {
        self.claude.extract(system_prompt, user_prompt).await
    }
}
