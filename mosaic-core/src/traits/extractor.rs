use crate::errors::MosaicResult;
use crate::models::{Theme, ThemeCandidate};

/// LLM-driven theme proposal and description refresh.
pub trait IThemeExtractor: Send + Sync {
    /// Propose candidate themes for a batch of responses under a question.
    /// Responses are packed into the prompt up to the context budget;
    /// oversized batches are deterministically sub-sampled. Unparseable
    /// model output recovers to an empty list, never a fatal error.
    fn extract(
        &self,
        question: &str,
        responses: &[String],
        batch_id: u64,
    ) -> MosaicResult<Vec<ThemeCandidate>>;

    /// Produce a revised one-sentence description faithful to both the
    /// existing description and the newly assigned responses.
    fn refresh_description(&self, theme: &Theme, new_responses: &[String])
        -> MosaicResult<String>;
}
