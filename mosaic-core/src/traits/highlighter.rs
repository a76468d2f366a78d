use crate::errors::MosaicResult;
use crate::models::Highlight;

/// Picks the substrings of a response whose embeddings best explain its
/// similarity to a theme.
pub trait IHighlighter: Send + Sync {
    /// At most `max_keywords` highlights, sorted by descending marginal
    /// contribution, all above the contribution floor. Deterministic for
    /// fixed embeddings and tokenization.
    fn highlight(&self, response_text: &str, theme_embedding: &[f32])
        -> MosaicResult<Vec<Highlight>>;
}
