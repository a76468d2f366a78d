//! KeywordHighlighter — scores candidate phrases by marginal
//! contribution: `cos(theme, phrase) − cos(theme, response)`.
//!
//! A phrase only counts as a highlight if it explains similarity the
//! whole response doesn't already have; phrases merely similar to the
//! theme in isolation score near zero and fall under the floor.

use std::sync::Arc;

use tracing::debug;

use mosaic_core::config::NgramConfig;
use mosaic_core::errors::MosaicResult;
use mosaic_core::models::Highlight;
use mosaic_core::traits::{IEmbedder, IHighlighter};
use mosaic_core::vector::cosine_similarity;

use crate::ngrams;

pub struct KeywordHighlighter {
    embedder: Arc<dyn IEmbedder>,
    ngram: NgramConfig,
    max_keywords: usize,
    min_contribution: f64,
}

impl KeywordHighlighter {
    pub fn new(
        embedder: Arc<dyn IEmbedder>,
        ngram: NgramConfig,
        max_keywords: usize,
        min_contribution: f64,
    ) -> Self {
        Self {
            embedder,
            ngram,
            max_keywords,
            min_contribution,
        }
    }
}

impl IHighlighter for KeywordHighlighter {
    fn highlight(
        &self,
        response_text: &str,
        theme_embedding: &[f32],
    ) -> MosaicResult<Vec<Highlight>> {
        let candidates = ngrams::candidates(response_text, &self.ngram);
        if candidates.is_empty() {
            return Ok(vec![]);
        }

        // Whole-response similarity is the baseline every phrase must beat.
        let response_embedding = self.embedder.embed(response_text)?;
        let baseline = cosine_similarity(theme_embedding, &response_embedding);

        let phrases: Vec<String> = candidates.iter().map(|c| c.phrase.clone()).collect();
        let embeddings = self.embedder.embed_many(&phrases)?;

        let mut scored: Vec<(Highlight, usize)> = Vec::new();
        for (candidate, embedding) in candidates.iter().zip(embeddings.iter()) {
            let score = cosine_similarity(theme_embedding, embedding) - baseline;
            if score < self.min_contribution {
                continue;
            }
            let positions = ngrams::occurrences(response_text, &candidate.phrase);
            scored.push((
                Highlight {
                    phrase: candidate.phrase.clone(),
                    score,
                    positions,
                },
                candidate.first_offset,
            ));
        }

        // Score descending; ties broken by longer phrase, then earliest.
        scored.sort_by(|(a, a_first), (b, b_first)| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.phrase.chars().count().cmp(&a.phrase.chars().count()))
                .then_with(|| a_first.cmp(b_first))
        });
        scored.truncate(self.max_keywords);

        debug!(
            candidates = phrases.len(),
            kept = scored.len(),
            "highlighting complete"
        );
        Ok(scored.into_iter().map(|(h, _)| h).collect())
    }
}
