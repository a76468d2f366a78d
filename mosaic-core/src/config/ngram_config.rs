use serde::{Deserialize, Serialize};

use super::defaults;

/// Candidate phrase enumeration settings for the highlighter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NgramConfig {
    pub unigrams: bool,
    pub bigrams: bool,
    pub trigrams: bool,
    /// Minimum token length for a non-stopword token.
    pub min_word_length: usize,
    /// Maximum stopwords tolerated inside one phrase.
    pub max_stopwords_in_phrase: usize,
}

impl Default for NgramConfig {
    fn default() -> Self {
        Self {
            unigrams: true,
            bigrams: true,
            trigrams: true,
            min_word_length: defaults::DEFAULT_MIN_WORD_LENGTH,
            max_stopwords_in_phrase: defaults::DEFAULT_MAX_STOPWORDS_IN_PHRASE,
        }
    }
}
