//! Candidate phrase enumeration: unigrams, bigrams, and trigrams over
//! the lowercased response, with stopword-aware filtering.

use mosaic_core::config::NgramConfig;

use crate::stopwords::is_stopword;

/// A token with its character offset in the source text.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// Lowercased token text.
    pub text: String,
    /// Character offset of the token start in the original text.
    pub char_offset: usize,
}

/// A candidate phrase, joined with single spaces.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub phrase: String,
    /// Character offset of the earliest occurrence.
    pub first_offset: usize,
}

/// Split text into lowercased alphanumeric tokens with char offsets.
pub fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut start = 0usize;
    for (i, c) in text.chars().enumerate() {
        if c.is_alphanumeric() {
            if current.is_empty() {
                start = i;
            }
            current.extend(c.to_lowercase());
        } else if !current.is_empty() {
            tokens.push(Token {
                text: std::mem::take(&mut current),
                char_offset: start,
            });
        }
    }
    if !current.is_empty() {
        tokens.push(Token {
            text: current,
            char_offset: start,
        });
    }
    tokens
}

/// Whether a token counts against the stopword budget of a phrase.
/// Short tokens carry as little signal as true stopwords and are
/// treated the same way.
fn is_weak(token: &Token, min_word_length: usize) -> bool {
    is_stopword(&token.text) || token.text.chars().count() < min_word_length
}

fn phrase_is_valid(window: &[Token], config: &NgramConfig) -> bool {
    let weak = window
        .iter()
        .filter(|t| is_weak(t, config.min_word_length))
        .count();
    weak <= config.max_stopwords_in_phrase && weak < window.len()
}

/// Enumerate candidate phrases, deduplicated by text with the earliest
/// occurrence kept. Order of first appearance is preserved.
pub fn candidates(text: &str, config: &NgramConfig) -> Vec<Candidate> {
    let tokens = tokenize(text);
    let mut orders: Vec<usize> = Vec::new();
    if config.unigrams {
        orders.push(1);
    }
    if config.bigrams {
        orders.push(2);
    }
    if config.trigrams {
        orders.push(3);
    }

    let mut seen: Vec<String> = Vec::new();
    let mut result: Vec<Candidate> = Vec::new();
    for n in orders {
        for window in tokens.windows(n) {
            if !phrase_is_valid(window, config) {
                continue;
            }
            let phrase = window
                .iter()
                .map(|t| t.text.as_str())
                .collect::<Vec<_>>()
                .join(" ");
            if seen.contains(&phrase) {
                continue;
            }
            seen.push(phrase.clone());
            result.push(Candidate {
                phrase,
                first_offset: window[0].char_offset,
            });
        }
    }
    result
}

/// Character offsets of every case-insensitive occurrence of `phrase`
/// (a token sequence) in `text`.
///
/// Matches at the token level, not as a literal substring: the source
/// may separate the phrase's tokens with punctuation or extra
/// whitespace, and a phrase never matches inside a longer word.
pub fn occurrences(text: &str, phrase: &str) -> Vec<usize> {
    let tokens = tokenize(text);
    let needle: Vec<&str> = phrase.split(' ').filter(|t| !t.is_empty()).collect();
    if needle.is_empty() || tokens.len() < needle.len() {
        return Vec::new();
    }
    tokens
        .windows(needle.len())
        .filter(|window| {
            window
                .iter()
                .zip(needle.iter())
                .all(|(token, part)| token.text == *part)
        })
        .map(|window| window[0].char_offset)
        .collect()
}
