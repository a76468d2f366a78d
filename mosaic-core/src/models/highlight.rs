use serde::{Deserialize, Serialize};

/// A phrase inside a response that explains its assignment to a theme.
///
/// `score` is the marginal contribution: similarity of the phrase to the
/// theme minus similarity of the whole response to the theme.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Highlight {
    pub phrase: String,
    pub score: f64,
    /// Character offsets of every occurrence of the phrase in the
    /// response text.
    pub positions: Vec<usize>,
}
