use serde::{Deserialize, Serialize};

use super::defaults;

/// The tuned similarity thresholds that glue the subsystems together.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    /// Minimum cosine similarity for assigning a response to a theme.
    pub match_threshold: f64,
    /// Lower bound of the "near" band feeding description refresh pools.
    pub update_threshold: f64,
    /// Similarity at which two themes (or a candidate and a theme)
    /// are duplicates.
    pub merge_threshold: f64,
    /// Intra-cluster variance above which a theme is split.
    pub split_variance_threshold: f64,
    /// Minimum embedding drift (cosine distance) for a description
    /// refresh to be applied.
    pub drift_update: f64,
    /// Minimum marginal contribution for a highlight to be kept.
    pub min_contribution: f64,
    /// Minimum members for each child of a split.
    pub min_responses_per_theme: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            match_threshold: defaults::DEFAULT_MATCH_THRESHOLD,
            update_threshold: defaults::DEFAULT_UPDATE_THRESHOLD,
            merge_threshold: defaults::DEFAULT_MERGE_THRESHOLD,
            split_variance_threshold: defaults::DEFAULT_SPLIT_VARIANCE_THRESHOLD,
            drift_update: defaults::DEFAULT_DRIFT_UPDATE,
            min_contribution: defaults::DEFAULT_MIN_CONTRIBUTION,
            min_responses_per_theme: defaults::DEFAULT_MIN_RESPONSES_PER_THEME,
        }
    }
}
