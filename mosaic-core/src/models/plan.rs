//! The fully computed mutation set for one batch.
//!
//! The evolver and processor do all remote work (embedding, extraction,
//! highlighting) against in-memory working sets, then hand the store a
//! `BatchPlan` to apply in a single write transaction. Nothing from the
//! plan survives a failed commit.

use serde::{Deserialize, Serialize};

use super::assignment::Assignment;
use super::batch::BatchMetadata;
use super::evolution::EvolutionEntry;
use super::theme::{Theme, ThemeMetadata, ThemeStatus};

/// In-place mutation of an existing theme (description refresh,
/// post-merge embedding, metadata bump).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeUpdate {
    pub theme_id: String,
    pub description: Option<String>,
    pub embedding: Option<Vec<f32>>,
    pub metadata: Option<ThemeMetadata>,
    pub last_updated_batch: u64,
}

/// Status transition for an existing theme. At most one per theme
/// per batch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusChange {
    pub theme_id: String,
    pub status: ThemeStatus,
    /// Survivor (merge) or stays the theme's own parent (split/retire).
    pub parent_theme_id: Option<String>,
    pub batch_id: u64,
}

/// Bulk pointer rewrite: every live assignment of `from_theme_id` moves
/// to `to_theme_id` (merges).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentRewrite {
    pub from_theme_id: String,
    pub to_theme_id: String,
}

/// Targeted pointer rewrite for a single (response, theme) pair
/// (split children by nearest centroid).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssignmentRetarget {
    pub response_id: String,
    pub from_theme_id: String,
    pub to_theme_id: String,
}

/// Everything one batch mutates, in application order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchPlan {
    pub batch_id: u64,
    /// Freshly created themes (deduped candidates, split children).
    pub new_themes: Vec<Theme>,
    /// New assignments for this batch (upsert on the unique pair).
    pub assignments: Vec<Assignment>,
    /// Merge rewrites, applied before retargets.
    pub rewrites: Vec<AssignmentRewrite>,
    /// Split retargets.
    pub retargets: Vec<AssignmentRetarget>,
    /// Status transitions (merged losers, split parents, retirements).
    pub status_changes: Vec<StatusChange>,
    /// Description/embedding/metadata updates.
    pub theme_updates: Vec<ThemeUpdate>,
    /// Log entries appended by the batch, in sub-step order.
    pub evolution: Vec<EvolutionEntry>,
    /// Batch metadata row; its insert enforces batch monotonicity.
    pub metadata: Option<BatchMetadata>,
}

impl BatchPlan {
    pub fn new(batch_id: u64) -> Self {
        Self {
            batch_id,
            ..Default::default()
        }
    }
}
