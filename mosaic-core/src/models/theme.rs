use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of a theme. Only `Active` themes participate in
/// matching; there is no resurrection out of the terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeStatus {
    Active,
    Merged,
    Split,
    Retired,
}

impl ThemeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeStatus::Active => "active",
            ThemeStatus::Merged => "merged",
            ThemeStatus::Split => "split",
            ThemeStatus::Retired => "retired",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(ThemeStatus::Active),
            "merged" => Some(ThemeStatus::Merged),
            "split" => Some(ThemeStatus::Split),
            "retired" => Some(ThemeStatus::Retired),
            _ => None,
        }
    }
}

/// How a theme came into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeOrigin {
    /// Proposed by the extractor from batch responses.
    Extracted,
    /// Promoted from a cluster when its parent split.
    SplitChild,
}

/// Typed metadata stored as JSON at the store boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeMetadata {
    pub origin: ThemeOrigin,
    /// Number of times the description has been refreshed.
    pub refresh_count: u32,
    /// IDs of themes absorbed into this one by merges.
    pub absorbed: Vec<String>,
}

impl Default for ThemeMetadata {
    fn default() -> Self {
        Self {
            origin: ThemeOrigin::Extracted,
            refresh_count: 0,
            absorbed: Vec::new(),
        }
    }
}

/// A named theme in the living catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    /// UUID v4 identifier.
    pub id: String,
    /// Short display name (≤ 60 chars, enforced at extraction).
    pub name: String,
    /// One-sentence description, refreshed as evidence accumulates.
    pub description: String,
    /// Unit embedding in the same space as responses.
    pub embedding: Vec<f32>,
    pub status: ThemeStatus,
    /// Batch in which this theme was created.
    pub created_at_batch: u64,
    /// Batch of the most recent mutation.
    pub last_updated_batch: u64,
    /// Survivor (after merge) or parent (after split). The parent's
    /// creation batch is always strictly earlier, so the chain is acyclic.
    pub parent_theme_id: Option<String>,
    /// Number of live assignments pointing at this theme.
    pub response_count: u64,
    pub metadata: ThemeMetadata,
    pub created_at: DateTime<Utc>,
}

impl Theme {
    /// Create a fresh active theme.
    pub fn new(name: &str, description: &str, embedding: Vec<f32>, batch_id: u64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.to_string(),
            description: description.to_string(),
            embedding,
            status: ThemeStatus::Active,
            created_at_batch: batch_id,
            last_updated_batch: batch_id,
            parent_theme_id: None,
            response_count: 0,
            metadata: ThemeMetadata::default(),
            created_at: Utc::now(),
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == ThemeStatus::Active
    }
}

impl PartialEq for Theme {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

/// A theme proposal from the extractor, before deduplication against the
/// catalog and before it has an embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThemeCandidate {
    pub name: String,
    pub description: String,
}
