use serde::{Deserialize, Serialize};

/// Catalog-wide counters reported by the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogStats {
    pub active_themes: u64,
    pub merged_themes: u64,
    pub split_themes: u64,
    pub retired_themes: u64,
    pub responses: u64,
    pub assignments: u64,
    pub batches: u64,
    pub cache_entries: u64,
}
