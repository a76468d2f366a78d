//! Query modules, one per entity family. All functions operate on a
//! borrowed connection so they compose inside the engine's transactions.

pub mod aggregation;
pub mod assignment_ops;
pub mod batch_commit;
pub mod batch_ops;
pub mod cache_ops;
pub mod evolution_ops;
pub mod maintenance;
pub mod response_ops;
pub mod theme_ops;
pub mod vector_search;

use chrono::{DateTime, Utc};

use mosaic_core::errors::MosaicResult;

use crate::to_storage_err;

/// Parse an RFC 3339 timestamp column.
pub(crate) fn parse_timestamp(s: &str) -> MosaicResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| to_storage_err(format!("bad timestamp {s:?}: {e}")))
}
