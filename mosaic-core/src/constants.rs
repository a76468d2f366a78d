/// Mosaic system version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Maximum number of candidate themes considered per response during matching.
pub const MAX_CANDIDATES_PER_RESPONSE: usize = 3;

/// Minimum number of themes the extractor accepts from one batch.
pub const EXTRACTION_MIN_THEMES: usize = 2;

/// Maximum number of themes the extractor accepts from one batch.
pub const EXTRACTION_MAX_THEMES: usize = 10;

/// Character budget for a theme name.
pub const MAX_THEME_NAME_CHARS: usize = 60;

/// Minimum number of new or near-matching responses a theme must accumulate
/// in a batch before its description is refreshed.
pub const MIN_REFRESH_POOL: usize = 3;

/// Tolerance for the unit-norm storage invariant.
pub const UNIT_NORM_TOLERANCE: f64 = 1e-6;
