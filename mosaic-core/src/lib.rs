//! # mosaic-core
//!
//! Foundation crate for the mosaic theme engine.
//! Defines all types, traits, errors, config, and constants.
//! Every other crate in the workspace depends on this.

pub mod cancellation;
pub mod config;
pub mod constants;
pub mod errors;
pub mod models;
pub mod retry;
pub mod traits;
pub mod vector;

// Re-export the most commonly used types at the crate root.
pub use cancellation::{Cancellable, CancellationToken};
pub use config::MosaicConfig;
pub use errors::{MosaicError, MosaicResult};
pub use models::{
    Assignment, BatchMetadata, BatchResult, EvolutionAction, EvolutionEntry, Highlight, Response,
    Theme, ThemeStatus,
};
