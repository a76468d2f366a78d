//! # mosaic-evolution
//!
//! The theme evolution engine: matches responses to the live catalog,
//! dedupes fresh candidates, and runs the merge / split / refresh passes
//! that keep the catalog coherent as batches accumulate. The evolver
//! performs no writes of its own; it emits a mutation plan the store
//! applies atomically.

pub mod catalog;
pub mod evolver;
pub mod kmeans;

pub use catalog::{CatalogView, ThemeState};
pub use evolver::{EvolutionOutcome, ThemeEvolver};
