//! # mosaic-processing
//!
//! Orchestrates a single batch end-to-end: persist responses, extract
//! and dedupe candidates, assign and highlight, run the evolution
//! passes, and commit everything in one transaction.

pub mod processor;

pub use processor::BatchProcessor;
