//! # mosaic-extraction
//!
//! LLM-driven theme proposal and description refresh. Packs responses
//! into a bounded prompt, demands strict JSON output, and recovers from
//! malformed model output without failing the batch.

pub mod client;
pub mod extractor;
pub mod parser;
pub mod prompts;

pub use client::{GenerationClient, HttpGenerationProvider, RemoteGenerationBackend};
pub use extractor::ThemeExtractor;
