//! Structured configuration, loadable from TOML.
//!
//! Every section has serde defaults so a partial document (or none at
//! all) yields the tuned defaults. Validation runs before any state is
//! touched; a bad document is `configuration_invalid`.

pub mod defaults;

mod embedding_config;
mod generation_config;
mod ngram_config;
mod processing_config;
mod thresholds;

use serde::{Deserialize, Serialize};

use crate::errors::{MosaicError, MosaicResult};

pub use embedding_config::EmbeddingConfig;
pub use generation_config::GenerationConfig;
pub use ngram_config::NgramConfig;
pub use processing_config::ProcessingConfig;
pub use thresholds::Thresholds;

/// Top-level configuration document.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MosaicConfig {
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
    pub thresholds: Thresholds,
    pub processing: ProcessingConfig,
    pub ngram: NgramConfig,
}

impl MosaicConfig {
    /// Parse a TOML document, then validate.
    pub fn from_toml_str(s: &str) -> MosaicResult<Self> {
        let config: MosaicConfig =
            toml::from_str(s).map_err(|e| MosaicError::ConfigurationInvalid {
                reason: format!("TOML parse error: {e}"),
            })?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML config file.
    pub fn from_file(path: &std::path::Path) -> MosaicResult<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|e| MosaicError::ConfigurationInvalid {
                reason: format!("cannot read {}: {e}", path.display()),
            })?;
        Self::from_toml_str(&content)
    }

    /// Reject out-of-range options before any state mutation.
    pub fn validate(&self) -> MosaicResult<()> {
        fn invalid(reason: String) -> MosaicResult<()> {
            Err(MosaicError::ConfigurationInvalid { reason })
        }

        if self.embedding.dim == 0 {
            return invalid("embedding.dim must be positive".to_string());
        }
        if self.embedding.model.trim().is_empty() {
            return invalid("embedding.model must be set".to_string());
        }
        if self.generation.model.trim().is_empty() {
            return invalid("generation.model must be set".to_string());
        }
        if self.generation.prompt_char_limit == 0 {
            return invalid("generation.prompt_char_limit must be positive".to_string());
        }

        let t = &self.thresholds;
        for (name, value) in [
            ("match_threshold", t.match_threshold),
            ("update_threshold", t.update_threshold),
            ("merge_threshold", t.merge_threshold),
            ("split_variance_threshold", t.split_variance_threshold),
            ("drift_update", t.drift_update),
            ("min_contribution", t.min_contribution),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return invalid(format!("thresholds.{name} must be in [0, 1], got {value}"));
            }
        }
        if t.update_threshold > t.match_threshold {
            return invalid(format!(
                "thresholds.update_threshold ({}) must not exceed match_threshold ({})",
                t.update_threshold, t.match_threshold
            ));
        }
        if t.min_responses_per_theme == 0 {
            return invalid("thresholds.min_responses_per_theme must be positive".to_string());
        }

        let p = &self.processing;
        if p.embed_parallelism == 0 {
            return invalid("processing.embed_parallelism must be positive".to_string());
        }
        if p.llm_concurrency == 0 {
            return invalid("processing.llm_concurrency must be positive".to_string());
        }
        if p.max_keywords == 0 {
            return invalid("processing.max_keywords must be positive".to_string());
        }
        if p.batch_timeout_secs == 0 {
            return invalid("processing.batch_timeout_secs must be positive".to_string());
        }

        if self.ngram.min_word_length == 0 {
            return invalid("ngram.min_word_length must be positive".to_string());
        }
        if !self.ngram.unigrams && !self.ngram.bigrams && !self.ngram.trigrams {
            return invalid("ngram: at least one n-gram order must be enabled".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_tuned_values() {
        let config = MosaicConfig::default();
        assert_eq!(config.embedding.model, "nomic-embed-text");
        assert_eq!(config.embedding.dim, 768);
        assert_eq!(config.generation.model, "llama3.1");
        assert_eq!(config.thresholds.match_threshold, 0.75);
        assert_eq!(config.thresholds.update_threshold, 0.50);
        assert_eq!(config.thresholds.merge_threshold, 0.85);
        assert_eq!(config.thresholds.split_variance_threshold, 0.40);
        assert_eq!(config.thresholds.drift_update, 0.20);
        assert_eq!(config.thresholds.min_contribution, 0.05);
        assert_eq!(config.thresholds.min_responses_per_theme, 2);
        assert_eq!(config.processing.batch_size, 100);
        assert_eq!(config.processing.max_keywords, 10);
        assert_eq!(config.processing.embed_parallelism, 8);
        assert_eq!(config.processing.llm_concurrency, 1);
        assert_eq!(config.processing.batch_timeout_secs, 300);
        assert!(config.ngram.unigrams && config.ngram.bigrams && config.ngram.trigrams);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn empty_toml_yields_defaults() {
        let config = MosaicConfig::from_toml_str("").unwrap();
        assert_eq!(config.embedding.dim, 768);
    }

    #[test]
    fn partial_toml_overrides_one_section() {
        let config = MosaicConfig::from_toml_str(
            r#"
            [thresholds]
            merge_threshold = 0.9

            [processing]
            embed_parallelism = 4
            "#,
        )
        .unwrap();
        assert_eq!(config.thresholds.merge_threshold, 0.9);
        assert_eq!(config.processing.embed_parallelism, 4);
        // Untouched sections keep their defaults.
        assert_eq!(config.thresholds.match_threshold, 0.75);
        assert_eq!(config.embedding.model, "nomic-embed-text");
    }

    #[test]
    fn out_of_range_threshold_is_rejected() {
        let result = MosaicConfig::from_toml_str(
            r#"
            [thresholds]
            match_threshold = 1.5
            "#,
        );
        assert!(matches!(
            result,
            Err(MosaicError::ConfigurationInvalid { .. })
        ));
    }

    #[test]
    fn update_above_match_is_rejected() {
        let result = MosaicConfig::from_toml_str(
            r#"
            [thresholds]
            match_threshold = 0.6
            update_threshold = 0.7
            "#,
        );
        assert!(matches!(
            result,
            Err(MosaicError::ConfigurationInvalid { .. })
        ));
    }

    #[test]
    fn zero_dim_is_rejected() {
        let result = MosaicConfig::from_toml_str(
            r#"
            [embedding]
            dim = 0
            "#,
        );
        assert!(result.is_err());
    }
}
