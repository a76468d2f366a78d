//! ThemeExtractor — implements IThemeExtractor over the generation
//! client: pack, prompt, parse, and recover from malformed output.

use tracing::{info, warn};

use mosaic_core::cancellation::{Cancellable, CancellationToken};
use mosaic_core::config::GenerationConfig;
use mosaic_core::errors::{MosaicError, MosaicResult};
use mosaic_core::models::{Theme, ThemeCandidate};
use mosaic_core::traits::IThemeExtractor;

use crate::client::GenerationClient;
use crate::parser;
use crate::prompts;

pub struct ThemeExtractor {
    client: GenerationClient,
    config: GenerationConfig,
    token: CancellationToken,
}

impl ThemeExtractor {
    pub fn new(client: GenerationClient, config: GenerationConfig, token: CancellationToken) -> Self {
        Self {
            client,
            config,
            token,
        }
    }

    fn check_cancelled(&self, stage: &str) -> MosaicResult<()> {
        if self.token.is_cancelled() {
            return Err(MosaicError::Cancelled {
                stage: stage.to_string(),
            });
        }
        Ok(())
    }
}

impl IThemeExtractor for ThemeExtractor {
    fn extract(
        &self,
        question: &str,
        responses: &[String],
        batch_id: u64,
    ) -> MosaicResult<Vec<ThemeCandidate>> {
        let packed = prompts::pack_responses(responses, self.config.prompt_char_limit);
        if packed.is_empty() {
            // Nothing substantive to extract from; the backend is not called.
            return Ok(vec![]);
        }
        self.check_cancelled("extraction")?;

        let output = self
            .client
            .generate(&prompts::extraction_prompt(question, &packed))?;
        match parser::parse_candidates(&output) {
            Ok(candidates) => {
                info!(batch_id, count = candidates.len(), "extracted theme candidates");
                return Ok(candidates);
            }
            Err(e) => {
                warn!(batch_id, error = %e, "extractor output unparseable, retrying with strict format");
            }
        }

        self.check_cancelled("extraction")?;
        let output = self
            .client
            .generate(&prompts::strict_reformat_prompt(question, &packed))?;
        match parser::parse_candidates(&output) {
            Ok(candidates) => {
                info!(batch_id, count = candidates.len(), "extracted candidates on reformat retry");
                Ok(candidates)
            }
            Err(e) => {
                // Recovered locally: the batch continues with no new candidates.
                warn!(batch_id, error = %e, "extractor_parse_failed");
                Ok(vec![])
            }
        }
    }

    fn refresh_description(
        &self,
        theme: &Theme,
        new_responses: &[String],
    ) -> MosaicResult<String> {
        self.check_cancelled("description refresh")?;
        let sample: Vec<String> = new_responses
            .iter()
            .take(self.config.refresh_sample_limit)
            .cloned()
            .collect();
        let packed = prompts::pack_responses(&sample, self.config.prompt_char_limit);
        let output = self.client.generate(&prompts::refresh_prompt(
            &theme.name,
            &theme.description,
            &packed,
        ))?;
        let cleaned = parser::clean_description(&output);
        if cleaned.is_empty() {
            // An empty refresh never replaces a real description.
            return Ok(theme.description.clone());
        }
        Ok(cleaned)
    }
}
