/// Theme extraction and LLM generation errors.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// Generation failed after all retries.
    #[error("generation failed after {attempts} attempts: {reason}")]
    GenerationFailed { attempts: u32, reason: String },

    /// A single generation request failed with a transient condition.
    #[error("transient generation backend error: {reason}")]
    Transient { reason: String },

    /// The model output could not be parsed as the required JSON shape.
    /// Recovered locally (one reformat retry, then an empty candidate
    /// list); only surfaces when a caller asks for strict parsing.
    #[error("extractor output parse failed: {reason}")]
    ParseFailed { reason: String },
}
