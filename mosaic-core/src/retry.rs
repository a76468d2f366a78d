//! Capped exponential retry for transient remote failures.
//!
//! Both backends (embeddings, generation) share the same policy: up to
//! 3 attempts, base delay 500 ms, factor 2, capped. Permanent errors are
//! returned immediately without retry.

use std::time::Duration;

use crate::errors::{EmbeddingError, ExtractionError};

/// Errors that may succeed on retry (timeouts, 5xx).
pub trait TransientError {
    fn is_transient(&self) -> bool;
}

impl TransientError for EmbeddingError {
    fn is_transient(&self) -> bool {
        matches!(self, EmbeddingError::Transient { .. })
    }
}

impl TransientError for ExtractionError {
    fn is_transient(&self) -> bool {
        matches!(self, ExtractionError::Transient { .. })
    }
}

/// Configuration for retry behaviour on transient errors.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the initial request).
    pub max_attempts: u32,
    /// Base delay before the first retry.
    pub initial_delay: Duration,
    /// Cap on exponential growth.
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
        }
    }
}

impl RetryConfig {
    /// Delay for a given attempt (0-indexed): `initial * 2^attempt`, capped.
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay = self
            .initial_delay
            .saturating_mul(2u32.saturating_pow(attempt));
        delay.min(self.max_delay)
    }
}

/// Execute an operation with retry on transient errors.
///
/// Returns the last transient error after exhaustion; permanent errors
/// propagate immediately.
pub fn with_retry<T, E, F>(config: &RetryConfig, operation: &str, mut f: F) -> Result<T, E>
where
    E: TransientError + std::fmt::Display,
    F: FnMut() -> Result<T, E>,
{
    let mut last_err = None;
    for attempt in 0..config.max_attempts {
        match f() {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() => {
                if attempt + 1 < config.max_attempts {
                    let delay = config.delay_for_attempt(attempt);
                    tracing::warn!(
                        operation,
                        attempt = attempt + 1,
                        max_attempts = config.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying after transient error"
                    );
                    std::thread::sleep(delay);
                }
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }
    Err(last_err.expect("retry loop ran at least once"))
}
