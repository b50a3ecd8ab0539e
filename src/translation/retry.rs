use std::time::Duration;

use crate::app_config::TranslatorConfig;
use crate::errors::ProviderError;

/// Shortest wait between two attempts of the same batch
pub const MIN_BACKOFF: Duration = Duration::from_millis(500);

/// Policy parameters for retry decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per batch, the first one included.
    pub max_attempts: u32,
    /// Fixed wait before every retry.
    pub backoff: Duration,
}

/// Decision made by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Wait, then try again
    Retry(Duration),
    /// Give up on the batch
    GiveUp,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff: backoff.max(MIN_BACKOFF),
        }
    }

    /// `max_attempts` from the config, backoff equal to the inter-request delay
    pub fn from_config(config: &TranslatorConfig) -> Self {
        Self::new(config.max_attempts, config.delay_duration())
    }

    /// Decide what follows a failed attempt.
    ///
    /// * `attempts_made` counts the attempts already made, the failed one included.
    pub fn evaluate(&self, error: &ProviderError, attempts_made: u32) -> RetryDecision {
        if attempts_made >= self.max_attempts || !error.is_transient() {
            RetryDecision::GiveUp
        } else {
            RetryDecision::Retry(self.backoff)
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, MIN_BACKOFF)
    }
}
