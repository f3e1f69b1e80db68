/*!
 * Bounded retry with exponential backoff.
 */

use std::future::Future;
use std::time::Duration;

use log::warn;
use tokio_util::sync::CancellationToken;

use crate::app_config::TranslationCommonConfig;
use crate::errors::BackendError;

/// How often and how patiently a failed request is retried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts including the first one, at least 1
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

/// Why a retried operation gave up
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryFailure {
    Exhausted { attempts: u32, error: BackendError },
    Cancelled,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
        }
    }

    /// Retry without waiting between attempts
    pub fn immediate(max_attempts: u32) -> Self {
        Self::new(max_attempts, Duration::ZERO, Duration::ZERO)
    }

    pub fn from_config(common: &TranslationCommonConfig) -> Self {
        Self::new(
            common.max_attempts,
            Duration::from_millis(common.retry_backoff_ms),
            Duration::from_millis(common.retry_max_backoff_ms),
        )
    }

    /// Delay after failed attempt number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay
            .checked_mul(1u32 << exponent)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    /// Run `operation` until it succeeds, fails for good, or `cancel` fires
    ///
    /// Only errors marked retryable are retried. Cancellation is observed
    /// before each attempt and during backoff sleeps, never mid-request.
    pub async fn run<T, F, Fut>(&self, cancel: &CancellationToken, label: &str, mut operation: F) -> Result<T, RetryFailure>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        let mut attempt = 0;
        loop {
            if cancel.is_cancelled() {
                return Err(RetryFailure::Cancelled);
            }
            attempt += 1;

            let error = match operation().await {
                Ok(value) => return Ok(value),
                Err(error) => error,
            };

            if !error.retryable || attempt >= self.max_attempts {
                return Err(RetryFailure::Exhausted { attempts: attempt, error });
            }

            let delay = self.delay_for(attempt);
            warn!(
                "{} failed (attempt {}/{}): {}. Retrying in {:?}",
                label, attempt, self.max_attempts, error, delay
            );
            tokio::select! {
                _ = cancel.cancelled() => return Err(RetryFailure::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&TranslationCommonConfig::default())
    }
}
