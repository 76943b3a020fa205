//! Bounded retry with exponential backoff for search requests.
//!
//! Only failures classified by [`SearchError::is_transient`] are retried.
//! Everything else is returned on the first attempt.

use std::future::Future;
use std::time::Duration;

use supplink_core::AppConfig;

use crate::error::SearchError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total tries, including the first. Values below 1 are treated as 1.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(300),
            factor: 2.0,
        }
    }
}

impl RetryPolicy {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            max_attempts: config.search_max_attempts,
            base_delay: Duration::from_millis(config.search_backoff_base_ms),
            factor: config.search_backoff_factor,
        }
    }

    /// A policy that tries once and never sleeps.
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            base_delay: Duration::ZERO,
            factor: 1.0,
        }
    }

    /// Sleep before retry number `retry` (0-based): `base_delay * factor^retry`.
    ///
    /// Computed in whole nanoseconds so that e.g. 300ms × 2 is exactly 600ms.
    /// Saturates at `Duration::MAX` instead of overflowing.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let nanos = (self.base_delay.as_nanos() as f64 * self.factor.powi(exponent)).round();
        if nanos.is_nan() || nanos <= 0.0 {
            Duration::ZERO
        } else if nanos >= u64::MAX as f64 {
            Duration::MAX
        } else {
            Duration::from_nanos(nanos as u64)
        }
    }
}

/// Runs `operation` until it succeeds, fails non-transiently, or the policy's
/// attempts are used up. On exhaustion the last transient error is returned.
///
/// # Errors
///
/// Returns the error from the final attempt.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: &RetryPolicy,
    mut operation: F,
) -> Result<T, SearchError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, SearchError>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut retry = 0u32;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };
        let attempt = retry + 1;
        if !err.is_transient() || attempt >= max_attempts {
            return Err(err);
        }

        let delay = policy.delay_for(retry);
        tracing::warn!(
            attempt,
            max_attempts,
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            error = %err,
            "transient search error, retrying after backoff"
        );
        tokio::time::sleep(delay).await;
        retry += 1;
    }
}
