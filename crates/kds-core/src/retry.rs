//! Caller-level retry policy
//!
//! Core operations are single-attempt. Callers that want retries wrap a
//! call in `RetryPolicy::run`; only errors reporting `is_retryable()` are
//! repeated, validation and not-found failures return immediately.

use crate::error::KdsError;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Exponential backoff settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 5_000,
        }
    }
}

impl RetryPolicy {
    /// Single attempt, no retries
    #[inline]
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    #[inline]
    #[must_use]
    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Delay before attempt `attempt + 1` (1-based `attempt`)
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt.saturating_sub(1)).unwrap_or(u64::MAX);
        let millis = self.base_delay_ms.saturating_mul(factor).min(self.max_delay_ms);
        Duration::from_millis(millis)
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, KdsError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, KdsError>>,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    let delay = self.delay_for(attempt);
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "retrying remote operation"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiError;
    use crate::error::{RemoteOperation, ValidationError};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn unavailable() -> KdsError {
        KdsError::remote(
            RemoteOperation::ListOrders,
            ApiError::Unavailable("down".to_string()),
        )
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let policy = RetryPolicy {
            max_attempts: 10,
            base_delay_ms: 100,
            max_delay_ms: 1_000,
        };
        assert_eq!(policy.delay_for(1), Duration::from_millis(100));
        assert_eq!(policy.delay_for(2), Duration::from_millis(200));
        assert_eq!(policy.delay_for(4), Duration::from_millis(800));
        assert_eq!(policy.delay_for(5), Duration::from_millis(1_000));
        assert_eq!(policy.delay_for(80), Duration::from_millis(1_000));
    }

    #[tokio::test(start_paused = true)]
    async fn retries_transient_failures() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let policy = RetryPolicy::default().with_max_attempts(3);

        let result = policy
            .run(move || async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(unavailable())
                } else {
                    Ok(7)
                }
            })
            .await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_after_max_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = RetryPolicy::default()
            .with_max_attempts(2)
            .run(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(unavailable())
            })
            .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn validation_errors_are_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let result: Result<(), _> = RetryPolicy::default()
            .run(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(KdsError::from(ValidationError::EmptyItems))
            })
            .await;

        assert!(matches!(result, Err(KdsError::Validation(_))));
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
