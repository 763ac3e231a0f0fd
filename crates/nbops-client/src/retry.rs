//! Linear back-off for idempotent reads.

use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::error::RemoteResult;

/// How often and how patiently to retry a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay unit; retry `n` waits `base_delay * n`.
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries.
    #[must_use]
    pub const fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay: Duration::ZERO,
        }
    }

    /// Delay before the 1-based retry `attempt`.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }

    /// Run `operation` until it succeeds, fails with a final error, or the
    /// retry budget is spent. Only connectivity and 5xx errors are retried.
    ///
    /// # Errors
    ///
    /// Returns the last error produced by `operation`.
    pub async fn run<T, F, Fut>(&self, mut operation: F) -> RemoteResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RemoteResult<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.delay_for(attempt);
                    warn!(error = %err, attempt, delay_ms = delay.as_millis(), "retrying request");
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RemoteError;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            base_delay: Duration::ZERO,
        }
    }

    #[test]
    fn delay_grows_linearly() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(3), Duration::from_secs(3));
    }

    #[tokio::test]
    async fn retries_transient_until_success() {
        let calls = &AtomicU32::new(0);
        let result = fast(3)
            .run(move || async move {
                let call = calls.fetch_add(1, Ordering::SeqCst);
                if call < 2 {
                    Err(RemoteError::Transient {
                        status: 503,
                        message: "busy".into(),
                    })
                } else {
                    Ok(call)
                }
            })
            .await;
        assert_eq!(result, Ok(2));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn client_errors_are_final() {
        let calls = &AtomicU32::new(0);
        let result: RemoteResult<()> = fast(3)
            .run(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(RemoteError::Validation {
                    status: 400,
                    message: "bad".into(),
                })
            })
            .await;
        assert!(matches!(result, Err(RemoteError::Validation { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn gives_up_after_budget() {
        let calls = &AtomicU32::new(0);
        let result: RemoteResult<()> = fast(2)
            .run(move || async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(RemoteError::Connectivity {
                    message: "refused".into(),
                })
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
