//! Retry policy with exponential backoff and cancellation.
//!
//! The policy is pure delay math; [`RetryPolicy::run`] is the executor that
//! re-drives a fallible async operation. Retriability is decided by
//! [`Error::is_retriable`], so venue code categorization and transport
//! classification stay in one place.
//!
//! No jitter is applied between attempts; the venue's weight windows are
//! coarse enough that synchronized retries are not a concern at client
//! scale. Bounded jitter would be a reasonable refinement.

use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{ConfigError, Error, Result};

/// Retry policy for transient failures.
///
/// Backoff for attempt `n` (0-indexed) is
/// `min(max_backoff, initial_backoff * backoff_factor^n)`, applied between
/// attempts, never before the first.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use sirocco_core::retry::RetryPolicy;
///
/// let policy = RetryPolicy::new(
///     3,
///     Duration::from_millis(100),
///     Duration::from_secs(1),
///     2.0,
/// ).unwrap();
///
/// assert_eq!(policy.delay_for(0), Duration::from_millis(100));
/// assert_eq!(policy.delay_for(1), Duration::from_millis(200));
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_retries: u32,
    initial_backoff: Duration,
    max_backoff: Duration,
    backoff_factor: f64,
}

impl RetryPolicy {
    /// Creates a new retry policy.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` when `initial_backoff` is zero,
    /// `max_backoff < initial_backoff`, or `backoff_factor <= 1.0`.
    pub fn new(
        max_retries: u32,
        initial_backoff: Duration,
        max_backoff: Duration,
        backoff_factor: f64,
    ) -> std::result::Result<Self, ConfigError> {
        if initial_backoff.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "initial_backoff".to_string(),
                reason: "must be greater than 0".to_string(),
            });
        }
        if max_backoff < initial_backoff {
            return Err(ConfigError::InvalidValue {
                field: "max_backoff".to_string(),
                reason: "must be at least initial_backoff".to_string(),
            });
        }
        if backoff_factor <= 1.0 {
            return Err(ConfigError::InvalidValue {
                field: "backoff_factor".to_string(),
                reason: "must be greater than 1.0".to_string(),
            });
        }
        Ok(Self {
            max_retries,
            initial_backoff,
            max_backoff,
            backoff_factor,
        })
    }

    /// Returns the maximum retry attempts after the first failure.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Calculates the backoff delay after the given attempt (0-indexed).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let backoff =
            self.initial_backoff.as_millis() as f64 * self.backoff_factor.powi(attempt as i32);
        let capped = backoff.min(self.max_backoff.as_millis() as f64);
        Duration::from_millis(capped as u64)
    }

    /// Executes `op`, retrying transient failures with backoff.
    ///
    /// The operation is re-invoked from scratch on every attempt, so any
    /// per-attempt state (admission tokens, signatures, timestamps) is
    /// freshly produced. Non-retriable errors return after a single
    /// invocation. Cancellation is honored before each attempt and during
    /// every backoff sleep; it always surfaces as [`Error::Cancelled`].
    ///
    /// # Errors
    ///
    /// Returns the operation's error when it is not retriable,
    /// [`Error::Cancelled`] on cancellation, or
    /// [`Error::RetriesExhausted`] wrapping the last error when the retry
    /// budget runs out.
    pub async fn run<T, F, Fut>(&self, cancel: &CancellationToken, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut attempt = 0u32;
        loop {
            if cancel.is_cancelled() {
                debug!("cancelled before attempt, stopping retries");
                return Err(Error::Cancelled);
            }

            let err = match op().await {
                Ok(value) => {
                    if attempt > 0 {
                        info!(retries = attempt, "request succeeded after retries");
                    }
                    return Ok(value);
                }
                Err(Error::Cancelled) => return Err(Error::Cancelled),
                Err(err) => err,
            };

            if !err.is_retriable() {
                debug!(error = %err, "error is not retriable");
                return Err(err);
            }

            if attempt >= self.max_retries {
                warn!(max_retries = self.max_retries, error = %err, "retry budget exhausted");
                return Err(Error::RetriesExhausted {
                    attempts: attempt + 1,
                    source: Box::new(err),
                });
            }

            let delay = self.delay_for(attempt);
            info!(
                attempt = attempt + 1,
                max_attempts = self.max_retries + 1,
                delay_ms = delay.as_millis() as u64,
                error = %err,
                "request failed, backing off"
            );

            tokio::select! {
                () = cancel.cancelled() => {
                    debug!("cancelled during backoff");
                    return Err(Error::Cancelled);
                }
                () = tokio::time::sleep(delay) => {}
            }

            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use super::*;
    use crate::error::{ApiError, NetworkError};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::new(
            max_retries,
            Duration::from_millis(10),
            Duration::from_millis(40),
            2.0,
        )
        .unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_parameters() {
        assert!(RetryPolicy::new(3, Duration::ZERO, Duration::from_secs(1), 2.0).is_err());
        assert!(
            RetryPolicy::new(3, Duration::from_secs(2), Duration::from_secs(1), 2.0).is_err()
        );
        assert!(
            RetryPolicy::new(3, Duration::from_secs(1), Duration::from_secs(2), 1.0).is_err()
        );
    }

    #[test]
    fn test_delay_sequence_and_cap() {
        let policy = RetryPolicy::new(
            5,
            Duration::from_millis(100),
            Duration::from_secs(1),
            2.0,
        )
        .unwrap();

        assert_eq!(policy.delay_for(0), Duration::from_millis(100));
        assert_eq!(policy.delay_for(1), Duration::from_millis(200));
        assert_eq!(policy.delay_for(2), Duration::from_millis(400));
        assert_eq!(policy.delay_for(3), Duration::from_millis(800));
        // Capped at max_backoff.
        assert_eq!(policy.delay_for(4), Duration::from_secs(1));
        assert_eq!(policy.delay_for(10), Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_retries_then_succeeds() {
        let policy = fast_policy(3);
        let cancel = CancellationToken::new();
        let calls = Arc::new(AtomicU32::new(0));

        let calls_ref = Arc::clone(&calls);
        let result: Result<&str> = policy
            .run(&cancel, move || {
                let calls = Arc::clone(&calls_ref);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(ApiError::from_code("429", "too many", Some(429), None).into())
                    } else {
                        Ok("done")
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retriable_invoked_exactly_once() {
        let policy = fast_policy(3);
        let cancel = CancellationToken::new();
        let calls = Arc::new(AtomicU32::new(0));

        let calls_ref = Arc::clone(&calls);
        let result: Result<()> = policy
            .run(&cancel, move || {
                let calls = Arc::clone(&calls_ref);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(ApiError::from_code("40007", "bad sig", Some(400), None).into())
                }
            })
            .await;

        let err = result.unwrap_err();
        assert_eq!(err.as_api().map(|e| e.code.as_str()), Some("40007"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_exhaustion_wraps_last_error() {
        let policy = fast_policy(2);
        let cancel = CancellationToken::new();
        let calls = Arc::new(AtomicU32::new(0));

        let calls_ref = Arc::clone(&calls);
        let result: Result<()> = policy
            .run(&cancel, move || {
                let calls = Arc::clone(&calls_ref);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(NetworkError::Timeout { timeout_ms: 10 }.into())
                }
            })
            .await;

        match result.unwrap_err() {
            Error::RetriesExhausted { attempts, source } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*source, Error::Network(_)));
            }
            other => panic!("expected RetriesExhausted, got {other}"),
        }
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_cancellation_cuts_backoff_short() {
        let policy = RetryPolicy::new(
            3,
            Duration::from_secs(10),
            Duration::from_secs(30),
            2.0,
        )
        .unwrap();
        let cancel = CancellationToken::new();

        let cancel_clone = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel_clone.cancel();
        });

        let start = std::time::Instant::now();
        let result: Result<()> = policy
            .run(&cancel, || async {
                Err(NetworkError::Timeout { timeout_ms: 10 }.into())
            })
            .await;

        assert!(matches!(result, Err(Error::Cancelled)));
        // Cancelled during the first 10s backoff, long before it elapsed.
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_pre_cancelled_never_invokes_closure() {
        let policy = fast_policy(3);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let calls = Arc::new(AtomicU32::new(0));
        let calls_ref = Arc::clone(&calls);
        let result: Result<()> = policy
            .run(&cancel, move || {
                let calls = Arc::clone(&calls_ref);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(())
                }
            })
            .await;

        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancelled_result_propagates_without_retry() {
        let policy = fast_policy(3);
        let cancel = CancellationToken::new();
        let calls = Arc::new(AtomicU32::new(0));

        let calls_ref = Arc::clone(&calls);
        let result: Result<()> = policy
            .run(&cancel, move || {
                let calls = Arc::clone(&calls_ref);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(Error::Cancelled)
                }
            })
            .await;

        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
