//! Retry with exponential backoff and jitter for flaky I/O.

use rand::Rng;
use serde::Deserialize;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Errors that can tell whether another attempt might succeed
pub trait Retryable {
    fn is_transient(&self) -> bool;
}

/// How often and how patiently to retry an operation
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first
    pub tries: u32,

    /// Delay before the first retry in milliseconds
    pub delay_ms: u64,

    /// Multiplier applied to the delay after every retry
    pub backoff: f64,

    /// Maximum random offset added to or removed from each delay, in milliseconds
    pub jitter_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            tries: 5,
            delay_ms: 10,
            backoff: 2.0,
            jitter_ms: 10,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries
    pub fn none() -> Self {
        Self {
            tries: 1,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (1-based), without jitter
    pub fn base_delay(&self, retry: u32) -> Duration {
        let factor = self.backoff.powi(retry.saturating_sub(1) as i32);
        Duration::from_millis((self.delay_ms as f64 * factor).round() as u64)
    }

    fn delay_with_jitter(&self, retry: u32) -> Duration {
        let base = self.base_delay(retry);
        if self.jitter_ms == 0 {
            return base;
        }
        let jitter = self.jitter_ms as i64;
        let offset = rand::thread_rng().gen_range(-jitter..=jitter);
        let millis = (base.as_millis() as i64 + offset).max(0);
        Duration::from_millis(millis as u64)
    }
}

/// Run `op` until it succeeds, fails with a permanent error, or the policy's
/// attempts are used up. The last error is returned.
pub async fn retry<T, E, F, Fut>(policy: &RetryPolicy, operation: &str, mut op: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + Display,
{
    let tries = policy.tries.max(1);
    let mut attempt = 1;

    loop {
        match op().await {
            Ok(value) => {
                if attempt > 1 {
                    debug!(operation, attempt, "succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) if attempt < tries && err.is_transient() => {
                let delay = policy.delay_with_jitter(attempt);
                warn!(
                    operation,
                    attempt,
                    tries,
                    backoff_ms = delay.as_millis() as u64,
                    error = %err,
                    "retrying"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[derive(Debug)]
    struct TestError {
        transient: bool,
    }

    impl Display for TestError {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "transient={}", self.transient)
        }
    }

    impl Retryable for TestError {
        fn is_transient(&self) -> bool {
            self.transient
        }
    }

    fn fast_policy(tries: u32) -> RetryPolicy {
        RetryPolicy {
            tries,
            delay_ms: 1,
            backoff: 2.0,
            jitter_ms: 0,
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.tries, 5);
        assert_eq!(policy.base_delay(1), Duration::from_millis(10));
        assert_eq!(policy.base_delay(2), Duration::from_millis(20));
        assert_eq!(policy.base_delay(4), Duration::from_millis(80));
    }

    #[tokio::test]
    async fn test_retries_transient_errors_until_success() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result = retry(&fast_policy(5), "flaky", move || async move {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(TestError { transient: true })
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_tries() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<(), _> = retry(&fast_policy(4), "down", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(TestError { transient: true })
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_permanent_error_is_not_retried() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let result: Result<(), _> = retry(&fast_policy(5), "bad data", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(TestError { transient: false })
        })
        .await;

        assert!(!result.unwrap_err().transient);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_none_policy_runs_once() {
        let calls = AtomicU32::new(0);
        let counter = &calls;

        let _: Result<(), _> = retry(&RetryPolicy::none(), "once", move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(TestError { transient: true })
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
