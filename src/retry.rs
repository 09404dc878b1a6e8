//! Fixed-delay retry for fallible async operations.
//!
//! Every error is treated as transient: the operation is re-run after a
//! constant delay until it succeeds or the attempt cap is reached. There is no
//! backoff and no jitter. The defaults (1000 attempts, 100 ms apart) let a
//! chunk query ride out a node outage of well over a minute.
//!
//! An optional per-attempt timeout can be configured; a timed-out attempt
//! counts as a failed one. It is disabled by default, in which case an attempt
//! that never resolves stalls the caller indefinitely.
//!
//! ```
//! use std::time::Duration;
//! use ens_event_indexer::retry::{retry, RetryPolicy};
//! use ens_event_indexer::error::IndexerError;
//!
//! # async fn example() -> ens_event_indexer::error::IndexerResult<()> {
//! let policy = RetryPolicy::new(3, Duration::from_millis(10));
//! let mut calls = 0;
//! let value = retry(&policy, || {
//!     calls += 1;
//!     let ok = calls > 1;
//!     async move {
//!         if ok { Ok(7) } else { Err(IndexerError::rpc("flaky", None)) }
//!     }
//! })
//! .await?;
//! assert_eq!(value, 7);
//! # Ok(())
//! # }
//! ```

use std::future::Future;
use std::time::Duration;

use tracing::{debug, error, warn};

use crate::error::{IndexerError, IndexerResult};

/// Default maximum number of attempts per query.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 1000;

/// Default delay between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Attempt cap, delay and optional per-attempt timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    delay: Duration,
    attempt_timeout: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY)
    }
}

impl RetryPolicy {
    /// Policy with no per-attempt timeout. A cap of zero is raised to one.
    #[must_use]
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            attempt_timeout: None,
        }
    }

    /// Fail each attempt that does not resolve within `timeout`.
    #[must_use]
    pub const fn with_attempt_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Maximum number of attempts.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay between attempts.
    #[must_use]
    pub const fn delay(&self) -> Duration {
        self.delay
    }

    /// Per-attempt timeout, if any.
    #[must_use]
    pub const fn attempt_timeout(&self) -> Option<Duration> {
        self.attempt_timeout
    }
}

/// Run `operation` until it succeeds or `policy.max_attempts()` is reached.
///
/// Sleeps `policy.delay()` after every failed attempt except the last, so an
/// operation that fails `k` times and then succeeds waits exactly `k` delays.
/// The sleep is a tokio timer and never blocks other tasks.
///
/// # Errors
///
/// Returns [`IndexerError::ExhaustedRetries`] wrapping the final attempt's
/// error once every attempt has failed.
pub async fn retry<T, F, Fut>(policy: &RetryPolicy, mut operation: F) -> IndexerResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = IndexerResult<T>>,
{
    let mut attempt = 0;

    loop {
        attempt += 1;

        let outcome = match policy.attempt_timeout {
            Some(limit) => tokio::time::timeout(limit, operation())
                .await
                .unwrap_or_else(|_| {
                    Err(IndexerError::rpc(
                        format!("attempt timed out after {}ms", limit.as_millis()),
                        None,
                    ))
                }),
            None => operation().await,
        };

        match outcome {
            Ok(value) => {
                if attempt > 1 {
                    debug!(attempt, "Operation succeeded after retrying");
                }
                return Ok(value);
            }
            Err(e) if attempt >= policy.max_attempts => {
                error!(attempts = attempt, error = %e, "Giving up after final attempt");
                return Err(IndexerError::exhausted_retries(attempt, e));
            }
            Err(e) => {
                warn!(
                    attempt,
                    max_attempts = policy.max_attempts,
                    error = %e,
                    "Failed call, retrying"
                );
                tokio::time::sleep(policy.delay).await;
            }
        }
    }
}
