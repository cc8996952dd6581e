//! Bounded retry helper built on `backon`.
//!
//! Used by synchronizer attachment and by the HTTP market-data fetcher. A
//! policy always terminates: after `max_attempts` failed attempts the last
//! error is returned wrapped in [`RetryError`].

use backon::{ConstantBuilder, ExponentialBuilder, Retryable};
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BackoffStrategy {
    /// Same delay between every attempt.
    Fixed,
    /// Delay grows by `factor` after each attempt, capped at `max_delay`.
    Exponential { factor: f32, max_delay: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first one.
    pub max_attempts: usize,
    pub delay: Duration,
    pub strategy: BackoffStrategy,
}

impl RetryPolicy {
    pub fn fixed(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            strategy: BackoffStrategy::Fixed,
        }
    }

    pub fn exponential(max_attempts: usize, delay: Duration, factor: f32, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
            strategy: BackoffStrategy::Exponential { factor, max_delay },
        }
    }

    fn retries(&self) -> usize {
        self.max_attempts.saturating_sub(1)
    }

    /// Run `operation` until it succeeds, `retryable` rejects an error, or
    /// the attempt budget is spent.
    pub async fn run<T, E, F, Fut, W>(
        &self,
        label: &str,
        mut operation: F,
        retryable: W,
    ) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: fmt::Display,
        W: FnMut(&E) -> bool,
    {
        let attempts = AtomicUsize::new(0);
        let counted = || {
            attempts.fetch_add(1, Ordering::Relaxed);
            operation()
        };
        let notify = |err: &E, delay: Duration| {
            debug!(
                operation = label,
                error = %err,
                delay_ms = delay.as_millis() as u64,
                "{} failed, retrying in {:?}",
                label,
                delay
            );
        };

        let result = match self.strategy {
            BackoffStrategy::Fixed => {
                let backoff = ConstantBuilder::default()
                    .with_delay(self.delay)
                    .with_max_times(self.retries());
                counted
                    .retry(backoff)
                    .sleep(tokio::time::sleep)
                    .when(retryable)
                    .notify(notify)
                    .await
            }
            BackoffStrategy::Exponential { factor, max_delay } => {
                let backoff = ExponentialBuilder::default()
                    .with_min_delay(self.delay)
                    .with_factor(factor)
                    .with_max_delay(max_delay)
                    .with_max_times(self.retries());
                counted
                    .retry(backoff)
                    .sleep(tokio::time::sleep)
                    .when(retryable)
                    .notify(notify)
                    .await
            }
        };

        result.map_err(|last_error| RetryError {
            attempts: attempts.load(Ordering::Relaxed),
            last_error,
        })
    }
}

/// Terminal failure of a retried operation.
#[derive(Debug)]
pub struct RetryError<E> {
    pub attempts: usize,
    pub last_error: E,
}

impl<E> RetryError<E> {
    pub fn into_inner(self) -> E {
        self.last_error
    }
}

impl<E: fmt::Display> fmt::Display for RetryError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "gave up after {} attempt(s): {}",
            self.attempts, self.last_error
        )
    }
}

impl<E: fmt::Debug + fmt::Display> std::error::Error for RetryError<E> {}
