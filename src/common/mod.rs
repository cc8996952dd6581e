//! Helpers shared across layers.

pub mod math;
pub mod retry;

pub use retry::{BackoffStrategy, RetryError, RetryPolicy};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Lock a mutex, recovering the data if a previous holder panicked.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
