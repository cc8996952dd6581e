use crate::common::RetryPolicy;
use crate::surface::SurfaceError;
use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    Unattached,
    Attaching,
    Attached,
    /// Attach retries were exhausted. Charts keep working unsynchronized.
    Failed,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SyncState::Unattached => "unattached",
            SyncState::Attaching => "attaching",
            SyncState::Attached => "attached",
            SyncState::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncConfig {
    /// Quiet period after the last range change before the follower moves.
    pub debounce: Duration,
    /// Wait before the first attach attempt.
    pub attach_delay: Duration,
    pub attach_retry: RetryPolicy,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(150),
            attach_delay: Duration::from_millis(200),
            attach_retry: RetryPolicy::fixed(5, Duration::from_millis(300)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SyncError {
    #[error("could not subscribe to the driving surface after {attempts} attempt(s): {source}")]
    AttachExhausted { attempts: usize, source: SurfaceError },
    #[error("{0} surface is no longer alive")]
    MissingSurface(&'static str),
    #[error("synchronizer needs a running Tokio runtime")]
    NoRuntime,
}

/// Counters describing one synchronizer's activity since construction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncStats {
    /// Range changes received from the driving surface.
    pub events: u64,
    /// Range changes dropped because a sync was in progress.
    pub suppressed: u64,
    /// Ranges applied to the follower.
    pub syncs: u64,
    pub errors: u64,
    pub attach_attempts: u64,
}
