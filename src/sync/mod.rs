//! Time-window synchronization between two chart surfaces.

pub mod state;
pub mod synchronizer;
pub mod time_scale;

pub use state::{SyncConfig, SyncError, SyncState, SyncStats};
pub use synchronizer::TimeWindowSynchronizer;
pub use time_scale::{RangeCallback, RangeOrigin, RangeSubscription, TimeScale};
