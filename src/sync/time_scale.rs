use crate::models::VisibleRange;
use crate::surface::SurfaceError;
use std::fmt;
use std::sync::Arc;

/// Callback invoked with the new visible range of a time scale.
pub type RangeCallback = Arc<dyn Fn(VisibleRange) + Send + Sync>;

/// Who asked for a range change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeOrigin {
    /// Pan or zoom on the surface itself.
    User,
    /// Application code, e.g. auto-fit after new data.
    Program,
    /// Copied over from another surface by a synchronizer. Never re-emitted
    /// to range listeners.
    Sync,
}

/// Handle for a range-change listener. Dropping it unsubscribes.
pub struct RangeSubscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl RangeSubscription {
    pub fn new(cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            cancel: Some(Box::new(cancel)),
        }
    }

    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for RangeSubscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl fmt::Debug for RangeSubscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RangeSubscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

/// A horizontal time axis a synchronizer can observe and drive.
pub trait TimeScale: Send + Sync {
    fn label(&self) -> &str;

    fn current_range(&self) -> Result<Option<VisibleRange>, SurfaceError>;

    fn apply_range(&self, range: VisibleRange, origin: RangeOrigin) -> Result<(), SurfaceError>;

    /// Fails while the underlying surface is not ready.
    fn watch_range(&self, callback: RangeCallback) -> Result<RangeSubscription, SurfaceError>;

    /// Told when a synchronizer starts or stops driving this scale.
    fn set_sync_driven(&self, _driven: bool) {}
}
