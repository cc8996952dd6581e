//! Unit tests for the time-window synchronizer
//!
//! Timers run on Tokio's paused clock, so debounce and retry delays elapse
//! instantly but in order.

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::time::{sleep, Instant};
use tokio_test::assert_ok;
use traderoad::models::VisibleRange;
use traderoad::surface::SurfaceError;
use traderoad::sync::{
    RangeCallback, RangeOrigin, RangeSubscription, SyncConfig, SyncError, SyncState, TimeScale,
    TimeWindowSynchronizer,
};

type Listeners = Arc<Mutex<Vec<(u64, RangeCallback)>>>;

#[derive(Default)]
struct MockScale {
    range: Mutex<Option<VisibleRange>>,
    listeners: Listeners,
    next_id: AtomicU64,
    failures_left: AtomicUsize,
    watch_calls: AtomicUsize,
    applied: Mutex<Vec<(VisibleRange, RangeOrigin)>>,
    driven: AtomicBool,
    fail_apply: AtomicBool,
    echo_to: Mutex<Option<Arc<MockScale>>>,
}

impl MockScale {
    fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    fn failing_watch(times: usize) -> Arc<Self> {
        let scale = Self::default();
        scale.failures_left.store(times, Ordering::SeqCst);
        Arc::new(scale)
    }

    /// Move the range and notify watchers, like a user pan would.
    fn emit(&self, range: VisibleRange) {
        *self.range.lock().unwrap() = Some(range);
        let callbacks: Vec<RangeCallback> =
            self.listeners.lock().unwrap().iter().map(|(_, cb)| cb.clone()).collect();
        for callback in callbacks {
            callback(range);
        }
    }

    fn applied(&self) -> Vec<(VisibleRange, RangeOrigin)> {
        self.applied.lock().unwrap().clone()
    }

    fn listener_count(&self) -> usize {
        self.listeners.lock().unwrap().len()
    }
}

impl TimeScale for MockScale {
    fn label(&self) -> &str {
        "mock"
    }

    fn current_range(&self) -> Result<Option<VisibleRange>, SurfaceError> {
        Ok(*self.range.lock().unwrap())
    }

    fn apply_range(&self, range: VisibleRange, origin: RangeOrigin) -> Result<(), SurfaceError> {
        if self.fail_apply.load(Ordering::SeqCst) {
            return Err(SurfaceError::Disposed);
        }
        self.applied.lock().unwrap().push((range, origin));
        *self.range.lock().unwrap() = Some(range);
        let echo = self.echo_to.lock().unwrap().clone();
        if let Some(driving) = echo {
            driving.emit(range);
        }
        Ok(())
    }

    fn watch_range(&self, callback: RangeCallback) -> Result<RangeSubscription, SurfaceError> {
        self.watch_calls.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures_left.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures_left.store(remaining - 1, Ordering::SeqCst);
            return Err(SurfaceError::NotInitialized);
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.listeners.lock().unwrap().push((id, callback));
        let listeners = self.listeners.clone();
        Ok(RangeSubscription::new(move || {
            listeners.lock().unwrap().retain(|(existing, _)| *existing != id);
        }))
    }

    fn set_sync_driven(&self, driven: bool) {
        self.driven.store(driven, Ordering::SeqCst);
    }
}

fn weak(scale: &Arc<MockScale>) -> Weak<dyn TimeScale> {
    let weak: Weak<MockScale> = Arc::downgrade(scale);
    weak
}

async fn wait_for_state(sync: &TimeWindowSynchronizer, wanted: SyncState) {
    let mut rx = sync.subscribe_state();
    rx.wait_for(|state| *state == wanted).await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_burst_of_changes_coalesces_into_one_sync() {
    let driving = MockScale::new();
    let follower = MockScale::new();
    let sync = TimeWindowSynchronizer::new(SyncConfig::default());

    assert_ok!(sync.attach(weak(&driving), weak(&follower)));
    wait_for_state(&sync, SyncState::Attached).await;

    for i in 1..=10 {
        driving.emit(VisibleRange::new(1000 + i * 50, 2000 + i * 50));
        sleep(Duration::from_millis(20)).await;
    }
    sleep(Duration::from_millis(300)).await;

    assert_eq!(
        follower.applied(),
        vec![(VisibleRange::new(1500, 2500), RangeOrigin::Sync)]
    );
    let stats = sync.stats();
    assert_eq!(stats.events, 10);
    assert_eq!(stats.syncs, 1);
}

#[tokio::test(start_paused = true)]
async fn test_initial_sync_copies_existing_range() {
    let driving = MockScale::new();
    let follower = MockScale::new();
    driving.emit(VisibleRange::new(10, 20));
    let sync = TimeWindowSynchronizer::default();

    sync.attach(weak(&driving), weak(&follower)).unwrap();
    wait_for_state(&sync, SyncState::Attached).await;
    sleep(Duration::from_millis(1)).await;

    assert_eq!(follower.applied(), vec![(VisibleRange::new(10, 20), RangeOrigin::Sync)]);
    assert!(follower.driven.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn test_attach_succeeds_on_fourth_attempt() {
    let driving = MockScale::failing_watch(3);
    let follower = MockScale::new();
    let sync = TimeWindowSynchronizer::default();
    let started = Instant::now();

    sync.attach(weak(&driving), weak(&follower)).unwrap();
    assert_eq!(sync.state(), SyncState::Attaching);
    wait_for_state(&sync, SyncState::Attached).await;

    assert_eq!(driving.watch_calls.load(Ordering::SeqCst), 4);
    assert_eq!(sync.stats().attach_attempts, 4);
    // Initial delay plus three retry waits.
    assert!(started.elapsed() >= Duration::from_millis(200 + 3 * 300));
    assert_eq!(driving.listener_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_attach_gives_up_after_max_attempts() {
    let driving = MockScale::failing_watch(100);
    let follower = MockScale::new();
    let sync = TimeWindowSynchronizer::default();

    sync.attach(weak(&driving), weak(&follower)).unwrap();
    wait_for_state(&sync, SyncState::Failed).await;

    assert_eq!(driving.watch_calls.load(Ordering::SeqCst), 5);
    assert_eq!(
        sync.last_failure(),
        Some(SyncError::AttachExhausted {
            attempts: 5,
            source: SurfaceError::NotInitialized
        })
    );
    assert!(!follower.driven.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn test_sync_applied_change_does_not_trigger_another_cycle() {
    let driving = MockScale::new();
    let follower = MockScale::new();
    // Applying to the follower moves the driver too, as a linked chart would.
    *follower.echo_to.lock().unwrap() = Some(driving.clone());
    let sync = TimeWindowSynchronizer::default();

    sync.attach(weak(&driving), weak(&follower)).unwrap();
    wait_for_state(&sync, SyncState::Attached).await;

    driving.emit(VisibleRange::new(100, 200));
    sleep(Duration::from_secs(2)).await;

    assert_eq!(follower.applied().len(), 1);
    let stats = sync.stats();
    assert_eq!(stats.events, 1);
    assert_eq!(stats.suppressed, 1);
    assert_eq!(stats.syncs, 1);
}

#[tokio::test(start_paused = true)]
async fn test_sync_errors_are_counted_and_session_continues() {
    let driving = MockScale::new();
    let follower = MockScale::new();
    follower.fail_apply.store(true, Ordering::SeqCst);
    let sync = TimeWindowSynchronizer::default();

    sync.attach(weak(&driving), weak(&follower)).unwrap();
    wait_for_state(&sync, SyncState::Attached).await;

    driving.emit(VisibleRange::new(0, 50));
    sleep(Duration::from_millis(200)).await;
    assert_eq!(sync.stats().errors, 1);

    follower.fail_apply.store(false, Ordering::SeqCst);
    driving.emit(VisibleRange::new(10, 60));
    sleep(Duration::from_millis(200)).await;

    assert_eq!(sync.state(), SyncState::Attached);
    assert_eq!(follower.applied(), vec![(VisibleRange::new(10, 60), RangeOrigin::Sync)]);
}

#[tokio::test(start_paused = true)]
async fn test_teardown_unsubscribes_and_cancels_pending_sync() {
    let driving = MockScale::new();
    let follower = MockScale::new();
    let sync = TimeWindowSynchronizer::default();

    sync.attach(weak(&driving), weak(&follower)).unwrap();
    wait_for_state(&sync, SyncState::Attached).await;
    assert_eq!(driving.listener_count(), 1);

    driving.emit(VisibleRange::new(5, 15));
    sync.teardown();
    sleep(Duration::from_secs(1)).await;

    assert!(follower.applied().is_empty());
    assert_eq!(driving.listener_count(), 0);
    assert_eq!(sync.state(), SyncState::Unattached);
    assert!(!follower.driven.load(Ordering::SeqCst));
}

#[tokio::test(start_paused = true)]
async fn test_teardown_during_attach_stops_retrying() {
    let driving = MockScale::failing_watch(100);
    let follower = MockScale::new();
    let sync = TimeWindowSynchronizer::default();

    sync.attach(weak(&driving), weak(&follower)).unwrap();
    sleep(Duration::from_millis(600)).await;
    sync.teardown();
    let calls = driving.watch_calls.load(Ordering::SeqCst);
    sleep(Duration::from_secs(5)).await;

    assert_eq!(driving.watch_calls.load(Ordering::SeqCst), calls);
    assert_eq!(sync.state(), SyncState::Unattached);
}

#[tokio::test]
async fn test_attach_requires_live_surfaces() {
    let follower = MockScale::new();
    let gone: Weak<dyn TimeScale> = {
        let driving = MockScale::new();
        weak(&driving)
    };
    let sync = TimeWindowSynchronizer::default();

    assert_eq!(
        sync.attach(gone, weak(&follower)),
        Err(SyncError::MissingSurface("driving"))
    );
    assert_eq!(sync.state(), SyncState::Unattached);
}
