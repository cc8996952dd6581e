//! Keeps a follower time scale showing the same window as a driving one.

use super::state::{SyncConfig, SyncError, SyncState, SyncStats};
use super::time_scale::{RangeCallback, RangeOrigin, RangeSubscription, TimeScale};
use crate::common::lock;
use crate::models::VisibleRange;
use crate::surface::SurfaceError;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};

#[derive(Default)]
struct SyncCounters {
    events: AtomicU64,
    suppressed: AtomicU64,
    syncs: AtomicU64,
    errors: AtomicU64,
    attach_attempts: AtomicU64,
}

impl SyncCounters {
    fn snapshot(&self) -> SyncStats {
        SyncStats {
            events: self.events.load(Ordering::Relaxed),
            suppressed: self.suppressed.load(Ordering::Relaxed),
            syncs: self.syncs.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
            attach_attempts: self.attach_attempts.load(Ordering::Relaxed),
        }
    }
}

/// State shared between the synchronizer and its running session task.
struct SessionShared {
    active: AtomicBool,
    /// Set while a range is being pushed to the follower.
    syncing: AtomicBool,
    /// Holds the driving-surface subscription; `active` only flips under it.
    gate: Mutex<Option<RangeSubscription>>,
    follower: Weak<dyn TimeScale>,
}

struct Session {
    shared: Arc<SessionShared>,
    task: JoinHandle<()>,
}

/// State machine copying the driving surface's visible range to a follower.
///
/// ```text
/// Unattached -> Attaching -> Attached
///                         \-> Failed
/// any --teardown--> Unattached
/// ```
///
/// Only weak references to the two time scales are held; either side may be
/// dropped at any time.
pub struct TimeWindowSynchronizer {
    config: SyncConfig,
    state_tx: Arc<watch::Sender<SyncState>>,
    counters: Arc<SyncCounters>,
    session: Mutex<Option<Session>>,
    last_failure: Arc<Mutex<Option<SyncError>>>,
}

impl TimeWindowSynchronizer {
    pub fn new(config: SyncConfig) -> Self {
        let (state_tx, _) = watch::channel(SyncState::Unattached);
        Self {
            config,
            state_tx: Arc::new(state_tx),
            counters: Arc::new(SyncCounters::default()),
            session: Mutex::new(None),
            last_failure: Arc::new(Mutex::new(None)),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn state(&self) -> SyncState {
        *self.state_tx.borrow()
    }

    /// Receiver observing every state transition.
    pub fn subscribe_state(&self) -> watch::Receiver<SyncState> {
        self.state_tx.subscribe()
    }

    pub fn stats(&self) -> SyncStats {
        self.counters.snapshot()
    }

    /// Why the most recent session ended up [`SyncState::Failed`].
    pub fn last_failure(&self) -> Option<SyncError> {
        lock(&self.last_failure).clone()
    }

    /// Start synchronizing `follower` to `driving`. Any previous session is
    /// torn down first. Must be called from within a Tokio runtime.
    pub fn attach(
        &self,
        driving: Weak<dyn TimeScale>,
        follower: Weak<dyn TimeScale>,
    ) -> Result<(), SyncError> {
        self.teardown();

        let Some(driving_scale) = driving.upgrade() else {
            return Err(SyncError::MissingSurface("driving"));
        };
        let Some(follower_scale) = follower.upgrade() else {
            return Err(SyncError::MissingSurface("follower"));
        };
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| SyncError::NoRuntime)?;

        info!(
            driving = driving_scale.label(),
            follower = follower_scale.label(),
            "TimeWindowSynchronizer: attaching"
        );
        drop(driving_scale);
        drop(follower_scale);

        *lock(&self.last_failure) = None;
        self.state_tx.send_replace(SyncState::Attaching);

        let shared = Arc::new(SessionShared {
            active: AtomicBool::new(true),
            syncing: AtomicBool::new(false),
            gate: Mutex::new(None),
            follower: follower.clone(),
        });
        let task = runtime.spawn(run_session(SessionContext {
            config: self.config,
            driving,
            follower,
            shared: shared.clone(),
            state_tx: self.state_tx.clone(),
            counters: self.counters.clone(),
            last_failure: self.last_failure.clone(),
        }));

        *lock(&self.session) = Some(Session { shared, task });
        Ok(())
    }

    /// Stop synchronizing. Unsubscribes from the driving surface and cancels
    /// pending attach retries and debounce timers before returning.
    pub fn teardown(&self) {
        let Some(session) = lock(&self.session).take() else {
            return;
        };

        let subscription = {
            let mut gate = lock(&session.shared.gate);
            session.shared.active.store(false, Ordering::SeqCst);
            gate.take()
        };
        drop(subscription);
        session.task.abort();

        if let Some(follower) = session.shared.follower.upgrade() {
            follower.set_sync_driven(false);
        }
        self.state_tx.send_replace(SyncState::Unattached);
        info!("TimeWindowSynchronizer: torn down");
    }
}

impl Default for TimeWindowSynchronizer {
    fn default() -> Self {
        Self::new(SyncConfig::default())
    }
}

impl Drop for TimeWindowSynchronizer {
    fn drop(&mut self) {
        self.teardown();
    }
}

struct SessionContext {
    config: SyncConfig,
    driving: Weak<dyn TimeScale>,
    follower: Weak<dyn TimeScale>,
    shared: Arc<SessionShared>,
    state_tx: Arc<watch::Sender<SyncState>>,
    counters: Arc<SyncCounters>,
    last_failure: Arc<Mutex<Option<SyncError>>>,
}

async fn run_session(ctx: SessionContext) {
    tokio::time::sleep(ctx.config.attach_delay).await;

    let (tx, mut rx) = mpsc::unbounded_channel::<VisibleRange>();
    let callback: RangeCallback = {
        let shared = ctx.shared.clone();
        let counters = ctx.counters.clone();
        Arc::new(move |range| {
            if !shared.active.load(Ordering::SeqCst) {
                return;
            }
            if shared.syncing.load(Ordering::SeqCst) {
                counters.suppressed.fetch_add(1, Ordering::Relaxed);
                return;
            }
            counters.events.fetch_add(1, Ordering::Relaxed);
            let _ = tx.send(range);
        })
    };

    let attempt = || {
        let driving = ctx.driving.clone();
        let callback = callback.clone();
        let counters = ctx.counters.clone();
        async move {
            counters.attach_attempts.fetch_add(1, Ordering::Relaxed);
            let driving = driving.upgrade().ok_or(SurfaceError::Gone)?;
            driving.watch_range(callback)
        }
    };
    let subscribed = ctx
        .config
        .attach_retry
        .run(
            "time-window sync attach",
            attempt,
            |err: &SurfaceError| *err != SurfaceError::Gone,
        )
        .await;

    let subscription = match subscribed {
        Ok(subscription) => subscription,
        Err(err) => {
            let failure = SyncError::AttachExhausted {
                attempts: err.attempts,
                source: err.last_error,
            };
            warn!(error = %failure, "TimeWindowSynchronizer: giving up, charts stay unsynchronized");
            *lock(&ctx.last_failure) = Some(failure);
            ctx.state_tx.send_replace(SyncState::Failed);
            return;
        }
    };

    {
        let mut gate = lock(&ctx.shared.gate);
        if !ctx.shared.active.load(Ordering::SeqCst) {
            drop(gate);
            drop(subscription);
            return;
        }
        *gate = Some(subscription);
        if let Some(follower) = ctx.follower.upgrade() {
            follower.set_sync_driven(true);
        }
        ctx.state_tx.send_replace(SyncState::Attached);
    }
    info!("TimeWindowSynchronizer: attached");

    sync_once(&ctx);

    while rx.recv().await.is_some() {
        let mut deadline = Instant::now() + ctx.config.debounce;
        loop {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => break,
                next = rx.recv() => match next {
                    Some(_) => deadline = Instant::now() + ctx.config.debounce,
                    None => return,
                },
            }
        }
        sync_once(&ctx);
    }
}

/// Copy the driving range, if any, onto the follower.
fn sync_once(ctx: &SessionContext) {
    if !ctx.shared.active.load(Ordering::SeqCst) {
        return;
    }
    let (Some(driving), Some(follower)) = (ctx.driving.upgrade(), ctx.follower.upgrade()) else {
        debug!("TimeWindowSynchronizer: surface dropped, skipping sync");
        return;
    };

    let range = match driving.current_range() {
        Ok(Some(range)) => range,
        Ok(None) => {
            debug!(driving = driving.label(), "TimeWindowSynchronizer: no visible range yet");
            return;
        }
        Err(err) => {
            ctx.counters.errors.fetch_add(1, Ordering::Relaxed);
            warn!(error = %err, "TimeWindowSynchronizer: could not read driving range");
            return;
        }
    };

    ctx.shared.syncing.store(true, Ordering::SeqCst);
    let applied = follower.apply_range(range, RangeOrigin::Sync);
    ctx.shared.syncing.store(false, Ordering::SeqCst);

    match applied {
        Ok(()) => {
            ctx.counters.syncs.fetch_add(1, Ordering::Relaxed);
            debug!(
                range = %range,
                follower = follower.label(),
                "TimeWindowSynchronizer: follower synced"
            );
        }
        Err(err) => {
            ctx.counters.errors.fetch_add(1, Ordering::Relaxed);
            warn!(error = %err, range = %range, "TimeWindowSynchronizer: sync failed");
        }
    }
}
