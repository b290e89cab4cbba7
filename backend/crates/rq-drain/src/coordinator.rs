use crate::{
    DrainConfig, DrainMetrics, DrainOutcome, EntryId, LifecycleGuard, LifecycleState, Registry,
    Release, Socket, SocketRegistration, Tracker, TrackerGuard,
};

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::{Duration, Instant};

use futures::future::join_all;
use log::{debug, info, warn};
use tokio::runtime::Handle;
use tokio::sync::watch;

type BeginCallback = Box<dyn FnOnce() + Send + 'static>;
type DeadCallback = Box<dyn FnOnce(DrainOutcome) + Send + 'static>;

/// Graceful shutdown coordinator
///
/// Cheap to clone; every clone drives the same state machine. The host's
/// composition root decides how many coordinators exist.
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<CoordinatorInner>,
}

pub(crate) struct CoordinatorInner {
    shared: Mutex<Shared>,
    lifecycle: watch::Sender<LifecycleState>,
    config: DrainConfig,
    metrics: DrainMetrics,
}

struct Shared {
    state: LifecycleState,
    sockets: Registry<Arc<dyn Socket>>,
    trackers: Registry<Tracker>,
    begin_listeners: Vec<BeginCallback>,
    dead_listeners: Vec<DeadCallback>,
}

impl Coordinator {
    /// Create a coordinator that waits as long as it takes to drain
    pub fn new() -> Self {
        Self::with_config(DrainConfig::default())
    }

    pub fn with_config(config: DrainConfig) -> Self {
        let (lifecycle, _) = watch::channel(LifecycleState::Ready);
        Self {
            inner: Arc::new(CoordinatorInner {
                shared: Mutex::new(Shared {
                    state: LifecycleState::Ready,
                    sockets: Registry::new(),
                    trackers: Registry::new(),
                    begin_listeners: Vec::new(),
                    dead_listeners: Vec::new(),
                }),
                lifecycle,
                config,
                metrics: DrainMetrics::new(),
            }),
        }
    }

    pub(crate) fn from_inner(inner: Arc<CoordinatorInner>) -> Self {
        Self { inner }
    }

    pub fn config(&self) -> DrainConfig {
        self.inner.config
    }

    pub fn state(&self) -> LifecycleState {
        self.lock().state
    }

    /// Outcome of the drain, once dead
    pub fn outcome(&self) -> Option<DrainOutcome> {
        self.state().outcome()
    }

    pub fn socket_count(&self) -> usize {
        self.lock().sockets.len()
    }

    pub fn tracker_count(&self) -> usize {
        self.lock().trackers.len()
    }

    // =========================================================================
    // Registration
    // =========================================================================

    /// Register a socket to be closed by the drain.
    ///
    /// Allowed in any state. A socket registered after the close phase took
    /// its snapshot is not closed by that drain.
    pub fn track_socket<S>(&self, socket: S) -> SocketRegistration
    where
        S: Socket,
    {
        let (id, state) = {
            let mut shared = self.lock();
            let id = shared.sockets.add(Arc::new(socket));
            (id, shared.state)
        };

        self.inner.metrics.socket_tracked();
        debug!("Tracking socket {id} (state: {state})");

        SocketRegistration::new(id, Arc::downgrade(&self.inner))
    }

    /// Create and register a tracker. The caller must eventually call
    /// [`Tracker::done`] on it.
    pub fn create_tracker(&self) -> Tracker {
        let tracker = Tracker::new();
        let id = tracker.id();

        self.lock().trackers.insert(id, tracker.clone());
        self.inner.metrics.tracker_created();

        // Registered after the insert so a tracker finished in between is
        // still removed (on_done runs immediately for done trackers)
        let coordinator = Arc::downgrade(&self.inner);
        tracker.on_done(move || Self::remove_tracker(&coordinator, id));

        tracker
    }

    /// Run `work` with a release handle that finishes a fresh tracker.
    ///
    /// `work` runs synchronously; it typically hands the release handle to an
    /// asynchronous operation that releases it on completion.
    pub fn track<F>(&self, work: F) -> Tracker
    where
        F: FnOnce(Release),
    {
        let tracker = self.create_tracker();
        work(Release::new(tracker.clone()));
        tracker
    }

    /// Tracker that finishes when the returned guard drops
    pub fn tracker_guard(&self) -> TrackerGuard {
        TrackerGuard::new(self.create_tracker())
    }

    /// Track an asynchronous operation until it completes or is dropped.
    ///
    /// The tracker is registered when this is called, not when the returned
    /// future is first polled.
    pub fn track_future<F>(&self, future: F) -> impl Future<Output = F::Output> + Send + 'static
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        let guard = self.tracker_guard();
        async move {
            let output = future.await;
            drop(guard);
            output
        }
    }

    pub(crate) fn remove_socket(&self, id: EntryId) {
        if self.lock().sockets.remove(id).is_some() {
            self.inner.metrics.socket_released();
            debug!("Socket {id} deregistered");
        }
    }

    fn remove_tracker(coordinator: &Weak<CoordinatorInner>, id: EntryId) {
        let Some(inner) = coordinator.upgrade() else {
            return;
        };
        let removed = Self::lock_inner(&inner).trackers.remove(id).is_some();
        if removed {
            inner.metrics.tracker_finished();
        }
    }

    // =========================================================================
    // Lifecycle notifications
    // =========================================================================

    /// Run `callback` once when the drain begins (immediately if it already has)
    pub fn on_begin<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut shared = self.lock();
        if shared.state.has_begun() {
            drop(shared);
            callback();
            return;
        }
        shared.begin_listeners.push(Box::new(callback));
    }

    /// Run `callback` once when the coordinator is dead (immediately if it
    /// already is). Does not start a drain.
    pub fn on_dead<F>(&self, callback: F)
    where
        F: FnOnce(DrainOutcome) + Send + 'static,
    {
        let mut shared = self.lock();
        if let LifecycleState::Dead(outcome) = shared.state {
            drop(shared);
            callback(outcome);
            return;
        }
        shared.dead_listeners.push(Box::new(callback));
    }

    /// Receiver for lifecycle transitions
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.inner.lifecycle.subscribe()
    }

    /// Convenience method to create a guard (used in connection tasks)
    pub fn subscribe_guard(&self) -> LifecycleGuard {
        LifecycleGuard::new(self)
    }

    /// Resolve once the drain has begun
    pub async fn wait_begin(&self) {
        self.subscribe_guard().begun().await;
    }

    /// Resolve with the outcome once the coordinator is dead
    pub async fn wait_dead(&self) -> DrainOutcome {
        self.subscribe_guard().dead().await
    }

    // =========================================================================
    // Drain
    // =========================================================================

    /// Start draining. Idempotent: only the first call runs the drain.
    ///
    /// The drain runs on the current Tokio runtime. Outside a runtime the
    /// call is logged and ignored, leaving the coordinator `Ready`.
    pub fn begin(&self) {
        self.begin_inner(None);
    }

    /// Start draining (if not already started) and run `on_dead` exactly once
    /// when the coordinator is dead. Runs `on_dead` immediately when already
    /// dead, without draining again.
    pub fn begin_with<F>(&self, on_dead: F)
    where
        F: FnOnce(DrainOutcome) + Send + 'static,
    {
        self.begin_inner(Some(Box::new(on_dead)));
    }

    /// Start draining and wait for the coordinator to die
    pub async fn shutdown(&self) -> DrainOutcome {
        self.begin();
        self.wait_dead().await
    }

    fn begin_inner(&self, on_dead: Option<DeadCallback>) {
        let mut shared = self.lock();

        if let LifecycleState::Dead(outcome) = shared.state {
            drop(shared);
            if let Some(on_dead) = on_dead {
                on_dead(outcome);
            }
            return;
        }

        if let Some(on_dead) = on_dead {
            shared.dead_listeners.push(on_dead);
        }

        if !shared.state.is_ready() {
            debug!("Drain already in progress, waiting for it to finish");
            return;
        }

        // Nothing changes without a runtime to drive the drain
        let Ok(runtime) = Handle::try_current() else {
            warn!("Drain requested outside a Tokio runtime, staying ready");
            return;
        };

        shared.state = LifecycleState::Preparing;
        let begin_listeners = std::mem::take(&mut shared.begin_listeners);
        let sockets = shared.sockets.len();
        let trackers = shared.trackers.len();
        drop(shared);

        info!("Drain started: {sockets} sockets to close, {trackers} operations in flight");
        self.inner.metrics.drain_started();
        self.inner.lifecycle.send_replace(LifecycleState::Preparing);

        for listener in begin_listeners {
            listener();
        }

        let coordinator = self.clone();
        runtime.spawn(async move {
            coordinator.drain().await;
        });
    }

    async fn drain(self) {
        let started = Instant::now();

        let sockets_remaining = self.close_all_sockets().await;
        let trackers_remaining = self.wait_all_trackers().await;

        let outcome = DrainOutcome::from_remaining(sockets_remaining, trackers_remaining);
        self.finish(outcome, started.elapsed());
    }

    /// Phase 1: close every socket registered when the phase starts.
    /// Returns how many did not finish closing.
    async fn close_all_sockets(&self) -> usize {
        let sockets = self.lock().sockets.snapshot();
        if sockets.is_empty() {
            return 0;
        }

        let total = sockets.len();
        let ids: Vec<EntryId> = sockets.iter().map(|(id, _)| *id).collect();
        info!("Closing {total} sockets");

        let closing = sockets.into_iter().map(|(id, socket)| {
            let coordinator = self.clone();
            async move {
                socket.close().await;
                coordinator.remove_socket(id);
            }
        });

        let finished = Self::within(join_all(closing), self.inner.config.socket_close_timeout).await;
        if finished {
            info!("All {total} sockets closed");
            return 0;
        }

        // A socket deregistered by its owner during the phase counts as closed
        let remaining = {
            let shared = self.lock();
            ids.iter().filter(|id| shared.sockets.contains(**id)).count()
        };
        warn!("Socket close timed out: {remaining} of {total} sockets still open");
        remaining
    }

    /// Phase 2: wait for every tracker registered when the phase starts.
    /// Returns how many were still pending.
    async fn wait_all_trackers(&self) -> usize {
        let trackers = self.lock().trackers.snapshot();
        if trackers.is_empty() {
            return 0;
        }

        let total = trackers.len();
        info!("Waiting for {total} in-flight operations");

        let waiting = trackers.iter().map(|(_, tracker)| tracker.wait());
        let finished = Self::within(join_all(waiting), self.inner.config.tracker_wait_timeout).await;

        if finished {
            info!("All {total} in-flight operations finished");
            return 0;
        }

        let remaining = trackers
            .iter()
            .filter(|(_, tracker)| !tracker.is_done())
            .count();
        warn!("Tracker wait timed out: {remaining} of {total} operations still pending");
        remaining
    }

    /// Drive `future` to completion, giving up after `limit` if set.
    /// Returns whether it completed.
    async fn within<F: Future>(future: F, limit: Option<Duration>) -> bool {
        match limit {
            Some(limit) => tokio::time::timeout(limit, future).await.is_ok(),
            None => {
                future.await;
                true
            }
        }
    }

    fn finish(&self, outcome: DrainOutcome, elapsed: Duration) {
        let dead_listeners = {
            let mut shared = self.lock();
            shared.state = LifecycleState::Dead(outcome);
            std::mem::take(&mut shared.dead_listeners)
        };

        self.inner.lifecycle.send_replace(LifecycleState::Dead(outcome));
        self.inner.metrics.drain_finished(outcome, elapsed);

        if outcome.is_clean() {
            info!("Drain complete in {}ms", elapsed.as_millis());
        } else {
            warn!("Drain forced after {}ms: {outcome}", elapsed.as_millis());
        }

        for listener in dead_listeners {
            listener(outcome);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        Self::lock_inner(&self.inner)
    }

    fn lock_inner(inner: &CoordinatorInner) -> MutexGuard<'_, Shared> {
        inner.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shared = self.lock();
        f.debug_struct("Coordinator")
            .field("state", &shared.state)
            .field("sockets", &shared.sockets.len())
            .field("trackers", &shared.trackers.len())
            .finish()
    }
}
