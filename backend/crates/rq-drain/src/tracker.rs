use crate::EntryId;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;

type DoneCallback = Box<dyn FnOnce() + Send + 'static>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerState {
    Pending,
    Done,
}

/// One-shot completion signal for a single unit of in-flight work.
///
/// Cloning yields another handle to the same signal. The first call to
/// [`Tracker::done`] moves it to `Done` and runs every `on_done` callback;
/// later calls do nothing.
#[derive(Clone)]
pub struct Tracker {
    inner: Arc<TrackerInner>,
}

struct TrackerInner {
    id: EntryId,
    signal: watch::Sender<TrackerState>,
    /// Guards the Pending -> Done transition together with the callback list
    callbacks: Mutex<Vec<DoneCallback>>,
}

impl Tracker {
    pub(crate) fn new() -> Self {
        let (signal, _) = watch::channel(TrackerState::Pending);
        Self {
            inner: Arc::new(TrackerInner {
                id: EntryId::new(),
                signal,
                callbacks: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn id(&self) -> EntryId {
        self.inner.id
    }

    pub fn state(&self) -> TrackerState {
        *self.inner.signal.borrow()
    }

    pub fn is_done(&self) -> bool {
        self.state() == TrackerState::Done
    }

    /// Signal completion. Only the first call has any effect.
    pub fn done(&self) {
        let callbacks = {
            let mut callbacks = self.lock_callbacks();
            let transitioned = self.inner.signal.send_if_modified(|state| {
                if *state == TrackerState::Pending {
                    *state = TrackerState::Done;
                    true
                } else {
                    false
                }
            });

            if !transitioned {
                return;
            }

            std::mem::take(&mut *callbacks)
        };

        for callback in callbacks {
            callback();
        }
    }

    /// Run `callback` once when the tracker completes.
    ///
    /// If the tracker is already done the callback runs immediately on the
    /// calling thread.
    pub fn on_done<F>(&self, callback: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut callbacks = self.lock_callbacks();
        if self.is_done() {
            drop(callbacks);
            callback();
            return;
        }
        callbacks.push(Box::new(callback));
    }

    /// Resolve once the tracker is done.
    pub async fn wait(&self) {
        let mut receiver = self.inner.signal.subscribe();
        // The sender lives as long as this handle, so the wait cannot fail
        let _ = receiver
            .wait_for(|state| *state == TrackerState::Done)
            .await;
    }

    fn lock_callbacks(&self) -> MutexGuard<'_, Vec<DoneCallback>> {
        self.inner
            .callbacks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Tracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Tracker")
            .field("id", &self.inner.id)
            .field("state", &self.state())
            .finish()
    }
}

impl PartialEq for Tracker {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Tracker {}
