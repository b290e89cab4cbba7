
use crate::{Host, Result as DrainResult, Socket};

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;

/// Let spawned tasks run on the current-thread test runtime
pub(crate) async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}

pub(crate) const WAIT: Duration = Duration::from_millis(500);

/// Socket double whose close can be held open until released
#[derive(Clone)]
pub(crate) struct MockSocket {
    inner: Arc<MockSocketInner>,
}

struct MockSocketInner {
    close_calls: AtomicUsize,
    closed: AtomicBool,
    gate: watch::Sender<bool>,
    events: Option<EventLog>,
    name: &'static str,
}

impl MockSocket {
    /// Closes as soon as asked
    pub(crate) fn instant() -> Self {
        Self::build("socket", true, None)
    }

    /// Close does not complete until `finish_close` is called
    pub(crate) fn gated() -> Self {
        Self::build("socket", false, None)
    }

    pub(crate) fn gated_with_log(name: &'static str, events: EventLog) -> Self {
        Self::build(name, false, Some(events))
    }

    fn build(name: &'static str, open_gate: bool, events: Option<EventLog>) -> Self {
        let (gate, _) = watch::channel(open_gate);
        Self {
            inner: Arc::new(MockSocketInner {
                close_calls: AtomicUsize::new(0),
                closed: AtomicBool::new(false),
                gate,
                events,
                name,
            }),
        }
    }

    pub(crate) fn finish_close(&self) {
        self.inner.gate.send_replace(true);
    }

    pub(crate) fn close_calls(&self) -> usize {
        self.inner.close_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Socket for MockSocket {
    async fn close(&self) {
        self.inner.close_calls.fetch_add(1, Ordering::SeqCst);
        let mut gate = self.inner.gate.subscribe();
        let _ = gate.wait_for(|open| *open).await;
        self.inner.closed.store(true, Ordering::SeqCst);
        if let Some(ref events) = self.inner.events {
            events.push(format!("{} closed", self.inner.name));
        }
    }
}

/// Ordered record of observed events
#[derive(Clone, Default)]
pub(crate) struct EventLog {
    events: Arc<Mutex<Vec<String>>>,
}

impl EventLog {
    pub(crate) fn push(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub(crate) fn snapshot(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }
}

/// Counts invocations of a callback
#[derive(Clone, Default)]
pub(crate) struct CallCounter {
    count: Arc<AtomicUsize>,
}

impl CallCounter {
    pub(crate) fn hit(&self) {
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    pub(crate) fn count(&self) -> usize {
        self.count.load(Ordering::SeqCst)
    }
}

/// Host double that records every interaction
pub(crate) struct MockHost {
    supervised: bool,
    shutdown: watch::Sender<bool>,
    disconnect_request: watch::Sender<bool>,
    pub(crate) shutdown_subscriptions: AtomicUsize,
    pub(crate) disconnect_subscriptions: AtomicUsize,
    pub(crate) worker_checks: AtomicUsize,
    pub(crate) disconnects: AtomicUsize,
    pub(crate) exits: Mutex<Vec<i32>>,
}

impl MockHost {
    pub(crate) fn standalone() -> Arc<Self> {
        Arc::new(Self::build(false))
    }

    pub(crate) fn supervised() -> Arc<Self> {
        Arc::new(Self::build(true))
    }

    fn build(supervised: bool) -> Self {
        let (shutdown, _) = watch::channel(false);
        let (disconnect_request, _) = watch::channel(false);
        Self {
            supervised,
            shutdown,
            disconnect_request,
            shutdown_subscriptions: AtomicUsize::new(0),
            disconnect_subscriptions: AtomicUsize::new(0),
            worker_checks: AtomicUsize::new(0),
            disconnects: AtomicUsize::new(0),
            exits: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn request_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub(crate) fn request_disconnect(&self) {
        self.disconnect_request.send_replace(true);
    }

    pub(crate) fn disconnect_count(&self) -> usize {
        self.disconnects.load(Ordering::SeqCst)
    }

    pub(crate) fn exit_codes(&self) -> Vec<i32> {
        self.exits.lock().unwrap().clone()
    }
}

#[async_trait]
impl Host for MockHost {
    async fn shutdown_requested(&self) -> DrainResult<()> {
        self.shutdown_subscriptions.fetch_add(1, Ordering::SeqCst);
        let mut rx = self.shutdown.subscribe();
        let _ = rx.wait_for(|requested| *requested).await;
        Ok(())
    }

    async fn disconnect_requested(&self) -> DrainResult<()> {
        self.disconnect_subscriptions.fetch_add(1, Ordering::SeqCst);
        let mut rx = self.disconnect_request.subscribe();
        let _ = rx.wait_for(|requested| *requested).await;
        Ok(())
    }

    fn is_supervised_worker(&self) -> bool {
        self.worker_checks.fetch_add(1, Ordering::SeqCst);
        self.supervised
    }

    fn disconnect(&self) {
        self.disconnects.fetch_add(1, Ordering::SeqCst);
    }

    fn exit(&self, code: i32) {
        self.exits.lock().unwrap().push(code);
    }
}
