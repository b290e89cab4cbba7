use crate::{Coordinator, DrainOutcome, LifecycleState};

use tokio::sync::watch;

/// Helper for async tasks that react to the coordinator's lifecycle
pub struct LifecycleGuard {
    // Keeps the lifecycle sender alive so waits never observe a closed channel
    _coordinator: Coordinator,
    lifecycle_rx: watch::Receiver<LifecycleState>,
}

impl LifecycleGuard {
    pub fn new(coordinator: &Coordinator) -> Self {
        Self {
            _coordinator: coordinator.clone(),
            lifecycle_rx: coordinator.subscribe(),
        }
    }

    /// Wait for the drain to begin
    pub async fn begun(&mut self) {
        let _ = self.lifecycle_rx.wait_for(|state| state.has_begun()).await;
    }

    /// Wait for the coordinator to die
    pub async fn dead(&mut self) -> DrainOutcome {
        let outcome = self
            .lifecycle_rx
            .wait_for(|state| state.is_dead())
            .await
            .ok()
            .and_then(|state| state.outcome());

        match outcome {
            Some(outcome) => outcome,
            None => std::future::pending().await,
        }
    }

    /// Check whether the drain has begun (non-blocking)
    pub fn poll_begun(&self) -> bool {
        self.lifecycle_rx.borrow().has_begun()
    }

    pub fn current(&self) -> LifecycleState {
        *self.lifecycle_rx.borrow()
    }
}
