use crate::DrainOutcome;

use std::time::Duration;

use metrics::{counter, gauge, histogram};

/// Metrics collector for drain coordination
#[derive(Clone, Debug)]
pub struct DrainMetrics {
    prefix: &'static str,
}

impl DrainMetrics {
    pub fn new() -> Self {
        Self { prefix: "rq_drain" }
    }

    /// Record a socket joining the registry
    pub fn socket_tracked(&self) {
        counter!(format!("{}.sockets.tracked", self.prefix)).increment(1);
        gauge!(format!("{}.sockets.active", self.prefix)).increment(1.0);
    }

    /// Record a socket leaving the registry
    pub fn socket_released(&self) {
        gauge!(format!("{}.sockets.active", self.prefix)).decrement(1.0);
    }

    /// Record a tracker joining the registry
    pub fn tracker_created(&self) {
        counter!(format!("{}.trackers.created", self.prefix)).increment(1);
        gauge!(format!("{}.trackers.active", self.prefix)).increment(1.0);
    }

    /// Record a tracker finishing
    pub fn tracker_finished(&self) {
        counter!(format!("{}.trackers.finished", self.prefix)).increment(1);
        gauge!(format!("{}.trackers.active", self.prefix)).decrement(1.0);
    }

    pub fn drain_started(&self) {
        counter!(format!("{}.drain.started", self.prefix)).increment(1);
    }

    /// Record the end of a drain and how long it took
    pub fn drain_finished(&self, outcome: DrainOutcome, elapsed: Duration) {
        let kind = if outcome.is_clean() { "clean" } else { "forced" };
        counter!(format!("{}.drain.finished.{}", self.prefix, kind)).increment(1);
        histogram!(format!("{}.drain.duration_ms", self.prefix))
            .record(elapsed.as_millis() as f64);
    }
}

impl Default for DrainMetrics {
    fn default() -> Self {
        Self::new()
    }
}
