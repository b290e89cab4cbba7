use crate::Tracker;

/// Tracker that signals completion when dropped.
///
/// Keeps in-flight accounting correct when the tracked work returns early,
/// errors out or is cancelled.
#[derive(Debug)]
#[must_use = "the tracked work is considered finished as soon as the guard is dropped"]
pub struct TrackerGuard {
    tracker: Tracker,
}

impl TrackerGuard {
    pub(crate) fn new(tracker: Tracker) -> Self {
        Self { tracker }
    }

    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    /// Finish the tracked work now
    pub fn finish(self) {
        drop(self);
    }
}

impl Drop for TrackerGuard {
    fn drop(&mut self) {
        self.tracker.done();
    }
}
