use crate::Tracker;

/// Completion handle handed to the work passed to [`crate::Coordinator::track`].
///
/// Calling [`Release::release`] marks the work as finished. Releasing more
/// than once is harmless.
#[derive(Clone, Debug)]
pub struct Release {
    tracker: Tracker,
}

impl Release {
    pub(crate) fn new(tracker: Tracker) -> Self {
        Self { tracker }
    }

    pub fn release(&self) {
        self.tracker.done();
    }

    /// The release action as a plain closure.
    pub fn into_fn(self) -> impl Fn() + Send + Sync + 'static {
        move || self.release()
    }
}
