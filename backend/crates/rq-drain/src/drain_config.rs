use std::time::Duration;

/// Per-phase limits for a drain. `None` waits forever.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainConfig {
    pub socket_close_timeout: Option<Duration>,
    pub tracker_wait_timeout: Option<Duration>,
}

impl DrainConfig {
    pub fn with_timeouts(socket_close_timeout: Duration, tracker_wait_timeout: Duration) -> Self {
        Self {
            socket_close_timeout: Some(socket_close_timeout),
            tracker_wait_timeout: Some(tracker_wait_timeout),
        }
    }
}
