use crate::{ConfigError, ConfigErrorResult};

use std::time::Duration;

use serde::Deserialize;

// Drain phase timeouts (seconds). 0 disables the timeout.
pub const MAX_DRAIN_TIMEOUT_SECS: u64 = 3600;
pub const DEFAULT_SOCKET_CLOSE_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_TRACKER_WAIT_TIMEOUT_SECS: u64 = 60;

/// Graceful shutdown settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Begin draining when the process receives a shutdown signal
    pub handle_shutdown: bool,
    /// Defer the supervisor disconnect until the drain completes (supervised workers only)
    pub patch_supervisor: bool,
    /// Upper bound on closing every tracked socket (0 = wait forever)
    pub socket_close_timeout_secs: u64,
    /// Upper bound on waiting for in-flight operations (0 = wait forever)
    pub tracker_wait_timeout_secs: u64,
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            handle_shutdown: true,
            patch_supervisor: true,
            socket_close_timeout_secs: DEFAULT_SOCKET_CLOSE_TIMEOUT_SECS,
            tracker_wait_timeout_secs: DEFAULT_TRACKER_WAIT_TIMEOUT_SECS,
        }
    }
}

impl ShutdownConfig {
    pub fn validate(&self) -> ConfigErrorResult<()> {
        if self.socket_close_timeout_secs > MAX_DRAIN_TIMEOUT_SECS {
            return Err(ConfigError::shutdown(format!(
                "shutdown.socket_close_timeout_secs must be 0-{}, got {}",
                MAX_DRAIN_TIMEOUT_SECS, self.socket_close_timeout_secs
            )));
        }

        if self.tracker_wait_timeout_secs > MAX_DRAIN_TIMEOUT_SECS {
            return Err(ConfigError::shutdown(format!(
                "shutdown.tracker_wait_timeout_secs must be 0-{}, got {}",
                MAX_DRAIN_TIMEOUT_SECS, self.tracker_wait_timeout_secs
            )));
        }

        Ok(())
    }

    pub fn socket_close_timeout(&self) -> Option<Duration> {
        Self::as_timeout(self.socket_close_timeout_secs)
    }

    pub fn tracker_wait_timeout(&self) -> Option<Duration> {
        Self::as_timeout(self.tracker_wait_timeout_secs)
    }

    fn as_timeout(secs: u64) -> Option<Duration> {
        (secs > 0).then(|| Duration::from_secs(secs))
    }
}
