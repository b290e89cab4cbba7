use std::panic::Location;

use error_location::ErrorLocation;
use thiserror::Error;

/// Failures of the host integration. Drain coordination itself never fails;
/// a drain that cannot finish either hangs or ends with a forced outcome.
#[derive(Error, Debug)]
pub enum DrainError {
    #[error("Failed to listen for {signal}: {source} {location}")]
    SignalListener {
        signal: &'static str,
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("Supervisor handshake failed: {message} {location}")]
    Supervisor {
        message: String,
        location: ErrorLocation,
    },
}

impl DrainError {
    #[track_caller]
    pub fn signal_listener(signal: &'static str, source: std::io::Error) -> Self {
        Self::SignalListener {
            signal,
            source,
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn supervisor<S: Into<String>>(message: S) -> Self {
        Self::Supervisor {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

pub type Result<T> = std::result::Result<T, DrainError>;
