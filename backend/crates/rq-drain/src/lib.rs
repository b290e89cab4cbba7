//! Graceful drain coordination for a networked worker.
//!
//! A [`Coordinator`] owns the registries of open sockets and in-flight
//! [`Tracker`]s. Calling [`Coordinator::begin`] moves it from `ready` to
//! `preparing`, closes every registered socket, waits for every registered
//! tracker and finally moves to `dead`, notifying every waiter exactly once.

pub mod coordinator;
pub mod drain_config;
pub mod drain_outcome;
pub mod entry_id;
pub mod error;
pub mod host;
pub mod host_integration;
pub mod lifecycle_guard;
pub mod lifecycle_state;
pub mod metrics;
pub mod registry;
pub mod release;
pub mod socket;
pub mod socket_registration;
pub mod tracker;
pub mod tracker_guard;

pub use coordinator::Coordinator;
pub use drain_config::DrainConfig;
pub use drain_outcome::DrainOutcome;
pub use entry_id::EntryId;
pub use error::{DrainError, Result};
pub use host::Host;
pub use host_integration::{HostIntegration, InitOptions, WorkerDisconnect};
pub use lifecycle_guard::LifecycleGuard;
pub use lifecycle_state::LifecycleState;
pub use metrics::DrainMetrics;
pub use registry::Registry;
pub use release::Release;
pub use socket::Socket;
pub use socket_registration::SocketRegistration;
pub use tracker::{Tracker, TrackerState};
pub use tracker_guard::TrackerGuard;

#[cfg(test)]
mod tests;
