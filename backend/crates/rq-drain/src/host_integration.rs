use crate::{Coordinator, DrainOutcome, Host};

use std::sync::Arc;

use log::{error, info, warn};
use tokio::task::JoinHandle;

/// Which host hooks [`HostIntegration::initialize`] installs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitOptions {
    /// Begin draining when the host asks the process to shut down
    pub handle_shutdown: bool,
    /// Route the supervisor's disconnect through the drain (supervised workers only)
    pub patch_supervisor: bool,
}

impl Default for InitOptions {
    fn default() -> Self {
        Self {
            handle_shutdown: true,
            patch_supervisor: true,
        }
    }
}

/// Supervisor disconnect that only runs after the drain completes.
#[derive(Clone)]
pub struct WorkerDisconnect {
    coordinator: Coordinator,
    host: Arc<dyn Host>,
}

impl WorkerDisconnect {
    pub fn new(coordinator: Coordinator, host: Arc<dyn Host>) -> Self {
        Self { coordinator, host }
    }

    /// Drain, then perform the host's disconnect
    pub fn disconnect(&self) {
        let host = Arc::clone(&self.host);
        self.coordinator.begin_with(move |outcome| {
            info!("Drain finished ({outcome}), disconnecting from supervisor");
            host.disconnect();
        });
    }
}

/// Host hooks wired to a coordinator.
///
/// Listener tasks are aborted when this value is dropped, so keep it alive
/// for as long as the process should react to host requests.
pub struct HostIntegration {
    options: InitOptions,
    listeners: Vec<JoinHandle<()>>,
    worker_disconnect: Option<WorkerDisconnect>,
}

impl HostIntegration {
    /// Install the host hooks selected by `options`.
    ///
    /// Must be called from within a Tokio runtime when any hook is enabled.
    pub fn initialize<H>(coordinator: &Coordinator, host: Arc<H>, options: InitOptions) -> Self
    where
        H: Host,
    {
        let host: Arc<dyn Host> = host;
        let mut listeners = Vec::new();

        let worker_disconnect = if options.patch_supervisor && host.is_supervised_worker() {
            let worker_disconnect = WorkerDisconnect::new(coordinator.clone(), Arc::clone(&host));
            listeners.push(Self::spawn_disconnect_listener(
                Arc::clone(&host),
                worker_disconnect.clone(),
            ));
            info!("Supervisor disconnect deferred until drain completes");
            Some(worker_disconnect)
        } else {
            None
        };

        if options.handle_shutdown {
            listeners.push(Self::spawn_shutdown_listener(
                coordinator.clone(),
                Arc::clone(&host),
            ));
            info!("Shutdown requests will drain the worker");
        }

        Self {
            options,
            listeners,
            worker_disconnect,
        }
    }

    pub fn options(&self) -> InitOptions {
        self.options
    }

    /// The deferred disconnect, when the supervisor hook was patched
    pub fn worker_disconnect(&self) -> Option<&WorkerDisconnect> {
        self.worker_disconnect.as_ref()
    }

    /// Number of host listeners installed
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn spawn_disconnect_listener(
        host: Arc<dyn Host>,
        worker_disconnect: WorkerDisconnect,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            match host.disconnect_requested().await {
                Ok(()) => {
                    info!("Supervisor requested disconnect, draining first");
                    worker_disconnect.disconnect();
                }
                Err(e) => error!("Failed to listen for supervisor disconnect: {e}"),
            }
        })
    }

    fn spawn_shutdown_listener(coordinator: Coordinator, host: Arc<dyn Host>) -> JoinHandle<()> {
        tokio::spawn(async move {
            match host.shutdown_requested().await {
                Ok(()) => {
                    info!("Shutdown requested, draining");
                    coordinator.begin_with(move |outcome| Self::after_shutdown(host, outcome));
                }
                Err(e) => error!("Failed to listen for shutdown requests: {e}"),
            }
        })
    }

    fn after_shutdown(host: Arc<dyn Host>, outcome: DrainOutcome) {
        if outcome.is_forced() {
            warn!("Exiting after forced drain: {outcome}");
        }

        if host.is_supervised_worker() {
            // Clean exit through the supervisor
            host.disconnect();
        } else {
            host.exit(0);
        }
    }
}

impl Drop for HostIntegration {
    fn drop(&mut self) {
        for listener in &self.listeners {
            listener.abort();
        }
    }
}
