use crate::WorkerResult;

#[cfg(unix)]
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use log::{info, warn};
use rq_drain::{DrainError, Host, Result as DrainResult};
use tokio::sync::watch;

#[cfg(unix)]
use tokio::signal::unix::{Signal, SignalKind, signal};

/// Set by the supervisor when it launches this process as a worker
pub const SUPERVISOR_PID_ENV: &str = "RQ_SUPERVISOR_PID";

/// [`Host`] backed by the real process.
///
/// * shutdown request: SIGTERM or SIGINT
/// * disconnect request (supervised workers): SIGUSR2
/// * disconnect: SIGUSR1 to the supervisor, then exit 0
///
/// Exiting does not terminate the process directly; it resolves
/// [`ProcessHost::exited`] so `main` can unwind and return the status.
pub struct ProcessHost {
    supervisor_pid: Option<i32>,
    exit_tx: watch::Sender<Option<i32>>,
    /// SIGUSR2 stream installed up front, so an early request is not fatal
    #[cfg(unix)]
    disconnect_signal: Mutex<Option<Signal>>,
}

impl ProcessHost {
    /// Host without any signal handlers installed yet
    pub fn new(supervisor_pid: Option<i32>) -> Self {
        let (exit_tx, _) = watch::channel(None);
        Self {
            supervisor_pid,
            exit_tx,
            #[cfg(unix)]
            disconnect_signal: Mutex::new(None),
        }
    }

    /// Host of a worker launched by the supervisor `supervisor_pid`.
    ///
    /// Installs the disconnect signal handler immediately, replacing the
    /// default disposition that would kill the worker without draining.
    /// Must be called from within a Tokio runtime.
    pub fn supervised(supervisor_pid: i32) -> WorkerResult<Self> {
        let host = Self::new(Some(supervisor_pid));
        #[cfg(unix)]
        {
            let disconnect_signal = signal(SignalKind::user_defined2())?;
            *host.lock_disconnect_signal() = Some(disconnect_signal);
        }
        Ok(host)
    }

    /// Read the supervisor pid from the environment
    pub fn from_env() -> WorkerResult<Self> {
        let supervisor_pid = std::env::var(SUPERVISOR_PID_ENV).ok().and_then(|value| {
            match value.trim().parse::<i32>() {
                Ok(pid) if pid > 0 => Some(pid),
                _ => {
                    warn!("Ignoring invalid {SUPERVISOR_PID_ENV}={value}");
                    None
                }
            }
        });

        match supervisor_pid {
            Some(pid) => Self::supervised(pid),
            None => Ok(Self::new(None)),
        }
    }

    pub fn supervisor_pid(&self) -> Option<i32> {
        self.supervisor_pid
    }

    /// Exit status requested so far, if any
    pub fn exit_code(&self) -> Option<i32> {
        *self.exit_tx.borrow()
    }

    /// Resolve with the exit status once an exit has been requested
    pub async fn exited(&self) -> i32 {
        let mut exit_rx = self.exit_tx.subscribe();
        match exit_rx.wait_for(Option::is_some).await {
            Ok(code) => code.unwrap_or(0),
            // The sender lives in self, so this is unreachable while borrowed
            Err(_) => 0,
        }
    }

    /// First exit request wins
    fn request_exit(&self, code: i32) {
        self.exit_tx.send_if_modified(|current| {
            if current.is_none() {
                *current = Some(code);
                true
            } else {
                false
            }
        });
    }

    #[cfg(unix)]
    fn lock_disconnect_signal(&self) -> MutexGuard<'_, Option<Signal>> {
        self.disconnect_signal
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(unix)]
    fn notify_supervisor(pid: i32) {
        use nix::sys::signal::{Signal as NixSignal, kill};
        use nix::unistd::Pid;

        info!("Notifying supervisor {pid} of disconnect");
        if let Err(e) = kill(Pid::from_raw(pid), NixSignal::SIGUSR1) {
            warn!("Failed to notify supervisor {pid}: {e}");
        }
    }

    #[cfg(not(unix))]
    fn notify_supervisor(pid: i32) {
        warn!("Supervisor notification is not supported on this platform (supervisor {pid})");
    }
}

#[async_trait]
impl Host for ProcessHost {
    #[cfg(unix)]
    async fn shutdown_requested(&self) -> DrainResult<()> {
        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| DrainError::signal_listener("SIGTERM", e))?;
        let mut sigint = signal(SignalKind::interrupt())
            .map_err(|e| DrainError::signal_listener("SIGINT", e))?;

        tokio::select! {
            _ = sigterm.recv() => info!("Received SIGTERM, initiating graceful shutdown"),
            _ = sigint.recv() => info!("Received SIGINT, initiating graceful shutdown"),
        }
        Ok(())
    }

    #[cfg(not(unix))]
    async fn shutdown_requested(&self) -> DrainResult<()> {
        tokio::signal::ctrl_c()
            .await
            .map_err(|e| DrainError::signal_listener("Ctrl+C", e))?;
        info!("Received Ctrl+C, initiating graceful shutdown");
        Ok(())
    }

    #[cfg(unix)]
    async fn disconnect_requested(&self) -> DrainResult<()> {
        if self.supervisor_pid.is_none() {
            return Err(DrainError::supervisor("not running under a supervisor"));
        }

        let installed = self.lock_disconnect_signal().take();
        let mut sigusr2 = match installed {
            Some(sigusr2) => sigusr2,
            None => signal(SignalKind::user_defined2())
                .map_err(|e| DrainError::signal_listener("SIGUSR2", e))?,
        };
        sigusr2.recv().await;
        info!("Received SIGUSR2 from supervisor");
        Ok(())
    }

    #[cfg(not(unix))]
    async fn disconnect_requested(&self) -> DrainResult<()> {
        Err(DrainError::supervisor(
            "supervisor disconnect requests are not supported on this platform",
        ))
    }

    fn is_supervised_worker(&self) -> bool {
        self.supervisor_pid.is_some()
    }

    fn disconnect(&self) {
        if let Some(pid) = self.supervisor_pid {
            Self::notify_supervisor(pid);
        }
        self.request_exit(0);
    }

    fn exit(&self, code: i32) {
        info!("Exiting with status {code}");
        self.request_exit(code);
    }
}
