use crate::Result as DrainResult;

use async_trait::async_trait;

/// The process environment a worker runs in.
///
/// The host integration listens for shutdown and disconnect requests through
/// this trait and performs the host's own exit actions once draining is done.
#[async_trait]
pub trait Host: Send + Sync + 'static {
    /// Resolve when the process is asked to shut down
    async fn shutdown_requested(&self) -> DrainResult<()>;

    /// Resolve when the supervisor asks this worker to disconnect
    async fn disconnect_requested(&self) -> DrainResult<()>;

    /// Whether this process runs as a worker under a supervisor
    fn is_supervised_worker(&self) -> bool;

    /// Complete the supervisor's clean-exit handshake for this worker
    fn disconnect(&self);

    /// Terminate the process with `code`
    fn exit(&self, code: i32);
}
