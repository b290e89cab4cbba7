use crate::{WorkerResult, serve_connection};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use log::{info, warn};
use rq_drain::{Coordinator, DrainOutcome};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;

/// Back off after a failed accept (e.g. out of file descriptors)
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

/// Accept loop of the worker process
pub struct Worker {
    listener: TcpListener,
    coordinator: Coordinator,
    connection_slots: Arc<Semaphore>,
}

impl Worker {
    pub fn new(listener: TcpListener, coordinator: Coordinator, max_connections: usize) -> Self {
        Self {
            listener,
            coordinator,
            connection_slots: Arc::new(Semaphore::new(max_connections)),
        }
    }

    pub fn local_addr(&self) -> WorkerResult<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the drain begins, then wait for it to finish.
    ///
    /// The listener is closed as soon as the drain begins, so no connection
    /// is accepted while sockets are being closed.
    pub async fn run(self) -> DrainOutcome {
        let mut lifecycle = self.coordinator.subscribe_guard();

        info!("Worker ready to accept connections");
        loop {
            tokio::select! {
                _ = lifecycle.begun() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, peer)) => self.spawn_connection(stream, peer).await,
                    Err(e) => {
                        warn!("Failed to accept connection: {e}");
                        tokio::time::sleep(ACCEPT_BACKOFF).await;
                    }
                },
            }
        }

        drop(self.listener);
        info!("Drain begun, listener closed");

        let outcome = lifecycle.dead().await;
        info!("Worker drained ({outcome})");
        outcome
    }

    async fn spawn_connection(&self, mut stream: TcpStream, peer: SocketAddr) {
        let Ok(slot) = Arc::clone(&self.connection_slots).try_acquire_owned() else {
            warn!("Connection limit reached, rejecting {peer}");
            let _ = stream.write_all(b"ERR connection limit reached\n").await;
            return;
        };

        let coordinator = self.coordinator.clone();
        tokio::spawn(async move {
            serve_connection(stream, peer, coordinator).await;
            drop(slot);
        });
    }
}
