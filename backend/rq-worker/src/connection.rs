use crate::{Request, Response, WorkerResult};

use std::net::SocketAddr;

use async_trait::async_trait;
use log::{debug, info, warn};
use rq_drain::{Coordinator, Socket};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::watch;
use uuid::Uuid;

/// Drain-side handle of a client connection.
///
/// Closing asks the connection task to stop after its current request and
/// resolves once the task has shut the stream down.
pub struct ConnectionHandle {
    peer: SocketAddr,
    close_tx: watch::Sender<bool>,
    finished_rx: watch::Receiver<bool>,
}

#[async_trait]
impl Socket for ConnectionHandle {
    async fn close(&self) {
        debug!("Asking connection {} to close", self.peer);
        self.close_tx.send_replace(true);

        let mut finished_rx = self.finished_rx.clone();
        // A dropped sender means the task is gone, which is just as final
        let _ = finished_rx.wait_for(|finished| *finished).await;
    }
}

/// Serve one client until it quits, disconnects or the drain closes it
pub async fn serve_connection(stream: TcpStream, peer: SocketAddr, coordinator: Coordinator) {
    let (close_tx, close_rx) = watch::channel(false);
    let (finished_tx, finished_rx) = watch::channel(false);
    let registration = coordinator.track_socket(ConnectionHandle {
        peer,
        close_tx,
        finished_rx,
    });

    info!("Connection {peer} opened");
    match run(stream, close_rx, &coordinator).await {
        Ok(()) => info!("Connection {peer} closed"),
        Err(e) => warn!("Connection {peer} failed: {e}"),
    }

    registration.closed();
    finished_tx.send_replace(true);
}

async fn run(
    stream: TcpStream,
    mut close_rx: watch::Receiver<bool>,
    coordinator: &Coordinator,
) -> WorkerResult<()> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    loop {
        let line = tokio::select! {
            biased;
            _ = close_rx.wait_for(|close| *close) => break,
            line = lines.next_line() => line?,
        };

        let Some(line) = line else {
            // Client hung up
            break;
        };

        let request = match Request::parse(&line) {
            Ok(request) => request,
            Err(e) => {
                write_response(&mut writer, &Response::Error(e.to_string())).await?;
                continue;
            }
        };

        let quit = request == Request::Quit;
        let response = coordinator.track_future(handle(request, coordinator.clone())).await;
        write_response(&mut writer, &response).await?;

        if quit {
            break;
        }
    }

    writer.shutdown().await?;
    Ok(())
}

async fn handle(request: Request, coordinator: Coordinator) -> Response {
    match request {
        Request::Ping => Response::Pong,
        Request::Quit => Response::Bye,
        Request::Echo(text) => Response::Echo(text),
        Request::Sleep(duration) => {
            tokio::time::sleep(duration).await;
            Response::Ok
        }
        Request::Job(duration) => {
            let job_id = Uuid::new_v4().to_string();
            let id = job_id.clone();
            // Outlives the connection; the drain waits for it after closing sockets
            tokio::spawn(coordinator.track_future(async move {
                tokio::time::sleep(duration).await;
                info!("Job {id} finished after {}ms", duration.as_millis());
            }));
            Response::Accepted(job_id)
        }
    }
}

async fn write_response(writer: &mut OwnedWriteHalf, response: &Response) -> WorkerResult<()> {
    writer.write_all(format!("{response}\n").as_bytes()).await?;
    writer.flush().await?;
    Ok(())
}
