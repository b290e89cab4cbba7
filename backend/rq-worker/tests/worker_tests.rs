use rq_drain::{Coordinator, DrainOutcome};
use rq_worker::Worker;

use std::net::SocketAddr;
use std::time::Duration;

use googletest::assert_that;
use googletest::prelude::eq;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

struct Client {
    lines: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl Client {
    async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect");
        let (reader, writer) = stream.into_split();
        Self {
            lines: BufReader::new(reader).lines(),
            writer,
        }
    }

    async fn send(&mut self, line: &str) {
        self.writer
            .write_all(format!("{line}\n").as_bytes())
            .await
            .expect("write");
    }

    async fn recv(&mut self) -> Option<String> {
        timeout(WAIT, self.lines.next_line())
            .await
            .expect("response timed out")
            .expect("read")
    }

    async fn request(&mut self, line: &str) -> Option<String> {
        self.send(line).await;
        self.recv().await
    }
}

async fn start_worker(coordinator: &Coordinator) -> (SocketAddr, JoinHandle<DrainOutcome>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let worker = Worker::new(listener, coordinator.clone(), 16);
    let addr = worker.local_addr().expect("local addr");
    (addr, tokio::spawn(worker.run()))
}

#[tokio::test]
async fn given_running_worker_when_client_pings_then_pong_and_quit_closes() {
    // Given
    let coordinator = Coordinator::new();
    let (addr, _worker) = start_worker(&coordinator).await;
    let mut client = Client::connect(addr).await;

    // When / Then
    assert_that!(client.request("PING").await, eq(&Some(String::from("PONG"))));
    assert_that!(
        client.request("hello").await,
        eq(&Some(String::from("ECHO hello")))
    );
    assert_that!(client.request("QUIT").await, eq(&Some(String::from("BYE"))));
    assert_that!(client.recv().await, eq(&None));
}

#[tokio::test]
async fn given_bad_request_when_sent_then_error_line_and_connection_stays_open() {
    let coordinator = Coordinator::new();
    let (addr, _worker) = start_worker(&coordinator).await;
    let mut client = Client::connect(addr).await;

    let reply = client.request("SLEEP forever").await.unwrap_or_default();

    assert!(reply.starts_with("ERR "));
    assert_that!(client.request("PING").await, eq(&Some(String::from("PONG"))));
}

#[tokio::test]
async fn given_open_connection_when_client_disconnects_then_socket_untracked() {
    // Given
    let coordinator = Coordinator::new();
    let (addr, _worker) = start_worker(&coordinator).await;
    let mut client = Client::connect(addr).await;
    assert_that!(client.request("PING").await, eq(&Some(String::from("PONG"))));
    assert_that!(coordinator.socket_count(), eq(1));

    // When
    drop(client);

    // Then
    let drained = timeout(WAIT, async {
        while coordinator.socket_count() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(drained.is_ok());
}

#[tokio::test]
async fn given_in_flight_work_when_drain_begins_then_work_finishes_before_dead() {
    // Given
    let coordinator = Coordinator::new();
    let (addr, worker) = start_worker(&coordinator).await;

    let mut idle = Client::connect(addr).await;
    assert_that!(idle.request("PING").await, eq(&Some(String::from("PONG"))));

    let mut busy = Client::connect(addr).await;
    assert_that!(busy.request("PING").await, eq(&Some(String::from("PONG"))));

    let mut submitter = Client::connect(addr).await;
    let accepted = submitter.request("JOB 300").await.unwrap_or_default();
    assert!(accepted.starts_with("ACCEPTED "));

    busy.send("SLEEP 200").await;
    tokio::time::sleep(Duration::from_millis(50)).await;

    // When
    coordinator.begin();

    // Then: the in-flight sleep is answered, then every connection is closed
    assert_that!(busy.recv().await, eq(&Some(String::from("OK"))));
    assert_that!(busy.recv().await, eq(&None));
    assert_that!(idle.recv().await, eq(&None));
    assert_that!(submitter.recv().await, eq(&None));

    let outcome = timeout(WAIT, worker)
        .await
        .expect("worker did not finish")
        .expect("worker panicked");
    assert_that!(outcome, eq(DrainOutcome::Clean));
    assert!(coordinator.state().is_dead());
    assert_that!(coordinator.socket_count(), eq(0));
    assert_that!(coordinator.tracker_count(), eq(0));

    // Listener is gone once the drain has begun
    assert!(TcpStream::connect(addr).await.is_err());
}

#[tokio::test]
async fn given_connection_limit_reached_when_connecting_then_rejected() {
    // Given
    let coordinator = Coordinator::new();
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let worker = Worker::new(listener, coordinator.clone(), 1);
    let addr = worker.local_addr().expect("local addr");
    let _worker = tokio::spawn(worker.run());

    let mut first = Client::connect(addr).await;
    assert_that!(first.request("PING").await, eq(&Some(String::from("PONG"))));

    // When
    let mut second = Client::connect(addr).await;

    // Then
    assert_that!(
        second.recv().await,
        eq(&Some(String::from("ERR connection limit reached")))
    );
    assert_that!(second.recv().await, eq(&None));
}
