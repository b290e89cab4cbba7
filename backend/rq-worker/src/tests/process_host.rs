use crate::ProcessHost;

use std::time::Duration;

use googletest::assert_that;
use googletest::prelude::eq;
use rq_drain::Host;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_millis(500);

#[test]
fn given_no_supervisor_when_created_then_not_supervised_worker() {
    let host = ProcessHost::new(None);

    assert!(!host.is_supervised_worker());
    assert!(host.exit_code().is_none());
}

#[test]
fn given_supervisor_pid_when_created_then_supervised_worker() {
    let host = ProcessHost::new(Some(4242));

    assert!(host.is_supervised_worker());
    assert_eq!(host.supervisor_pid(), Some(4242));
}

#[tokio::test]
async fn given_exit_requested_when_waiting_then_exited_resolves_with_code() {
    // Given
    let host = ProcessHost::new(None);

    // When
    host.exit(3);

    // Then
    let code = timeout(WAIT, host.exited()).await.ok();
    assert_eq!(code, Some(3));
}

#[tokio::test]
async fn given_waiter_when_exit_requested_later_then_waiter_wakes() {
    // Given
    let host = std::sync::Arc::new(ProcessHost::new(None));
    let waiter = {
        let host = std::sync::Arc::clone(&host);
        tokio::spawn(async move { host.exited().await })
    };
    tokio::task::yield_now().await;

    // When
    host.exit(0);

    // Then
    let code = timeout(WAIT, waiter).await.ok().and_then(|joined| joined.ok());
    assert_eq!(code, Some(0));
}

#[test]
fn given_two_exit_requests_when_checked_then_first_wins() {
    let host = ProcessHost::new(None);

    host.exit(2);
    host.exit(0);

    assert_eq!(host.exit_code(), Some(2));
}

#[test]
fn given_unsupervised_host_when_disconnecting_then_exits_zero() {
    let host = ProcessHost::new(None);

    host.disconnect();

    assert_that!(host.exit_code().unwrap_or(-1), eq(0));
}

#[tokio::test]
async fn given_unsupervised_host_when_listening_for_disconnect_then_error() {
    let host = ProcessHost::new(None);

    let result = timeout(WAIT, host.disconnect_requested()).await;

    assert!(matches!(result, Ok(Err(_))));
}

#[cfg(unix)]
#[tokio::test]
async fn given_supervised_host_when_disconnect_signal_arrives_before_listening_then_observed() {
    use nix::sys::signal::{Signal, raise};

    // Given: the handler is installed when the host is built
    let host = ProcessHost::supervised(4242).expect("install SIGUSR2 handler");
    assert!(host.is_supervised_worker());

    // When: the supervisor asks before anyone listens
    raise(Signal::SIGUSR2).expect("raise SIGUSR2");

    // Then
    let result = timeout(WAIT, host.disconnect_requested()).await;
    assert!(matches!(result, Ok(Ok(()))));
    assert!(host.exit_code().is_none());
}
