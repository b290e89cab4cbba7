use rq_drain::{Coordinator, DrainConfig, HostIntegration, InitOptions};
use rq_worker::{ProcessHost, Worker, WorkerResult, logger};

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use log::{error, info, warn};
use tokio::net::TcpListener;

/// How long to wait for the host's exit request once the drain is over
const EXIT_GRACE: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
        Err(e) => {
            // Logger may not be initialized yet
            eprintln!("rq-worker failed: {e}");
            error!("rq-worker failed: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> WorkerResult<i32> {
    // Load and validate configuration
    let config = rq_config::Config::load()?;
    config.validate()?;

    // Initialize logger (before any other logging)
    logger::initialize(
        config.logging.level,
        config.log_file_path()?,
        config.logging.colored,
    )?;

    info!("Starting rq-worker v{}", env!("CARGO_PKG_VERSION"));
    config.log_summary();

    let coordinator = Coordinator::with_config(DrainConfig {
        socket_close_timeout: config.shutdown.socket_close_timeout(),
        tracker_wait_timeout: config.shutdown.tracker_wait_timeout(),
    });

    let listener = TcpListener::bind(config.bind_addr()).await?;
    let worker = Worker::new(listener, coordinator.clone(), config.worker.max_connections);
    info!("Listening on {}", worker.local_addr()?);

    let host = Arc::new(ProcessHost::from_env()?);
    if let Some(pid) = host.supervisor_pid() {
        info!("Running as supervised worker (supervisor pid {pid})");
    }

    let _integration = HostIntegration::initialize(
        &coordinator,
        Arc::clone(&host),
        InitOptions {
            handle_shutdown: config.shutdown.handle_shutdown,
            patch_supervisor: config.shutdown.patch_supervisor,
        },
    );

    let outcome = worker.run().await;
    if outcome.is_forced() {
        warn!("Drain did not complete cleanly: {outcome}");
    }

    // Dead listeners run right after the state flips, so the exit request may trail it
    let code = match tokio::time::timeout(EXIT_GRACE, host.exited()).await {
        Ok(code) => code,
        Err(_) => {
            warn!("No exit requested after drain, exiting with status 0");
            0
        }
    };

    info!("rq-worker stopped");
    Ok(code)
}
