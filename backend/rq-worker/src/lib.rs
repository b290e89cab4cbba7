pub mod connection;
pub mod error;
pub mod logger;
pub mod process_host;
pub mod request;
pub mod worker;

#[cfg(test)]
mod tests;

pub use connection::{ConnectionHandle, serve_connection};
pub use error::{Result as WorkerResult, WorkerError};
pub use process_host::{ProcessHost, SUPERVISOR_PID_ENV};
pub use request::{Request, Response};
pub use worker::Worker;
