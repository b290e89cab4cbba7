mod config;
mod error;
mod log_level;
mod logging_config;
mod shutdown_config;
mod worker_config;

#[cfg(test)]
mod tests;

pub use config::Config;
pub use error::{ConfigError, ConfigErrorResult};
pub use log_level::LogLevel;
pub use logging_config::LoggingConfig;
pub use shutdown_config::{
    DEFAULT_SOCKET_CLOSE_TIMEOUT_SECS, DEFAULT_TRACKER_WAIT_TIMEOUT_SECS, MAX_DRAIN_TIMEOUT_SECS,
    ShutdownConfig,
};
pub use worker_config::WorkerConfig;

const CONFIG_DIR_ENV: &str = "RQ_CONFIG_DIR";
const DEFAULT_CONFIG_DIRECTORY: &str = ".requiem";
const CONFIG_FILENAME: &str = "config.toml";

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 7400;
const MIN_PORT: u16 = 1024;

const DEFAULT_MAX_CONNECTIONS: usize = 1024;
const MIN_MAX_CONNECTIONS: usize = 1;
const MAX_MAX_CONNECTIONS: usize = 100_000;

const DEFAULT_LOG_LEVEL_STRING: &str = "info";
const DEFAULT_LOG_LEVEL: log::LevelFilter = log::LevelFilter::Info;
const DEFAULT_LOG_DIRECTORY: &str = "log";
