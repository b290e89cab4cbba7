use crate::{
    CONFIG_DIR_ENV, CONFIG_FILENAME, ConfigError, ConfigErrorResult, DEFAULT_CONFIG_DIRECTORY,
    LoggingConfig, ShutdownConfig, WorkerConfig,
};

use std::path::{Path, PathBuf};

use log::info;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub worker: WorkerConfig,
    pub shutdown: ShutdownConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load config with full production error handling.
    ///
    /// Loading order:
    /// 1. Check for RQ_CONFIG_DIR env var, else use ./.requiem/
    /// 2. Auto-create config directory if it doesn't exist
    /// 3. Load config.toml if it exists, else use defaults
    /// 4. Apply RQ_* environment variable overrides
    ///
    /// Does NOT validate - call validate() after load().
    pub fn load() -> ConfigErrorResult<Self> {
        let config_dir = Self::config_dir()?;

        if !config_dir.exists() {
            std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::Io {
                path: config_dir.clone(),
                source: e,
            })?;
        }

        let config_path = config_dir.join(CONFIG_FILENAME);

        let mut config = if config_path.exists() {
            Self::load_toml(&config_path)?
        } else {
            Config::default()
        };

        config.apply_env_overrides();

        Ok(config)
    }

    fn load_toml(path: &Path) -> ConfigErrorResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&contents).map_err(|e| ConfigError::Toml {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the config directory.
    /// Priority: RQ_CONFIG_DIR env var > ./.requiem/ (relative to cwd)
    pub fn config_dir() -> ConfigErrorResult<PathBuf> {
        if let Ok(dir) = std::env::var(CONFIG_DIR_ENV) {
            return Ok(PathBuf::from(dir));
        }

        let cwd = std::env::current_dir()
            .map_err(|_| ConfigError::config("Cannot determine current working directory"))?;
        Ok(cwd.join(DEFAULT_CONFIG_DIRECTORY))
    }

    /// Validate all configuration.
    /// Call after load() to catch all errors at startup.
    pub fn validate(&self) -> ConfigErrorResult<()> {
        self.worker.validate()?;
        self.shutdown.validate()?;
        self.logging.validate()?;

        Ok(())
    }

    /// Absolute path of the log file, if file logging is configured.
    pub fn log_file_path(&self) -> ConfigErrorResult<Option<PathBuf>> {
        match self.logging.file {
            Some(ref filename) => {
                let log_dir = Self::config_dir()?.join(&self.logging.dir);
                Ok(Some(log_dir.join(filename)))
            }
            None => Ok(None),
        }
    }

    /// Get bind address as string.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.worker.host, self.worker.port)
    }

    /// Log configuration summary.
    pub fn log_summary(&self) {
        info!("Configuration loaded:");
        info!(
            "  worker: {}:{} (max {} connections)",
            self.worker.host, self.worker.port, self.worker.max_connections
        );

        info!(
            "  shutdown: handle_shutdown={}, patch_supervisor={}",
            self.shutdown.handle_shutdown, self.shutdown.patch_supervisor
        );

        info!(
            "  drain timeouts: sockets={}, trackers={}",
            Self::describe_timeout(self.shutdown.socket_close_timeout_secs),
            Self::describe_timeout(self.shutdown.tracker_wait_timeout_secs)
        );

        info!(
            "  logging: {} (colored: {}, file: {})",
            *self.logging.level,
            self.logging.colored,
            self.logging.file.as_deref().unwrap_or("stdout")
        );
    }

    fn describe_timeout(secs: u64) -> String {
        if secs == 0 {
            String::from("none")
        } else {
            format!("{secs}s")
        }
    }

    fn apply_env_overrides(&mut self) {
        // Worker
        Self::apply_env_string("RQ_WORKER_HOST", &mut self.worker.host);
        Self::apply_env_parse("RQ_WORKER_PORT", &mut self.worker.port);
        Self::apply_env_parse(
            "RQ_WORKER_MAX_CONNECTIONS",
            &mut self.worker.max_connections,
        );

        // Shutdown
        Self::apply_env_bool("RQ_HANDLE_SHUTDOWN", &mut self.shutdown.handle_shutdown);
        Self::apply_env_bool("RQ_PATCH_SUPERVISOR", &mut self.shutdown.patch_supervisor);
        Self::apply_env_parse(
            "RQ_SOCKET_CLOSE_TIMEOUT_SECS",
            &mut self.shutdown.socket_close_timeout_secs,
        );
        Self::apply_env_parse(
            "RQ_TRACKER_WAIT_TIMEOUT_SECS",
            &mut self.shutdown.tracker_wait_timeout_secs,
        );

        // Logging
        Self::apply_env_parse("RQ_LOG_LEVEL", &mut self.logging.level);
        Self::apply_env_bool("RQ_LOG_COLORED", &mut self.logging.colored);
        Self::apply_env_option_string("RQ_LOG_FILE", &mut self.logging.file);
    }

    /// Helper: Apply environment variable override for String values
    fn apply_env_string(var_name: &str, target: &mut String) {
        if let Ok(val) = std::env::var(var_name) {
            *target = val;
        }
    }

    /// Helper: Apply environment variable override for bool values (accepts "true"/"1")
    fn apply_env_bool(var_name: &str, target: &mut bool) {
        if let Ok(val) = std::env::var(var_name) {
            *target = val == "true" || val == "1";
        }
    }

    /// Helper: Apply environment variable override for parseable values
    fn apply_env_parse<T: std::str::FromStr>(var_name: &str, target: &mut T) {
        if let Ok(val) = std::env::var(var_name)
            && let Ok(parsed) = val.parse()
        {
            *target = parsed;
        }
    }

    /// Helper: Apply environment variable override for Option<String> values
    fn apply_env_option_string(var_name: &str, target: &mut Option<String>) {
        if let Ok(val) = std::env::var(var_name) {
            *target = Some(val);
        }
    }
}
