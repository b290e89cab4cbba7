use crate::{WorkerError, WorkerResult};

use std::fmt;
use std::time::Duration;

/// Longest sleep or job a client may ask for
pub const MAX_REQUEST_DURATION: Duration = Duration::from_secs(60);

/// One line of the worker's text protocol
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// `PING`
    Ping,
    /// `SLEEP <ms>`: answered once the sleep is over
    Sleep(Duration),
    /// `JOB <ms>`: answered immediately, runs in the background
    Job(Duration),
    /// `QUIT`
    Quit,
    /// Anything else is echoed back
    Echo(String),
}

impl Request {
    pub fn parse(line: &str) -> WorkerResult<Self> {
        let line = line.trim();
        let (command, argument) = match line.split_once(char::is_whitespace) {
            Some((command, argument)) => (command, Some(argument.trim())),
            None => (line, None),
        };

        match command.to_ascii_uppercase().as_str() {
            "PING" => Ok(Self::Ping),
            "QUIT" => Ok(Self::Quit),
            "SLEEP" => Ok(Self::Sleep(Self::parse_duration(command, argument)?)),
            "JOB" => Ok(Self::Job(Self::parse_duration(command, argument)?)),
            _ => Ok(Self::Echo(line.to_string())),
        }
    }

    fn parse_duration(command: &str, argument: Option<&str>) -> WorkerResult<Duration> {
        let argument = argument
            .filter(|a| !a.is_empty())
            .ok_or_else(|| WorkerError::invalid_request(format!("{command} needs a duration")))?;

        let millis: u64 = argument.parse().map_err(|_| {
            WorkerError::invalid_request(format!("'{argument}' is not a duration in ms"))
        })?;

        let duration = Duration::from_millis(millis);
        if duration > MAX_REQUEST_DURATION {
            return Err(WorkerError::invalid_request(format!(
                "duration must be at most {}ms",
                MAX_REQUEST_DURATION.as_millis()
            )));
        }
        Ok(duration)
    }
}

/// Reply line sent back to the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Pong,
    Ok,
    Accepted(String),
    Bye,
    Echo(String),
    Error(String),
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pong => write!(f, "PONG"),
            Self::Ok => write!(f, "OK"),
            Self::Accepted(job_id) => write!(f, "ACCEPTED {job_id}"),
            Self::Bye => write!(f, "BYE"),
            Self::Echo(text) => write!(f, "ECHO {text}"),
            Self::Error(message) => write!(f, "ERR {message}"),
        }
    }
}
