//! Error types for the status monitor
//!
//! Probe failures are split into two kinds that the monitor treats
//! differently:
//!
//! - [`ConnectivityError`]: the lightweight status round trip failed. The
//!   server is considered offline.
//! - [`MetricsFetchError`]: connectivity was confirmed but the detailed
//!   metrics query failed. Connectivity is left untouched.
//!
//! Everything else (configuration, registry and lifecycle misuse) is an
//! [`Error`].

use thiserror::Error;

/// Result type alias for monitor operations
pub type Result<T> = std::result::Result<T, Error>;

/// Failure to complete a status round trip against a server
///
/// The underlying cause (timeout, refusal, DNS failure, malformed reply) is
/// kept only as a human readable reason; callers never branch on it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("cannot reach '{host}:{port}': {reason}")]
pub struct ConnectivityError {
    /// Host that was queried
    pub host: String,
    /// Port that was queried
    pub port: u16,
    /// Description of the underlying failure
    pub reason: String,
}

impl ConnectivityError {
    /// Create a connectivity error for the given endpoint
    pub fn new(host: impl Into<String>, port: u16, reason: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port,
            reason: reason.into(),
        }
    }
}

/// Failure of the detailed metrics query after the server answered a probe
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("updating the properties of '{host}:{port}' failed: {reason}")]
pub struct MetricsFetchError {
    /// Host that was queried
    pub host: String,
    /// Port that was queried
    pub port: u16,
    /// Description of the underlying failure
    pub reason: String,
}

impl From<ConnectivityError> for MetricsFetchError {
    fn from(err: ConnectivityError) -> Self {
        Self {
            host: err.host,
            port: err.port,
            reason: err.reason,
        }
    }
}

/// Core error type for the status monitor
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A monitor with the same unique id is already registered
    #[error("Server already registered: {0}")]
    AlreadyRegistered(String),

    /// No monitor registered under the given unique id
    #[error("Server not found: {0}")]
    NotFound(String),

    /// The periodic timer of a monitor is already armed
    #[error("Monitor already running: {0}")]
    AlreadyRunning(String),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an invalid input error
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create an "already registered" error
    pub fn already_registered(unique_id: impl Into<String>) -> Self {
        Self::AlreadyRegistered(unique_id.into())
    }

    /// Create a "not found" error
    pub fn not_found(unique_id: impl Into<String>) -> Self {
        Self::NotFound(unique_id.into())
    }

    /// Create an "already running" error
    pub fn already_running(unique_id: impl Into<String>) -> Self {
        Self::AlreadyRunning(unique_id.into())
    }
}

/// Helper for converting anyhow::Error to our Error type
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_error_wraps_connectivity_details() {
        let err = MetricsFetchError::from(ConnectivityError::new("play.example.net", 19132, "timed out"));
        assert_eq!(
            err.to_string(),
            "updating the properties of 'play.example.net:19132' failed: timed out"
        );
    }

    #[test]
    fn connectivity_error_names_the_endpoint() {
        let err = ConnectivityError::new("localhost", 19133, "connection refused");
        assert_eq!(err.to_string(), "cannot reach 'localhost:19133': connection refused");
    }

    #[test]
    fn anyhow_errors_become_other() {
        let err: Error = anyhow::anyhow!("runtime gone").into();
        assert!(matches!(err, Error::Other(ref msg) if msg == "runtime gone"));
    }
}
