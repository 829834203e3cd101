// # Status Query Trait
//
// Defines the interface of the wire-protocol client that performs the
// connectionless status request against a Bedrock server.
//
// The client is blocking: it sends the request, waits for the reply and
// retries on its own up to the budget it is given. The core never calls it
// on the async runtime directly; `StatusProbe` dispatches it onto the
// blocking worker pool.
//
// ## Usage
//
// ```rust,ignore
// use mcbe_status_core::StatusQuery;
//
// let query = /* StatusQuery implementation */;
// let response = query.query("play.example.net", 19132, 3)?;
// println!("{} players online", response.players_online);
// ```

use std::time::Duration;

/// Structured reply of a successful status request
#[derive(Debug, Clone, PartialEq)]
pub struct StatusResponse {
    /// Version brand reported by the server (e.g. "MCPE")
    pub version_brand: String,
    /// Network protocol version
    pub protocol_version: i32,
    /// Round-trip time of the request
    pub latency: Duration,
    /// Players currently online
    pub players_online: u32,
    /// Player slots
    pub players_max: u32,
    /// Message of the day
    pub motd: String,
    /// Name of the loaded world, when reported
    pub map_name: Option<String>,
}

/// Failure modes of a status request
///
/// The monitor does not distinguish between them; they are collapsed into a
/// single `ConnectivityError` by the probe.
#[derive(Debug, thiserror::Error)]
pub enum QueryError {
    /// Host name could not be resolved
    #[error("DNS lookup failed: {0}")]
    Dns(String),

    /// No reply within the retry budget
    #[error("timed out after {attempts} attempt(s)")]
    Timeout {
        /// Attempts made before giving up
        attempts: u32,
    },

    /// The reply could not be parsed
    #[error("malformed reply: {0}")]
    Malformed(String),

    /// Socket level failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for status-query clients
///
/// # Thread Safety
///
/// Implementations are shared between monitors and called from the blocking
/// worker pool, so they must be `Send + Sync`.
///
/// # Retries
///
/// The `retries` parameter is the full retry budget for one call. Callers
/// never loop around `query`.
pub trait StatusQuery: Send + Sync {
    /// Perform one status request against `host:port`
    ///
    /// # Parameters
    ///
    /// - `host`: Host name or IP address
    /// - `port`: UDP port
    /// - `retries`: Number of attempts the client may make
    ///
    /// # Returns
    ///
    /// - `Ok(StatusResponse)`: The server answered
    /// - `Err(QueryError)`: No usable answer
    fn query(&self, host: &str, port: u16, retries: u32) -> Result<StatusResponse, QueryError>;
}
