//! Single status probe
//!
//! [`StatusProbe`] performs exactly one status request through the
//! [`StatusQuery`] collaborator. The collaborator blocks, so the call is
//! dispatched onto tokio's blocking pool and awaited; the result is handed
//! back to the calling task.
//!
//! Every failure, including a panic inside the collaborator, comes back as a
//! [`ConnectivityError`].

use crate::error::ConnectivityError;
use crate::state::ServerIdentity;
use crate::traits::{StatusQuery, StatusResponse};
use std::sync::Arc;
use tracing::debug;

/// Retry budget handed to the status query by default
pub const MAX_RETRIES_STATUS: u32 = 3;

/// Performs single status round trips against a server
#[derive(Clone)]
pub struct StatusProbe {
    query: Arc<dyn StatusQuery>,
    retries: u32,
}

impl StatusProbe {
    /// Create a probe with the default retry budget
    pub fn new(query: Arc<dyn StatusQuery>) -> Self {
        Self::with_retries(query, MAX_RETRIES_STATUS)
    }

    /// Create a probe with a custom retry budget
    pub fn with_retries(query: Arc<dyn StatusQuery>, retries: u32) -> Self {
        Self { query, retries }
    }

    /// Query `identity` once
    pub async fn probe(&self, identity: &ServerIdentity) -> Result<StatusResponse, ConnectivityError> {
        let query = Arc::clone(&self.query);
        let host = identity.host.clone();
        let port = identity.port;
        let retries = self.retries;

        let outcome = tokio::task::spawn_blocking(move || query.query(&host, port, retries)).await;

        match outcome {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => {
                debug!(
                    "Error occurred while querying '{}:{}': {}",
                    identity.host, identity.port, e
                );
                Err(ConnectivityError::new(&identity.host, identity.port, e.to_string()))
            }
            Err(join_error) => {
                debug!(
                    "Status query task for '{}:{}' did not complete: {}",
                    identity.host, identity.port, join_error
                );
                Err(ConnectivityError::new(
                    &identity.host,
                    identity.port,
                    format!("status query aborted: {}", join_error),
                ))
            }
        }
    }
}

impl std::fmt::Debug for StatusProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusProbe")
            .field("retries", &self.retries)
            .finish_non_exhaustive()
    }
}
