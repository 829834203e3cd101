// # Server State Records
//
// `ServerIdentity` is the endpoint a monitor probes; `ServerStatus` is the
// last-known state exposed to subscribers. Both are owned by the monitor and
// handed out as clones.

use crate::state::tracker::ConnectivityState;
use crate::traits::{SrvTarget, StatusResponse};
use serde::{Deserialize, Serialize};

/// Endpoint of a monitored server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerIdentity {
    /// Host name or IP address
    pub host: String,
    /// UDP port
    pub port: u16,
    /// Whether SRV-style resolution was already attempted
    pub resolved: bool,
}

impl ServerIdentity {
    /// Create an identity that has not been resolved yet
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            resolved: false,
        }
    }

    /// Mark resolution as attempted
    ///
    /// Returns `false` when it was already attempted, in which case the
    /// caller must not resolve again.
    pub(crate) fn begin_resolution(&mut self) -> bool {
        !std::mem::replace(&mut self.resolved, true)
    }

    /// Point the identity at a resolved target
    pub(crate) fn redirect(&mut self, target: SrvTarget) {
        self.host = target.host;
        self.port = target.port;
    }
}

impl std::fmt::Display for ServerIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Last-known state of a server
///
/// When `online` is false every metric field is `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerStatus {
    /// Connectivity state
    pub connectivity: ConnectivityState,
    /// Whether the server answered the last probe
    pub online: bool,
    /// Version brand
    pub version: Option<String>,
    /// Network protocol version
    pub protocol_version: Option<i32>,
    /// Round-trip latency in milliseconds
    pub latency_ms: Option<f64>,
    /// Players online
    pub players_online: Option<u32>,
    /// Player slots
    pub players_max: Option<u32>,
    /// Message of the day
    pub motd: Option<String>,
    /// Name of the loaded world
    pub map_name: Option<String>,
    /// Whether the last metrics fetch failed
    pub last_request_failed: bool,
    /// Completion time of the last applied cycle
    pub last_updated: Option<chrono::DateTime<chrono::Utc>>,
}

impl ServerStatus {
    /// Copy the metrics of a status reply
    pub(crate) fn fill_metrics(&mut self, response: &StatusResponse) {
        self.version = Some(response.version_brand.clone());
        self.protocol_version = Some(response.protocol_version);
        self.latency_ms = Some(latency_ms(response.latency));
        self.players_online = Some(response.players_online);
        self.players_max = Some(response.players_max);
        self.motd = Some(response.motd.clone());
        self.map_name = response.map_name.clone();
    }

    /// Set every metric field to unknown
    pub(crate) fn clear_metrics(&mut self) {
        self.version = None;
        self.protocol_version = None;
        self.latency_ms = None;
        self.players_online = None;
        self.players_max = None;
        self.motd = None;
        self.map_name = None;
    }

    /// Whether any metric field is set
    pub fn has_metrics(&self) -> bool {
        self.version.is_some()
            || self.protocol_version.is_some()
            || self.latency_ms.is_some()
            || self.players_online.is_some()
            || self.players_max.is_some()
            || self.motd.is_some()
            || self.map_name.is_some()
    }
}

/// Milliseconds rounded to three decimals
fn latency_ms(latency: std::time::Duration) -> f64 {
    (latency.as_secs_f64() * 1_000_000.0).round() / 1_000.0
}
