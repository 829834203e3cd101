// # mcbe-status-core
//
// Core library for monitoring Minecraft Bedrock servers through their
// connectionless status protocol.
//
// ## Architecture Overview
//
// - **StatusQuery**: Trait for the wire-protocol client (blocking, external)
// - **SrvResolver**: Trait for the one-time host/port redirection lookup
// - **StatusProbe**: One status round trip, run on the blocking pool
// - **ServerMonitor**: Periodic probing, last-known state, debounced logging
//   and subscriber notification
// - **MonitorRegistry**: Explicit owner of all running monitors
//
// ## Design Principles
//
// 1. **Collaborators behind traits**: The wire format and DNS lookups are not
//    part of the core
// 2. **Edge-triggered reporting**: Only state changes are logged
// 3. **Never fatal**: A failed probe changes state, it never stops a monitor
// 4. **Library-First**: The host owns the registry and the runtime

pub mod config;
pub mod error;
pub mod monitor;
pub mod probe;
pub mod registry;
pub mod state;
pub mod traits;

// Re-export core types for convenience
pub use config::{MonitorSettings, ServerConfig, StoredConfig, migrate_stored_config};
pub use error::{ConnectivityError, Error, MetricsFetchError, Result};
pub use monitor::{CycleOutcome, MonitorEvent, ServerMonitor, Subscription};
pub use probe::{MAX_RETRIES_STATUS, StatusProbe};
pub use registry::MonitorRegistry;
pub use state::{ConnectivityState, HealthTracker, ServerIdentity, ServerStatus};
pub use traits::{NoSrvResolver, QueryError, SrvResolver, SrvTarget, StatusQuery, StatusResponse};
