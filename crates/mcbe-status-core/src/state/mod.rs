//! Monitor state
//!
//! - [`ServerIdentity`] and [`ServerStatus`]: the records a monitor owns
//! - [`HealthTracker`]: edge detection for connectivity and metrics outcomes

pub mod status;
pub mod tracker;

pub use status::{ServerIdentity, ServerStatus};
pub use tracker::{ConnectivityEdge, ConnectivityState, HealthTracker, MetricsEdge};
