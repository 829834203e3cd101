//! Collaborator traits
//!
//! - [`StatusQuery`]: Wire-protocol client performing the status request
//! - [`SrvResolver`]: One-time host/port redirection lookup

pub mod status_query;
pub mod srv_resolver;

pub use status_query::{QueryError, StatusQuery, StatusResponse};
pub use srv_resolver::{NoSrvResolver, SrvResolver, SrvTarget};
