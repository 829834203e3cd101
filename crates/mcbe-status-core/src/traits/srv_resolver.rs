// # SRV Resolver Trait
//
// Defines the interface of the one-time lookup that may redirect a
// configured host to another host/port (an SRV-style record) before the
// first real probe.

use async_trait::async_trait;

/// Endpoint discovered by a resolver
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SrvTarget {
    /// Target host
    pub host: String,
    /// Target port
    pub port: u16,
}

impl SrvTarget {
    /// Create a new target
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

/// Trait for SRV-style resolvers
///
/// Lookup failures are not errors for the monitor: a resolver that cannot
/// find a record simply returns `None` and the configured host/port is kept.
/// Each monitor calls `resolve` at most once in its lifetime.
#[async_trait]
pub trait SrvResolver: Send + Sync {
    /// Look up an alternate endpoint for `host`
    async fn resolve(&self, host: &str) -> Option<SrvTarget>;
}

/// Resolver that never redirects
#[derive(Debug, Clone, Copy, Default)]
pub struct NoSrvResolver;

#[async_trait]
impl SrvResolver for NoSrvResolver {
    async fn resolve(&self, _host: &str) -> Option<SrvTarget> {
        None
    }
}
