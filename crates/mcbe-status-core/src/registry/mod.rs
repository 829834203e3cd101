//! Monitor registry
//!
//! The registry owns every running [`ServerMonitor`], keyed by the server's
//! unique id. It is an explicit value created by the host; there is no
//! process-wide singleton.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use mcbe_status_core::{MonitorRegistry, MonitorSettings, ServerConfig};
//!
//! let registry = MonitorRegistry::new(query, MonitorSettings::default())?;
//!
//! // Runs one cycle, then arms the periodic timer
//! let monitor = registry.setup(ServerConfig::new("Survival", "play.example.net")).await?;
//!
//! let subscription = registry.subscribe(monitor.unique_id(), || println!("updated"))?;
//!
//! // Cancels the timer and waits for it
//! registry.teardown(monitor.unique_id()).await?;
//! ```

use crate::config::{MonitorSettings, ServerConfig};
use crate::error::{Error, Result};
use crate::monitor::{ServerMonitor, Subscription};
use crate::traits::{NoSrvResolver, SrvResolver, StatusQuery};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

/// Registry of running monitors
///
/// ## Thread Safety
///
/// The map is guarded by a RwLock. The lock is never held across an await:
/// the initial cycle of a new monitor runs before it is inserted.
pub struct MonitorRegistry {
    /// Status-query client shared by every monitor
    query: Arc<dyn StatusQuery>,

    /// Resolver shared by every monitor
    resolver: Arc<dyn SrvResolver>,

    /// Settings applied to every monitor
    settings: MonitorSettings,

    /// Running monitors by unique id
    monitors: RwLock<HashMap<String, Arc<ServerMonitor>>>,
}

impl MonitorRegistry {
    /// Create an empty registry that never redirects hosts
    pub fn new(query: Arc<dyn StatusQuery>, settings: MonitorSettings) -> Result<Self> {
        settings.validate()?;

        Ok(Self {
            query,
            resolver: Arc::new(NoSrvResolver),
            settings,
            monitors: RwLock::new(HashMap::new()),
        })
    }

    /// Use `resolver` for monitors created from now on
    pub fn with_resolver(mut self, resolver: Arc<dyn SrvResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Settings applied to every monitor
    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    /// Create, prime and start a monitor for `config`
    ///
    /// The first cycle completes before this returns, so the returned
    /// monitor is never in the Uninitialized state.
    ///
    /// # Returns
    ///
    /// - `Ok(Arc<ServerMonitor>)`: The running monitor
    /// - `Err(Error)`: Invalid configuration, or the unique id is taken
    pub async fn setup(&self, config: ServerConfig) -> Result<Arc<ServerMonitor>> {
        config.validate()?;

        let unique_id = config.unique_id();
        if self.contains(&unique_id) {
            return Err(Error::already_registered(unique_id));
        }

        debug!(
            "Creating server instance for '{}' ({})",
            config.name, config.host
        );

        let monitor = Arc::new(ServerMonitor::new(
            &config,
            Arc::clone(&self.query),
            Arc::clone(&self.resolver),
            &self.settings,
        )?);

        monitor.update().await;
        monitor.start(self.settings.scan_interval())?;

        {
            let mut monitors = self.monitors.write().unwrap_or_else(PoisonError::into_inner);
            if monitors.contains_key(&unique_id) {
                // Lost a race against a concurrent setup of the same server
                monitor.stop();
                return Err(Error::already_registered(unique_id));
            }
            monitors.insert(unique_id.clone(), Arc::clone(&monitor));
        }

        info!("Monitoring '{}' ({})", config.name, monitor.identity());
        Ok(monitor)
    }

    /// Stop and remove the monitor registered under `unique_id`
    pub async fn teardown(&self, unique_id: &str) -> Result<()> {
        let monitor = self
            .monitors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(unique_id)
            .ok_or_else(|| Error::not_found(unique_id))?;

        monitor.stop_and_wait().await;
        info!("Stopped monitoring '{}'", unique_id);
        Ok(())
    }

    /// Stop and remove every monitor
    pub async fn shutdown(&self) {
        let monitors: Vec<_> = self
            .monitors
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();

        for (unique_id, monitor) in monitors {
            monitor.stop_and_wait().await;
            debug!("Stopped monitoring '{}'", unique_id);
        }
    }

    /// Monitor registered under `unique_id`
    pub fn get(&self, unique_id: &str) -> Option<Arc<ServerMonitor>> {
        self.monitors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(unique_id)
            .cloned()
    }

    /// Register an update callback on the monitor of `unique_id`
    pub fn subscribe<F>(&self, unique_id: &str, callback: F) -> Result<Subscription>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let monitor = self.get(unique_id).ok_or_else(|| Error::not_found(unique_id))?;
        Ok(monitor.subscribe(callback))
    }

    /// Check if a monitor is registered under `unique_id`
    pub fn contains(&self, unique_id: &str) -> bool {
        self.monitors
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(unique_id)
    }

    /// Unique ids of all registered monitors
    pub fn list(&self) -> Vec<String> {
        let monitors = self.monitors.read().unwrap_or_else(PoisonError::into_inner);
        monitors.keys().cloned().collect()
    }

    /// Number of registered monitors
    pub fn len(&self) -> usize {
        self.monitors.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Check if no monitor is registered
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for MonitorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MonitorRegistry")
            .field("settings", &self.settings)
            .field("monitors", &self.list())
            .finish_non_exhaustive()
    }
}
