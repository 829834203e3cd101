//! Configuration types for the status monitor
//!
//! This module defines the per-server configuration entry, the monitor
//! settings shared by every server, and the one-time schema migration of
//! stored configuration entries.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default UDP port of a Bedrock server
pub const DEFAULT_PORT: u16 = 19132;

/// Current schema version of stored configuration entries
pub const CONFIG_VERSION: u32 = 2;

/// Configuration of one monitored server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Display name of the server
    pub name: String,

    /// Host name or IP address
    pub host: String,

    /// UDP port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Unique id used as registry key (defaults to `host-port`)
    #[serde(default)]
    pub unique_id: Option<String>,
}

impl ServerConfig {
    /// Create a new server configuration on the default port
    pub fn new(name: impl Into<String>, host: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            port: DEFAULT_PORT,
            unique_id: None,
        }
    }

    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set an explicit unique id
    pub fn with_unique_id(mut self, unique_id: impl Into<String>) -> Self {
        self.unique_id = Some(unique_id.into());
        self
    }

    /// Registry key of this server
    pub fn unique_id(&self) -> String {
        match &self.unique_id {
            Some(id) => id.clone(),
            None => format!("{}-{}", self.host.to_lowercase(), self.port),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.name.trim().is_empty() {
            return Err(crate::Error::config("Server name cannot be empty"));
        }
        if self.host.trim().is_empty() {
            return Err(crate::Error::config("Server host cannot be empty"));
        }
        if self.host.chars().any(char::is_whitespace) {
            return Err(crate::Error::config(format!(
                "Server host contains whitespace: '{}'",
                self.host
            )));
        }
        if self.port == 0 {
            return Err(crate::Error::config("Server port must be between 1 and 65535"));
        }
        if matches!(&self.unique_id, Some(id) if id.is_empty()) {
            return Err(crate::Error::config("Unique id cannot be empty"));
        }
        Ok(())
    }
}

/// Settings shared by every monitor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// Interval between two update cycles (in seconds)
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,

    /// Retry budget handed to the status query for every probe
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Capacity of the broadcast channel carrying monitor events
    ///
    /// Slow event consumers skip events instead of blocking the monitor.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl MonitorSettings {
    /// Interval between two update cycles
    pub fn scan_interval(&self) -> Duration {
        Duration::from_secs(self.scan_interval_secs)
    }

    /// Validate the settings
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.scan_interval_secs == 0 {
            return Err(crate::Error::config("Scan interval must be > 0"));
        }
        if self.max_retries == 0 {
            return Err(crate::Error::config("Max retries must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }
        Ok(())
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            scan_interval_secs: default_scan_interval_secs(),
            max_retries: default_max_retries(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

/// A configuration entry as handed over by the host's config storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredConfig {
    /// Schema version of `data`
    pub version: u32,

    /// Raw entry data
    pub data: serde_json::Value,
}

/// Upgrade a stored configuration entry to [`CONFIG_VERSION`]
///
/// Version 1 entries may carry arbitrary extra keys; version 2 keeps only
/// `name`, `host` and `port`. Entries already at the current version are
/// returned unchanged.
pub fn migrate_stored_config(entry: StoredConfig) -> Result<StoredConfig, crate::Error> {
    tracing::debug!("Migrating configuration from version {}", entry.version);

    let migrated = match entry.version {
        1 => {
            let name = entry
                .data
                .get("name")
                .cloned()
                .ok_or_else(|| crate::Error::config("Stored entry is missing 'name'"))?;
            let host = entry
                .data
                .get("host")
                .cloned()
                .ok_or_else(|| crate::Error::config("Stored entry is missing 'host'"))?;
            let port = entry
                .data
                .get("port")
                .cloned()
                .unwrap_or_else(|| serde_json::json!(DEFAULT_PORT));

            StoredConfig {
                version: CONFIG_VERSION,
                data: serde_json::json!({ "name": name, "host": host, "port": port }),
            }
        }
        CONFIG_VERSION => entry,
        other => {
            return Err(crate::Error::config(format!(
                "Unsupported configuration version {} (newest known: {})",
                other, CONFIG_VERSION
            )));
        }
    };

    tracing::info!("Migration to version {} successful", migrated.version);
    Ok(migrated)
}

impl TryFrom<StoredConfig> for ServerConfig {
    type Error = crate::Error;

    fn try_from(entry: StoredConfig) -> Result<Self, Self::Error> {
        let entry = migrate_stored_config(entry)?;
        let config: ServerConfig = serde_json::from_value(entry.data)?;
        config.validate()?;
        Ok(config)
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_scan_interval_secs() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

fn default_event_channel_capacity() -> usize {
    100
}
