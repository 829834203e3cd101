//! Test doubles and common utilities for monitor contract tests
//!
//! The doubles replace the two collaborators of the core: a scripted status
//! query and a counting resolver.

#![allow(dead_code)]

use mcbe_status_core::{
    MonitorEvent, MonitorSettings, QueryError, ServerConfig, ServerMonitor, SrvResolver, SrvTarget,
    StatusQuery, StatusResponse,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

/// Outcome of one scripted status request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    /// Server answers with this many players online
    Up(u32),
    /// Request times out
    Down,
}

/// Replies consumed by a cycle where the server is up and metrics load
pub fn cycle_up(players: u32) -> [Reply; 2] {
    [Reply::Up(players), Reply::Up(players)]
}

/// Replies consumed by a cycle where the server does not answer
pub fn cycle_down() -> [Reply; 1] {
    [Reply::Down]
}

/// Replies consumed by a cycle where connectivity works but metrics fail
pub fn cycle_metrics_fail() -> [Reply; 2] {
    [Reply::Up(0), Reply::Down]
}

/// Build a status reply
pub fn response(players: u32) -> StatusResponse {
    StatusResponse {
        version_brand: "MCPE".to_string(),
        protocol_version: 649,
        latency: Duration::from_millis(42),
        players_online: players,
        players_max: 30,
        motd: "Contract test server".to_string(),
        map_name: Some("Bedrock level".to_string()),
    }
}

/// A StatusQuery that replays a script, then repeats a fallback reply
pub struct ScriptedQuery {
    script: Mutex<VecDeque<Reply>>,
    fallback: Reply,
    delay: Duration,
    calls: AtomicUsize,
    endpoints: Mutex<Vec<(String, u16)>>,
}

impl ScriptedQuery {
    pub fn new(script: impl IntoIterator<Item = Reply>, fallback: Reply) -> Arc<Self> {
        Self::with_delay(script, fallback, Duration::ZERO)
    }

    /// Every request blocks for `delay` before replying
    pub fn with_delay(
        script: impl IntoIterator<Item = Reply>,
        fallback: Reply,
        delay: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into_iter().collect()),
            fallback,
            delay,
            calls: AtomicUsize::new(0),
            endpoints: Mutex::new(Vec::new()),
        })
    }

    /// Always answer
    pub fn always_up() -> Arc<Self> {
        Self::new([], Reply::Up(1))
    }

    /// Never answer
    pub fn always_down() -> Arc<Self> {
        Self::new([], Reply::Down)
    }

    /// Get the number of requests made
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Get the endpoints that were queried, in order
    pub fn endpoints(&self) -> Vec<(String, u16)> {
        self.endpoints.lock().unwrap().clone()
    }
}

impl StatusQuery for ScriptedQuery {
    fn query(&self, host: &str, port: u16, retries: u32) -> Result<StatusResponse, QueryError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.endpoints.lock().unwrap().push((host.to_string(), port));

        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        let reply = self.script.lock().unwrap().pop_front().unwrap_or(self.fallback);
        match reply {
            Reply::Up(players) => Ok(response(players)),
            Reply::Down => Err(QueryError::Timeout { attempts: retries }),
        }
    }
}

/// A resolver that counts lookups and returns a fixed answer
pub struct CountingResolver {
    target: Option<SrvTarget>,
    calls: AtomicUsize,
}

impl CountingResolver {
    pub fn new(target: Option<SrvTarget>) -> Arc<Self> {
        Arc::new(Self {
            target,
            calls: AtomicUsize::new(0),
        })
    }

    /// Get the number of lookups
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SrvResolver for CountingResolver {
    async fn resolve(&self, _host: &str) -> Option<SrvTarget> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.target.clone()
    }
}

/// Configuration of the server every contract test monitors
pub fn test_config() -> ServerConfig {
    ServerConfig::new("Contract", "bedrock.test").with_port(19132)
}

/// Create a monitor without SRV redirection
pub fn monitor_with(query: Arc<ScriptedQuery>) -> ServerMonitor {
    monitor_with_resolver(query, CountingResolver::new(None))
}

/// Create a monitor with a specific resolver
pub fn monitor_with_resolver<R>(query: Arc<ScriptedQuery>, resolver: Arc<R>) -> ServerMonitor
where
    R: SrvResolver + 'static,
{
    ServerMonitor::new(&test_config(), query, resolver, &MonitorSettings::default())
        .expect("monitor construction succeeds")
}

/// Counter subscribed to a monitor's update notifications
pub fn notification_counter(monitor: &ServerMonitor) -> Arc<AtomicUsize> {
    let count = Arc::new(AtomicUsize::new(0));
    let cloned = Arc::clone(&count);
    let _subscription = monitor.subscribe(move || {
        cloned.fetch_add(1, Ordering::SeqCst);
    });
    count
}

/// Collect the user-facing (logged) events received so far
///
/// Cycle bookkeeping events are left out.
pub fn drain_log_events(rx: &mut broadcast::Receiver<MonitorEvent>) -> Vec<MonitorEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        match event {
            MonitorEvent::CycleCompleted { .. }
            | MonitorEvent::Started { .. }
            | MonitorEvent::Stopped { .. } => {}
            other => events.push(other),
        }
    }
    events
}
