//! Server monitor
//!
//! The ServerMonitor is responsible for:
//! - Resolving the server endpoint once (SRV-style redirection)
//! - Probing connectivity and fetching metrics on a fixed interval
//! - Keeping the last-known [`ServerStatus`]
//! - Notifying subscribers once per completed cycle
//!
//! ## Cycle
//!
//! ```text
//!  timer / update()
//!        │
//!        ▼
//! ┌──────────────┐   once   ┌─────────────┐
//! │ ServerMonitor│─────────▶│ SrvResolver │
//! └──────────────┘          └─────────────┘
//!        │
//!        ├── probe ─────────▶ StatusProbe (connectivity)
//!        ├── probe ─────────▶ StatusProbe (metrics, only when online)
//!        │
//!        ├── apply: HealthTracker edges → log + MonitorEvent
//!        │
//!        └── notify ────────▶ subscribers / updates() stream
//! ```
//!
//! ## Overlapping cycles
//!
//! A cycle requested while another one is in flight is skipped
//! ([`CycleOutcome::Skipped`]); it neither probes nor notifies. The timer
//! skips missed ticks.
//!
//! ## Stopping
//!
//! [`ServerMonitor::stop`] never tears down an in-flight probe. The cycle
//! runs to completion and its result is dropped
//! ([`CycleOutcome::Discarded`]).

mod subscribers;

pub use subscribers::{Subscription, UpdateCallback};

use crate::config::{MonitorSettings, ServerConfig};
use crate::error::{ConnectivityError, Error, MetricsFetchError, Result};
use crate::probe::StatusProbe;
use crate::state::{
    ConnectivityEdge, ConnectivityState, HealthTracker, MetricsEdge, ServerIdentity, ServerStatus,
};
use crate::traits::{SrvResolver, StatusQuery, StatusResponse};
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use std::time::Duration;
use subscribers::SubscriberList;
use tokio::sync::{broadcast, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::wrappers::{BroadcastStream, WatchStream};
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, error, info, warn};

/// Events emitted by a ServerMonitor
#[derive(Debug, Clone, PartialEq)]
pub enum MonitorEvent {
    /// Server answered after being offline or never probed
    ConnectionEstablished {
        server: String,
        endpoint: String,
    },

    /// Server stopped answering
    ConnectionLost {
        server: String,
        endpoint: String,
        error: String,
    },

    /// Server did not answer the very first probe
    ServerUnreachable {
        server: String,
        endpoint: String,
        error: String,
    },

    /// First metrics fetch failure after a success
    MetricsFetchFailed {
        server: String,
        error: String,
    },

    /// First metrics fetch success after failures
    MetricsFetchRecovered {
        server: String,
    },

    /// A cycle was applied and subscribers were notified
    CycleCompleted {
        server: String,
        cycle: u64,
        connectivity: ConnectivityState,
    },

    /// Periodic updates armed
    Started {
        server: String,
        interval: Duration,
    },

    /// Periodic updates cancelled
    Stopped {
        server: String,
    },
}

/// Result of one call to [`ServerMonitor::update`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// State was updated and subscribers were notified
    Completed {
        cycle: u64,
        connectivity: ConnectivityState,
    },
    /// Another cycle was in flight
    Skipped,
    /// The monitor was stopped while the cycle was in flight
    Discarded,
}

struct MonitorState {
    tracker: HealthTracker,
    status: ServerStatus,
    cycles: u64,
}

struct TimerHandle {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

struct MonitorInner {
    unique_id: String,
    name: String,
    probe: StatusProbe,
    resolver: Arc<dyn SrvResolver>,
    identity: RwLock<ServerIdentity>,
    state: RwLock<MonitorState>,
    subscribers: SubscriberList,
    in_flight: AtomicBool,
    stop_generation: AtomicU64,
    event_tx: broadcast::Sender<MonitorEvent>,
    update_tx: watch::Sender<u64>,
}

/// Periodic status monitor of one Bedrock server
///
/// ## Lifecycle
///
/// 1. Create with [`ServerMonitor::new()`]
/// 2. Run one cycle with [`ServerMonitor::update()`] so observers see a real state
/// 3. Arm the timer with [`ServerMonitor::start()`]
/// 4. Cancel with [`ServerMonitor::stop()`] or [`ServerMonitor::stop_and_wait()`]
///
/// [`MonitorRegistry::setup`](crate::MonitorRegistry::setup) performs steps 1-3.
pub struct ServerMonitor {
    inner: Arc<MonitorInner>,
    timer: Mutex<Option<TimerHandle>>,
}

impl ServerMonitor {
    /// Create a new monitor
    ///
    /// # Parameters
    ///
    /// - `config`: Server configuration
    /// - `query`: Status-query client
    /// - `resolver`: SRV-style resolver, consulted once
    /// - `settings`: Shared monitor settings
    pub fn new(
        config: &ServerConfig,
        query: Arc<dyn StatusQuery>,
        resolver: Arc<dyn SrvResolver>,
        settings: &MonitorSettings,
    ) -> Result<Self> {
        config.validate()?;
        settings.validate()?;

        let (event_tx, _) = broadcast::channel(settings.event_channel_capacity);
        let (update_tx, _) = watch::channel(0);

        let inner = MonitorInner {
            unique_id: config.unique_id(),
            name: config.name.clone(),
            probe: StatusProbe::with_retries(query, settings.max_retries),
            resolver,
            identity: RwLock::new(ServerIdentity::new(&config.host, config.port)),
            state: RwLock::new(MonitorState {
                tracker: HealthTracker::new(),
                status: ServerStatus::default(),
                cycles: 0,
            }),
            subscribers: SubscriberList::default(),
            in_flight: AtomicBool::new(false),
            stop_generation: AtomicU64::new(0),
            event_tx,
            update_tx,
        };

        Ok(Self {
            inner: Arc::new(inner),
            timer: Mutex::new(None),
        })
    }

    /// Unique id of the monitored server
    pub fn unique_id(&self) -> &str {
        &self.inner.unique_id
    }

    /// Display name of the monitored server
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Endpoint currently probed
    pub fn identity(&self) -> ServerIdentity {
        read(&self.inner.identity).clone()
    }

    /// Snapshot of the last-known state
    pub fn status(&self) -> ServerStatus {
        read(&self.inner.state).status.clone()
    }

    /// Connectivity state of the last completed cycle
    pub fn connectivity(&self) -> ConnectivityState {
        read(&self.inner.state).tracker.connectivity()
    }

    /// Whether the server answered in the last completed cycle
    pub fn is_online(&self) -> bool {
        self.connectivity() == ConnectivityState::Online
    }

    /// Number of completed cycles
    pub fn cycles(&self) -> u64 {
        read(&self.inner.state).cycles
    }

    /// Number of registered update callbacks
    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.len()
    }

    /// Register a callback invoked after every completed cycle
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.inner.subscribers.subscribe(Arc::new(callback))
    }

    /// Stream of cycle numbers, one item per completed cycle
    ///
    /// A slow consumer only sees the latest cycle number.
    pub fn updates(&self) -> Pin<Box<dyn Stream<Item = u64> + Send + 'static>> {
        Box::pin(WatchStream::from_changes(self.inner.update_tx.subscribe()))
    }

    /// Receiver of monitor events
    pub fn subscribe_events(&self) -> broadcast::Receiver<MonitorEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Stream of monitor events
    ///
    /// Events missed by a lagging consumer are skipped.
    pub fn events(&self) -> Pin<Box<dyn Stream<Item = MonitorEvent> + Send + 'static>> {
        Box::pin(BroadcastStream::new(self.inner.event_tx.subscribe()).filter_map(|event| event.ok()))
    }

    /// Run one update cycle now
    pub async fn update(&self) -> CycleOutcome {
        self.inner.run_cycle().await
    }

    /// Whether the periodic timer is armed
    pub fn is_running(&self) -> bool {
        lock(&self.timer).is_some()
    }

    /// Arm the periodic timer
    ///
    /// The first timed cycle runs one `interval` after this call. Must be
    /// called from within a tokio runtime.
    pub fn start(&self, interval: Duration) -> Result<()> {
        if interval.is_zero() {
            return Err(Error::invalid_input("Update interval must be > 0"));
        }

        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| Error::Other(format!("No tokio runtime to schedule updates on: {}", e)))?;

        let mut timer = lock(&self.timer);
        if timer.is_some() {
            return Err(Error::already_running(&self.inner.unique_id));
        }

        let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();
        let inner = Arc::clone(&self.inner);

        let task = runtime.spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    biased;

                    _ = &mut shutdown_rx => break,

                    _ = ticker.tick() => {
                        inner.run_cycle().await;
                    }
                }
            }

            debug!("Periodic update of '{}' finished", inner.unique_id);
        });

        *timer = Some(TimerHandle { shutdown_tx, task });
        drop(timer);

        info!(
            "Started periodic update of '{}' every {:?}",
            self.inner.unique_id, interval
        );
        self.inner.emit_event(MonitorEvent::Started {
            server: self.inner.unique_id.clone(),
            interval,
        });

        Ok(())
    }

    /// Cancel the periodic timer
    ///
    /// Safe to call repeatedly; returns `true` only for the call that
    /// actually cancelled a running timer. An in-flight cycle finishes but
    /// its result is discarded.
    pub fn stop(&self) -> bool {
        self.cancel_timer().is_some()
    }

    /// Cancel the periodic timer and wait for its task to finish
    pub async fn stop_and_wait(&self) -> bool {
        let Some(task) = self.cancel_timer() else {
            return false;
        };

        if let Err(e) = task.await {
            error!("Periodic update task of '{}' failed: {}", self.inner.unique_id, e);
        }
        true
    }

    fn cancel_timer(&self) -> Option<JoinHandle<()>> {
        let handle = lock(&self.timer).take()?;

        self.inner.stop_generation.fetch_add(1, Ordering::AcqRel);
        // The task is gone already if the receiver was dropped
        let _ = handle.shutdown_tx.send(());

        info!("Stopped periodic update of '{}'", self.inner.unique_id);
        self.inner.emit_event(MonitorEvent::Stopped {
            server: self.inner.unique_id.clone(),
        });

        Some(handle.task)
    }
}

impl std::fmt::Debug for ServerMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerMonitor")
            .field("unique_id", &self.inner.unique_id)
            .field("identity", &self.identity())
            .field("connectivity", &self.connectivity())
            .field("running", &self.is_running())
            .finish()
    }
}

/// Clears the in-flight flag when a cycle ends, however it ends
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl MonitorInner {
    async fn run_cycle(&self) -> CycleOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("Update of '{}' still in progress, skipping cycle", self.unique_id);
            return CycleOutcome::Skipped;
        }
        let _guard = InFlightGuard(&self.in_flight);
        let generation = self.stop_generation.load(Ordering::Acquire);

        self.resolve_identity().await;
        let identity = read(&self.identity).clone();

        let connectivity = self.probe.probe(&identity).await;
        let metrics = if connectivity.is_ok() {
            Some(
                self.probe
                    .probe(&identity)
                    .await
                    .map_err(MetricsFetchError::from),
            )
        } else {
            None
        };

        if self.stop_generation.load(Ordering::Acquire) != generation {
            debug!(
                "Monitor of '{}' stopped during update, discarding result",
                self.unique_id
            );
            return CycleOutcome::Discarded;
        }

        let (cycle, connectivity, events) = self.apply(&identity, connectivity, metrics);
        for event in events {
            self.emit_event(event);
        }

        let delivered = self.subscribers.notify();
        self.update_tx.send_replace(cycle);
        debug!(
            "Cycle {} of '{}' applied, {} subscriber(s) notified",
            cycle, self.unique_id, delivered
        );
        self.emit_event(MonitorEvent::CycleCompleted {
            server: self.unique_id.clone(),
            cycle,
            connectivity,
        });

        CycleOutcome::Completed {
            cycle,
            connectivity,
        }
    }

    /// Resolve the endpoint once per monitor lifetime
    async fn resolve_identity(&self) {
        let host = {
            let mut identity = write(&self.identity);
            if !identity.begin_resolution() {
                return;
            }
            identity.host.clone()
        };

        // Resolver panics stay inside the lookup task
        let resolver = Arc::clone(&self.resolver);
        let lookup_host = host.clone();
        let lookup = tokio::spawn(async move { resolver.resolve(&lookup_host).await }).await;

        let target = match lookup {
            Ok(target) => target,
            Err(e) => {
                warn!("SRV lookup for '{}' failed, keeping configured endpoint: {}", host, e);
                None
            }
        };
        let Some(target) = target else {
            return;
        };

        if target.host.is_empty() || target.port == 0 {
            warn!(
                "Ignoring invalid SRV target '{}:{}' for '{}'",
                target.host, target.port, host
            );
            return;
        }

        debug!(
            "'{}' is a valid Minecraft SRV record ('{}:{}')",
            host, target.host, target.port
        );
        write(&self.identity).redirect(target);
    }

    /// Fold probe outcomes into the state
    fn apply(
        &self,
        identity: &ServerIdentity,
        connectivity: std::result::Result<StatusResponse, ConnectivityError>,
        metrics: Option<std::result::Result<StatusResponse, MetricsFetchError>>,
    ) -> (u64, ConnectivityState, Vec<MonitorEvent>) {
        let mut events = Vec::new();
        let server = self.unique_id.clone();
        let endpoint = identity.to_string();

        let mut state = write(&self.state);
        let state = &mut *state;

        match (state.tracker.record_probe(connectivity.is_ok()), &connectivity) {
            (Some(ConnectivityEdge::Established), _) => {
                info!("Connection to '{}' (re-)established", endpoint);
                events.push(MonitorEvent::ConnectionEstablished {
                    server: server.clone(),
                    endpoint: endpoint.clone(),
                });
            }
            (Some(ConnectivityEdge::Lost), Err(e)) => {
                warn!("Connection to '{}' lost: {}", endpoint, e.reason);
                events.push(MonitorEvent::ConnectionLost {
                    server: server.clone(),
                    endpoint: endpoint.clone(),
                    error: e.reason.clone(),
                });
            }
            (Some(ConnectivityEdge::Unreachable), Err(e)) => {
                warn!("Server '{}' is unreachable: {}", endpoint, e.reason);
                events.push(MonitorEvent::ServerUnreachable {
                    server: server.clone(),
                    endpoint: endpoint.clone(),
                    error: e.reason.clone(),
                });
            }
            _ => {}
        }

        match metrics {
            Some(Ok(response)) => {
                state.status.fill_metrics(&response);
                if state.tracker.record_metrics(true) == Some(MetricsEdge::Recovered) {
                    info!("Updating the properties of '{}' succeeded again", endpoint);
                    events.push(MonitorEvent::MetricsFetchRecovered {
                        server: server.clone(),
                    });
                }
            }
            Some(Err(e)) => {
                state.status.clear_metrics();
                if state.tracker.record_metrics(false) == Some(MetricsEdge::Failed) {
                    warn!("{}", e);
                    events.push(MonitorEvent::MetricsFetchFailed {
                        server: server.clone(),
                        error: e.reason,
                    });
                }
            }
            None => state.status.clear_metrics(),
        }

        state.status.connectivity = state.tracker.connectivity();
        state.status.online = state.status.connectivity == ConnectivityState::Online;
        state.status.last_request_failed = state.tracker.metrics_failed();
        state.status.last_updated = Some(chrono::Utc::now());
        state.cycles += 1;

        (state.cycles, state.status.connectivity, events)
    }

    fn emit_event(&self, event: MonitorEvent) {
        // No receivers is the normal case
        let _ = self.event_tx.send(event);
    }
}

fn read<T>(lock: &RwLock<T>) -> std::sync::RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> std::sync::RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
