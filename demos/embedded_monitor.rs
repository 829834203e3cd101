// # Embedded Monitor Demo
//
// Runs a MonitorRegistry against a simulated Bedrock server that goes down
// and comes back on a fixed schedule, so every state transition and log
// message of the monitor shows up within a short run.
//
// ## Configuration
//
// - `MCBE_LOG_LEVEL`: trace, debug, info, warn, error (default: info)
// - `MCBE_NAME`: Display name (default: "Demo Server")
// - `MCBE_HOST`: Host name (default: "play.example.net")
// - `MCBE_PORT`: Port (default: 19132)
// - `MCBE_SCAN_INTERVAL_SECS`: Seconds between cycles (default: 1)
// - `MCBE_RUN_SECS`: How long to run before tearing down (default: 12)
//
// ## Example
//
// ```bash
// MCBE_LOG_LEVEL=debug MCBE_SCAN_INTERVAL_SECS=2 cargo run -p mcbe-status-demos
// ```

use anyhow::{Context, Result};
use async_trait::async_trait;
use mcbe_status_core::{
    MonitorEvent, MonitorRegistry, MonitorSettings, QueryError, ServerConfig, SrvResolver,
    SrvTarget, StatusQuery, StatusResponse,
};
use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;
use tokio_stream::StreamExt;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Simulated server following a repeating schedule of phases
///
/// Each request advances the clock by one. Per period of 12 requests:
/// requests 0-5 answer, 6-7 answer the first request of a cycle but fail
/// the metrics fetch, 8-11 time out.
struct SimulatedServer {
    requests: AtomicU64,
}

impl SimulatedServer {
    fn new() -> Self {
        Self {
            requests: AtomicU64::new(0),
        }
    }
}

impl StatusQuery for SimulatedServer {
    fn query(&self, host: &str, port: u16, retries: u32) -> Result<StatusResponse, QueryError> {
        let tick = self.requests.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(Duration::from_millis(20));

        match tick % 12 {
            0..=5 => Ok(StatusResponse {
                version_brand: "MCPE".to_string(),
                protocol_version: 649,
                latency: Duration::from_micros(18_250 + tick % 7 * 1_000),
                players_online: (tick % 5) as u32,
                players_max: 20,
                motd: format!("Simulated server at {}:{}", host, port),
                map_name: Some("Bedrock level".to_string()),
            }),
            6 | 7 => Err(QueryError::Malformed("truncated pong".to_string())),
            _ => Err(QueryError::Timeout {
                attempts: retries + 1,
            }),
        }
    }
}

/// Resolver redirecting every host to a fixed node
struct StaticResolver {
    target: SrvTarget,
}

#[async_trait]
impl SrvResolver for StaticResolver {
    async fn resolve(&self, host: &str) -> Option<SrvTarget> {
        tracing::debug!("Looking up SRV record of '{}'", host);
        Some(self.target.clone())
    }
}

struct DemoConfig {
    log_level: String,
    server: ServerConfig,
    scan_interval_secs: u64,
    run_for: Duration,
}

impl DemoConfig {
    fn from_env() -> Result<Self> {
        let name = env::var("MCBE_NAME").unwrap_or_else(|_| "Demo Server".to_string());
        let host = env::var("MCBE_HOST").unwrap_or_else(|_| "play.example.net".to_string());
        let port = env_or("MCBE_PORT", mcbe_status_core::config::DEFAULT_PORT)?;

        Ok(Self {
            log_level: env::var("MCBE_LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            server: ServerConfig::new(name, host).with_port(port),
            scan_interval_secs: env_or("MCBE_SCAN_INTERVAL_SECS", 1)?,
            run_for: Duration::from_secs(env_or("MCBE_RUN_SECS", 12)?),
        })
    }
}

fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(value) => value
            .parse()
            .with_context(|| format!("{} '{}' is not valid", key, value)),
        Err(_) => Ok(default),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = DemoConfig::from_env()?;

    let log_level = match config.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    println!("=== MCBE Status Embedded Monitor ===\n");

    // Step 1: Create the registry
    println!("1. Creating registry...");
    let settings = MonitorSettings {
        scan_interval_secs: config.scan_interval_secs,
        ..MonitorSettings::default()
    };
    let resolver = StaticResolver {
        target: SrvTarget::new(format!("node1.{}", config.server.host), config.server.port),
    };
    let registry = MonitorRegistry::new(Arc::new(SimulatedServer::new()), settings)?
        .with_resolver(Arc::new(resolver));
    println!("   ✓ Registry created\n");

    // Step 2: Set up the monitor (runs the first cycle immediately)
    println!("2. Setting up '{}'...", config.server.name);
    let monitor = registry.setup(config.server.clone()).await?;
    println!(
        "   ✓ Monitoring {} as '{}' ({:?})\n",
        monitor.identity(),
        monitor.unique_id(),
        monitor.connectivity()
    );

    // Step 3: Subscribe to updates
    println!("3. Subscribing to updates...");
    let notified = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&notified);
    let subscription = registry.subscribe(monitor.unique_id(), move || {
        counter.fetch_add(1, Ordering::SeqCst);
    })?;

    let mut events = monitor.events();
    let listener = tokio::spawn(async move {
        while let Some(event) = events.next().await {
            match event {
                MonitorEvent::ConnectionEstablished { endpoint, .. } => {
                    println!("   [EVENT] {} is online", endpoint);
                }
                MonitorEvent::ConnectionLost { endpoint, error, .. } => {
                    println!("   [EVENT] {} went offline: {}", endpoint, error);
                }
                MonitorEvent::ServerUnreachable { endpoint, error, .. } => {
                    println!("   [EVENT] {} is unreachable: {}", endpoint, error);
                }
                MonitorEvent::MetricsFetchFailed { error, .. } => {
                    println!("   [EVENT] Metrics fetch failed: {}", error);
                }
                MonitorEvent::MetricsFetchRecovered { .. } => {
                    println!("   [EVENT] Metrics fetch recovered");
                }
                MonitorEvent::CycleCompleted {
                    cycle,
                    connectivity,
                    ..
                } => {
                    println!("   [EVENT] Cycle {} completed ({:?})", cycle, connectivity);
                }
                MonitorEvent::Started { .. } => {}
                MonitorEvent::Stopped { server } => {
                    println!("   [EVENT] Monitor of '{}' stopped", server);
                    break;
                }
            }
        }
    });
    println!("   ✓ Subscribed\n");

    // Step 4: Let the timer run
    println!("4. Running for {:?}...\n", config.run_for);
    tokio::time::sleep(config.run_for).await;

    // Step 5: Print the last-known state
    println!("\n5. Last-known state:");
    println!("{}", serde_json::to_string_pretty(&monitor.status())?);
    println!(
        "   Cycles: {}, notifications: {}\n",
        monitor.cycles(),
        notified.load(Ordering::SeqCst)
    );

    // Step 6: Tear down
    println!("6. Tearing down...");
    subscription.unsubscribe();
    registry.teardown(monitor.unique_id()).await?;
    registry.shutdown().await;
    if let Err(e) = listener.await {
        tracing::error!("Event listener failed: {}", e);
    }
    println!("   ✓ Stopped\n");

    println!("=== Demo Complete ===");
    Ok(())
}
