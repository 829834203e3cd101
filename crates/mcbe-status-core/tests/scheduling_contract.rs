//! Contract Test: Scheduling & Shutdown
//!
//! Constraints verified:
//! - Setup runs one cycle before any timer fires
//! - The timer keeps cycling through probe failures
//! - stop() is safe to call repeatedly
//! - A cycle in flight when stop() is called is discarded, not applied
//!
//! If this test fails, monitors either show no state after setup or leak
//! work after teardown.

mod common;

use common::*;
use mcbe_status_core::{ConnectivityState, MonitorRegistry, MonitorSettings};
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio_test::assert_ok;

#[tokio::test]
async fn setup_runs_an_immediate_cycle() {
    let query = ScriptedQuery::always_down();
    let registry = assert_ok!(MonitorRegistry::new(query.clone(), MonitorSettings::default()));

    // 60s interval: nothing but the immediate cycle can run in this test
    let monitor = assert_ok!(registry.setup(test_config()).await);

    assert_eq!(monitor.connectivity(), ConnectivityState::Offline);
    assert_eq!(monitor.cycles(), 1);
    assert!(monitor.is_running());
    assert_eq!(query.calls(), 1);

    assert_ok!(registry.teardown(monitor.unique_id()).await);
}

#[tokio::test]
async fn first_timed_cycle_waits_one_interval() {
    let monitor = monitor_with(ScriptedQuery::always_up());

    assert_ok!(monitor.start(Duration::from_millis(300)));
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(monitor.cycles(), 0);
    assert_eq!(monitor.connectivity(), ConnectivityState::Uninitialized);
    assert!(monitor.stop_and_wait().await);
}

#[tokio::test]
async fn timer_keeps_cycling_through_failures() {
    let monitor = monitor_with(ScriptedQuery::always_down());
    let count = notification_counter(&monitor);

    assert_ok!(monitor.start(Duration::from_millis(20)));
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert!(monitor.is_running(), "probe failures must not stop the timer");
    assert!(monitor.stop_and_wait().await);

    let cycles = monitor.cycles();
    assert!(cycles >= 2, "Expected repeated cycles, got {}", cycles);
    assert_eq!(count.load(Ordering::SeqCst) as u64, cycles);

    // Nothing runs after stop
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(monitor.cycles(), cycles);
}

#[tokio::test]
async fn stop_is_idempotent_and_restartable() {
    let monitor = monitor_with(ScriptedQuery::always_up());

    assert!(!monitor.stop(), "stop before start is a no-op");

    assert_ok!(monitor.start(Duration::from_secs(60)));
    assert!(monitor.stop());
    assert!(!monitor.stop());
    assert!(!monitor.stop_and_wait().await);
    assert!(!monitor.is_running());

    assert_ok!(monitor.start(Duration::from_secs(60)));
    assert!(monitor.is_running());
    assert!(monitor.stop_and_wait().await);
}

#[tokio::test]
async fn stop_during_cycle_discards_result() {
    let query = ScriptedQuery::with_delay([], Reply::Down, Duration::from_millis(150));
    let monitor = monitor_with(query.clone());
    let count = notification_counter(&monitor);

    assert_ok!(monitor.start(Duration::from_millis(10)));

    // First tick at 10ms, its probe blocks until ~160ms
    tokio::time::sleep(Duration::from_millis(60)).await;
    assert_eq!(query.calls(), 1, "cycle should be in flight");

    assert!(monitor.stop_and_wait().await);

    assert_eq!(monitor.cycles(), 0);
    assert_eq!(monitor.connectivity(), ConnectivityState::Uninitialized);
    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert_eq!(query.calls(), 1);
}

#[tokio::test]
async fn teardown_stops_registered_monitor() {
    let query = ScriptedQuery::always_up();
    let settings = MonitorSettings {
        scan_interval_secs: 1,
        ..MonitorSettings::default()
    };
    let registry = assert_ok!(MonitorRegistry::new(query.clone(), settings));

    let monitor = assert_ok!(registry.setup(test_config()).await);
    let count = notification_counter(&monitor);
    assert_ok!(registry.teardown("bedrock.test-19132").await);

    tokio::time::sleep(Duration::from_millis(1200)).await;

    assert!(!monitor.is_running());
    assert_eq!(monitor.cycles(), 1);
    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert_eq!(query.calls(), 2);
}
