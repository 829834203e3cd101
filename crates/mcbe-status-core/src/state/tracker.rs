// # Health Tracker
//
// Edge-triggered state machine behind the monitor's logging.
//
// Two independent dimensions are tracked:
//
// - connectivity: Uninitialized → {Online, Offline}
// - metrics: failed / not failed
//
// Every `record_*` call returns the edge it crossed, or `None` when the
// outcome repeats the previous one. Only edges are reported to the user, so
// steady-state failures stay silent.

use serde::{Deserialize, Serialize};

/// Reachability classification of a server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityState {
    /// No cycle has completed yet
    #[default]
    Uninitialized,
    /// The last probe succeeded
    Online,
    /// The last probe failed
    Offline,
}

/// Connectivity edge crossed by a probe outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEdge {
    /// Uninitialized or Offline → Online (info)
    Established,
    /// Online → Offline (warning)
    Lost,
    /// Uninitialized → Offline (warning)
    Unreachable,
}

/// Metrics edge crossed by a metrics fetch outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricsEdge {
    /// First failure after a success (warning)
    Failed,
    /// First success after failures (info)
    Recovered,
}

/// Connectivity × metrics-failed state machine
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HealthTracker {
    connectivity: ConnectivityState,
    metrics_failed: bool,
}

impl HealthTracker {
    /// Create a tracker in the Uninitialized state
    pub fn new() -> Self {
        Self::default()
    }

    /// Current connectivity state
    pub fn connectivity(&self) -> ConnectivityState {
        self.connectivity
    }

    /// Whether the last metrics fetch failed
    pub fn metrics_failed(&self) -> bool {
        self.metrics_failed
    }

    /// Record the outcome of a connectivity probe
    pub fn record_probe(&mut self, reachable: bool) -> Option<ConnectivityEdge> {
        let previous = self.connectivity;
        self.connectivity = if reachable {
            ConnectivityState::Online
        } else {
            ConnectivityState::Offline
        };

        match (previous, self.connectivity) {
            (ConnectivityState::Online, ConnectivityState::Offline) => Some(ConnectivityEdge::Lost),
            (ConnectivityState::Uninitialized, ConnectivityState::Offline) => {
                Some(ConnectivityEdge::Unreachable)
            }
            (ConnectivityState::Uninitialized | ConnectivityState::Offline, ConnectivityState::Online) => {
                Some(ConnectivityEdge::Established)
            }
            _ => None,
        }
    }

    /// Record the outcome of a metrics fetch
    pub fn record_metrics(&mut self, fetched: bool) -> Option<MetricsEdge> {
        let was_failed = self.metrics_failed;
        self.metrics_failed = !fetched;

        match (was_failed, fetched) {
            (false, false) => Some(MetricsEdge::Failed),
            (true, true) => Some(MetricsEdge::Recovered),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_uninitialized() {
        let tracker = HealthTracker::new();
        assert_eq!(tracker.connectivity(), ConnectivityState::Uninitialized);
        assert!(!tracker.metrics_failed());
    }

    #[test]
    fn fail_fail_success_reports_two_edges() {
        let mut tracker = HealthTracker::new();

        let edges: Vec<_> = [false, false, true]
            .into_iter()
            .map(|reachable| (tracker.record_probe(reachable), tracker.connectivity()))
            .collect();

        assert_eq!(
            edges,
            vec![
                (Some(ConnectivityEdge::Unreachable), ConnectivityState::Offline),
                (None, ConnectivityState::Offline),
                (Some(ConnectivityEdge::Established), ConnectivityState::Online),
            ]
        );
    }

    #[test]
    fn online_to_offline_is_a_loss() {
        let mut tracker = HealthTracker::new();
        assert_eq!(tracker.record_probe(true), Some(ConnectivityEdge::Established));
        assert_eq!(tracker.record_probe(true), None);
        assert_eq!(tracker.record_probe(false), Some(ConnectivityEdge::Lost));
        assert_eq!(tracker.record_probe(false), None);
    }

    #[test]
    fn metrics_failures_are_debounced() {
        for n in 1..=6 {
            let mut tracker = HealthTracker::new();
            let mut failed_edges = 0;
            for _ in 0..n {
                if tracker.record_metrics(false) == Some(MetricsEdge::Failed) {
                    failed_edges += 1;
                }
                assert!(tracker.metrics_failed());
            }
            assert_eq!(failed_edges, 1, "{} consecutive failures", n);

            assert_eq!(tracker.record_metrics(true), Some(MetricsEdge::Recovered));
            assert!(!tracker.metrics_failed());
            assert_eq!(tracker.record_metrics(true), None);
        }
    }

    #[test]
    fn first_metrics_success_is_silent() {
        let mut tracker = HealthTracker::new();
        assert_eq!(tracker.record_metrics(true), None);
    }
}
