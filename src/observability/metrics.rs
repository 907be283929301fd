//! Thread-safe metrics collection
//!
//! Atomic counters for high-frequency request outcomes, mutex-protected maps for
//! per-agent and per-kind breakdowns. One process-wide collector is reachable
//! through [`metrics()`]; tests build their own with [`MetricsCollector::new`].

use crate::agent::triage::RouteKind;
use crate::error::FailureKind;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

/// Processing-time samples kept for percentile calculation
const MAX_PROCESSING_SAMPLES: usize = 1000;

/// Global metrics collector instance
pub static METRICS: Lazy<MetricsCollector> = Lazy::new(MetricsCollector::new);

/// Get reference to global metrics collector
pub fn metrics() -> &'static MetricsCollector {
    &METRICS
}

pub struct MetricsCollector {
    requests_received: AtomicU64,
    requests_succeeded: AtomicU64,
    requests_failed: AtomicU64,
    direct_routes: AtomicU64,
    fallback_routes: AtomicU64,
    unresolved_routes: AtomicU64,
    started_at: AtomicU64,

    processing_times: Mutex<Vec<u64>>, // in milliseconds
    failures_by_kind: Mutex<HashMap<FailureKind, u64>>,
    routes_by_agent: Mutex<HashMap<String, u64>>,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            requests_received: AtomicU64::new(0),
            requests_succeeded: AtomicU64::new(0),
            requests_failed: AtomicU64::new(0),
            direct_routes: AtomicU64::new(0),
            fallback_routes: AtomicU64::new(0),
            unresolved_routes: AtomicU64::new(0),
            started_at: AtomicU64::new(current_timestamp()),
            processing_times: Mutex::new(Vec::new()),
            failures_by_kind: Mutex::new(HashMap::new()),
            routes_by_agent: Mutex::new(HashMap::new()),
        }
    }

    // Request outcomes
    pub fn request_received(&self) {
        self.requests_received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request_succeeded(&self, elapsed_ms: u64) {
        self.requests_succeeded.fetch_add(1, Ordering::Relaxed);
        self.record_processing_time(elapsed_ms);
    }

    pub fn request_failed(&self, kind: FailureKind, elapsed_ms: u64) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut failures) = self.failures_by_kind.lock() {
            *failures.entry(kind).or_insert(0) += 1;
        }
        self.record_processing_time(elapsed_ms);
    }

    // Routing decisions
    pub fn record_route(&self, agent_name: &str, route: RouteKind) {
        match route {
            RouteKind::Direct => self.direct_routes.fetch_add(1, Ordering::Relaxed),
            RouteKind::Fallback => self.fallback_routes.fetch_add(1, Ordering::Relaxed),
        };
        if let Ok(mut routes) = self.routes_by_agent.lock() {
            *routes.entry(agent_name.to_string()).or_insert(0) += 1;
        }
    }

    /// Neither the routed agent nor the fallback could be resolved
    pub fn record_unresolved_route(&self) {
        self.unresolved_routes.fetch_add(1, Ordering::Relaxed);
    }

    fn record_processing_time(&self, elapsed_ms: u64) {
        if let Ok(mut times) = self.processing_times.lock() {
            times.push(elapsed_ms);
            if times.len() > MAX_PROCESSING_SAMPLES {
                times.remove(0);
            }
        }
    }

    /// Reset all metrics (useful for testing)
    pub fn reset(&self) {
        self.requests_received.store(0, Ordering::Relaxed);
        self.requests_succeeded.store(0, Ordering::Relaxed);
        self.requests_failed.store(0, Ordering::Relaxed);
        self.direct_routes.store(0, Ordering::Relaxed);
        self.fallback_routes.store(0, Ordering::Relaxed);
        self.unresolved_routes.store(0, Ordering::Relaxed);
        self.started_at.store(current_timestamp(), Ordering::Relaxed);

        if let Ok(mut times) = self.processing_times.lock() {
            times.clear();
        }
        if let Ok(mut failures) = self.failures_by_kind.lock() {
            failures.clear();
        }
        if let Ok(mut routes) = self.routes_by_agent.lock() {
            routes.clear();
        }
    }

    fn processing_time_statistics(&self) -> (f64, f64, f64) {
        let Ok(times) = self.processing_times.lock() else {
            return (0.0, 0.0, 0.0);
        };
        if times.is_empty() {
            return (0.0, 0.0, 0.0);
        }

        let mut sorted_times = times.clone();
        sorted_times.sort_unstable();

        let avg = sorted_times.iter().sum::<u64>() as f64 / sorted_times.len() as f64;
        (
            avg,
            percentile(&sorted_times, 50.0),
            percentile(&sorted_times, 95.0),
        )
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let now = current_timestamp();
        let (avg, p50, p95) = self.processing_time_statistics();

        let failures_by_kind: BTreeMap<String, u64> = self
            .failures_by_kind
            .lock()
            .map(|failures| {
                failures
                    .iter()
                    .map(|(kind, count)| (kind.as_str().to_string(), *count))
                    .collect()
            })
            .unwrap_or_default();

        let routes_by_agent: BTreeMap<String, u64> = self
            .routes_by_agent
            .lock()
            .map(|routes| routes.iter().map(|(k, v)| (k.clone(), *v)).collect())
            .unwrap_or_default();

        MetricsSnapshot {
            requests_received: self.requests_received.load(Ordering::Relaxed),
            requests_succeeded: self.requests_succeeded.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            direct_routes: self.direct_routes.load(Ordering::Relaxed),
            fallback_routes: self.fallback_routes.load(Ordering::Relaxed),
            unresolved_routes: self.unresolved_routes.load(Ordering::Relaxed),
            failures_by_kind,
            routes_by_agent,
            avg_processing_time_ms: avg,
            processing_time_p50_ms: p50,
            processing_time_p95_ms: p95,
            uptime_seconds: now.saturating_sub(self.started_at.load(Ordering::Relaxed)),
            timestamp: now,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Point-in-time view of the collector
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub requests_received: u64,
    pub requests_succeeded: u64,
    pub requests_failed: u64,
    pub direct_routes: u64,
    pub fallback_routes: u64,
    pub unresolved_routes: u64,
    pub failures_by_kind: BTreeMap<String, u64>,
    pub routes_by_agent: BTreeMap<String, u64>,
    pub avg_processing_time_ms: f64,
    pub processing_time_p50_ms: f64,
    pub processing_time_p95_ms: f64,
    pub uptime_seconds: u64,
    pub timestamp: u64,
}

fn current_timestamp() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn percentile(sorted_data: &[u64], percentile: f64) -> f64 {
    if sorted_data.is_empty() {
        return 0.0;
    }

    let index = (percentile / 100.0) * (sorted_data.len() - 1) as f64;
    let lower = sorted_data[index.floor() as usize] as f64;
    let upper = sorted_data[index.ceil() as usize] as f64;
    lower + (upper - lower) * index.fract()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_counters() {
        let collector = MetricsCollector::new();
        collector.request_received();
        collector.request_received();
        collector.request_succeeded(10);
        collector.request_failed(FailureKind::AgentNotFound, 30);

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.requests_received, 2);
        assert_eq!(snapshot.requests_succeeded, 1);
        assert_eq!(snapshot.requests_failed, 1);
        assert_eq!(snapshot.failures_by_kind.get("agent_not_found"), Some(&1));
        assert_eq!(snapshot.avg_processing_time_ms, 20.0);
    }

    #[test]
    fn test_route_counters() {
        let collector = MetricsCollector::new();
        collector.record_route("help-agent", RouteKind::Direct);
        collector.record_route("help-agent", RouteKind::Fallback);
        collector.record_route("data-agent", RouteKind::Direct);
        collector.record_unresolved_route();

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.direct_routes, 2);
        assert_eq!(snapshot.fallback_routes, 1);
        assert_eq!(snapshot.unresolved_routes, 1);
        assert_eq!(snapshot.routes_by_agent.get("help-agent"), Some(&2));
        assert_eq!(snapshot.routes_by_agent.get("data-agent"), Some(&1));
    }

    #[test]
    fn test_processing_samples_are_bounded() {
        let collector = MetricsCollector::new();
        for i in 0..(MAX_PROCESSING_SAMPLES as u64 + 50) {
            collector.request_succeeded(i);
        }

        let times = collector.processing_times.lock().unwrap();
        assert_eq!(times.len(), MAX_PROCESSING_SAMPLES);
        assert_eq!(times[0], 50);
    }

    #[test]
    fn test_reset() {
        let collector = MetricsCollector::new();
        collector.request_received();
        collector.record_route("help-agent", RouteKind::Direct);
        collector.reset();

        let snapshot = collector.snapshot();
        assert_eq!(snapshot.requests_received, 0);
        assert!(snapshot.routes_by_agent.is_empty());
    }

    #[test]
    fn test_percentile() {
        assert_eq!(percentile(&[], 50.0), 0.0);
        assert_eq!(percentile(&[10], 95.0), 10.0);
        assert_eq!(percentile(&[10, 20, 30, 40, 50], 50.0), 30.0);
        assert_eq!(percentile(&[0, 100], 50.0), 50.0);
    }

    #[test]
    fn test_snapshot_serializes() {
        let collector = MetricsCollector::new();
        collector.request_failed(FailureKind::Cancelled, 5);

        let json = serde_json::to_value(collector.snapshot()).unwrap();
        assert_eq!(json["failures_by_kind"]["cancelled"], 1);
    }
}
