//! Thread-safe metrics collection system
//!
//! Atomic counters for query, routing, and dispatch outcomes plus a bounded
//! window of end-to-end query latencies.

use crate::dispatch::DispatchOutcome;
use once_cell::sync::Lazy;
use serde::Serialize;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

const LATENCY_WINDOW: usize = 1000;

/// Global metrics collector instance
pub static METRICS: Lazy<MetricsCollector> = Lazy::new(MetricsCollector::new);

/// Get reference to global metrics collector
pub fn metrics() -> &'static MetricsCollector {
    &METRICS
}

/// Thread-safe metrics collector using atomics and a mutex-protected window
pub struct MetricsCollector {
    // Query lifecycle
    queries_received: AtomicU64,
    queries_in_flight: AtomicU64,
    queries_completed: AtomicU64,
    queries_failed: AtomicU64,

    // Routing
    queries_routed: AtomicU64,
    queries_unroutable: AtomicU64,
    classifier_failures: AtomicU64,

    // Dispatch
    dispatch_success: AtomicU64,
    dispatch_agent_errors: AtomicU64,
    dispatch_transport_errors: AtomicU64,

    latencies: Mutex<VecDeque<u64>>, // in milliseconds
    uptime_start: AtomicU64,
}

impl MetricsCollector {
    pub fn new() -> Self {
        Self {
            queries_received: AtomicU64::new(0),
            queries_in_flight: AtomicU64::new(0),
            queries_completed: AtomicU64::new(0),
            queries_failed: AtomicU64::new(0),
            queries_routed: AtomicU64::new(0),
            queries_unroutable: AtomicU64::new(0),
            classifier_failures: AtomicU64::new(0),
            dispatch_success: AtomicU64::new(0),
            dispatch_agent_errors: AtomicU64::new(0),
            dispatch_transport_errors: AtomicU64::new(0),
            latencies: Mutex::new(VecDeque::with_capacity(LATENCY_WINDOW)),
            uptime_start: AtomicU64::new(current_timestamp()),
        }
    }

    /// Count a query as received; the returned timer records its outcome
    pub fn start_query(&self) -> QueryTimer<'_> {
        self.record_query_received();
        QueryTimer {
            collector: self,
            started: Instant::now(),
            finished: false,
        }
    }

    pub fn record_query_received(&self) {
        self.queries_received.fetch_add(1, Ordering::Relaxed);
        self.queries_in_flight.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_query_completed(&self, duration: Duration) {
        self.queries_completed.fetch_add(1, Ordering::Relaxed);
        self.queries_in_flight.fetch_sub(1, Ordering::Relaxed);
        self.record_latency(duration);
    }

    pub fn record_query_failed(&self, duration: Duration) {
        self.queries_failed.fetch_add(1, Ordering::Relaxed);
        self.queries_in_flight.fetch_sub(1, Ordering::Relaxed);
        self.record_latency(duration);
    }

    pub fn record_routed(&self) {
        self.queries_routed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unroutable(&self) {
        self.queries_unroutable.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_classifier_failure(&self) {
        self.classifier_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dispatch(&self, outcome: DispatchOutcome) {
        let counter = match outcome {
            DispatchOutcome::Success => &self.dispatch_success,
            DispatchOutcome::AgentError => &self.dispatch_agent_errors,
            DispatchOutcome::TransportError => &self.dispatch_transport_errors,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn record_latency(&self, duration: Duration) {
        if let Ok(mut times) = self.latencies.lock() {
            times.push_back(duration.as_millis() as u64);

            if times.len() > LATENCY_WINDOW {
                times.pop_front();
            }
        }
    }

    fn latency_statistics(&self) -> LatencyStats {
        let mut sorted = match self.latencies.lock() {
            Ok(times) => times.iter().copied().collect::<Vec<_>>(),
            Err(_) => return LatencyStats::default(),
        };
        if sorted.is_empty() {
            return LatencyStats::default();
        }
        sorted.sort_unstable();

        let avg = sorted.iter().sum::<u64>() as f64 / sorted.len() as f64;
        LatencyStats {
            avg_ms: avg,
            p50_ms: percentile(&sorted, 50.0),
            p95_ms: percentile(&sorted, 95.0),
            p99_ms: percentile(&sorted, 99.0),
        }
    }

    /// Get complete metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        let now = current_timestamp();

        MetricsSnapshot {
            queries: QueryMetrics {
                received: self.queries_received.load(Ordering::Relaxed),
                in_flight: self.queries_in_flight.load(Ordering::Relaxed),
                completed: self.queries_completed.load(Ordering::Relaxed),
                failed: self.queries_failed.load(Ordering::Relaxed),
                latency: self.latency_statistics(),
            },
            routing: RoutingMetrics {
                routed: self.queries_routed.load(Ordering::Relaxed),
                unroutable: self.queries_unroutable.load(Ordering::Relaxed),
                classifier_failures: self.classifier_failures.load(Ordering::Relaxed),
            },
            dispatch: DispatchMetrics {
                success: self.dispatch_success.load(Ordering::Relaxed),
                agent_errors: self.dispatch_agent_errors.load(Ordering::Relaxed),
                transport_errors: self.dispatch_transport_errors.load(Ordering::Relaxed),
            },
            uptime_seconds: now.saturating_sub(self.uptime_start.load(Ordering::Relaxed)),
            timestamp: now,
        }
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// In-flight query handle
///
/// Dropping it without `complete` or `fail` (a cancelled or timed-out
/// query) records a failure, so the in-flight gauge always comes back down.
pub struct QueryTimer<'a> {
    collector: &'a MetricsCollector,
    started: Instant,
    finished: bool,
}

impl QueryTimer<'_> {
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    pub fn complete(mut self) {
        self.finished = true;
        self.collector.record_query_completed(self.elapsed());
    }

    pub fn fail(mut self) {
        self.finished = true;
        self.collector.record_query_failed(self.elapsed());
    }
}

impl Drop for QueryTimer<'_> {
    fn drop(&mut self) {
        if !self.finished {
            tracing::debug!("Query dropped before completion");
            self.collector.record_query_failed(self.elapsed());
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub queries: QueryMetrics,
    pub routing: RoutingMetrics,
    pub dispatch: DispatchMetrics,
    pub uptime_seconds: u64,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryMetrics {
    pub received: u64,
    pub in_flight: u64,
    pub completed: u64,
    pub failed: u64,
    pub latency: LatencyStats,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct LatencyStats {
    pub avg_ms: f64,
    pub p50_ms: f64,
    pub p95_ms: f64,
    pub p99_ms: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoutingMetrics {
    pub routed: u64,
    pub unroutable: u64,
    pub classifier_failures: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DispatchMetrics {
    pub success: u64,
    pub agent_errors: u64,
    pub transport_errors: u64,
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
