//! Worker statistics
//!
//! Counters covering the request lifecycle, exposed as JSON on `/stats`.
//! Workload is accumulated in thousandths so fractional costs survive the
//! atomic counter.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Worker statistics
#[derive(Debug)]
pub struct WorkerStats {
    /// Total requests received
    pub requests_total: AtomicU64,

    /// Requests completed with a backend response
    pub completed_total: AtomicU64,

    /// Requests rejected for exceeding the queue wait
    pub rejected_total: AtomicU64,

    /// Requests that failed against the backend
    pub backend_errors_total: AtomicU64,

    /// Requests currently being processed
    pub in_flight: AtomicU64,

    /// Accumulated workload of admitted requests, in thousandths
    workload_millis: AtomicU64,

    /// Worker start time
    start_time: Instant,
}

/// Point-in-time view of the worker statistics
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub requests_total: u64,
    pub completed_total: u64,
    pub rejected_total: u64,
    pub backend_errors_total: u64,
    pub in_flight: u64,
    pub workload_total: f64,
    pub uptime_seconds: u64,
}

impl WorkerStats {
    /// Create zeroed statistics
    pub fn new() -> Self {
        Self {
            requests_total: AtomicU64::new(0),
            completed_total: AtomicU64::new(0),
            rejected_total: AtomicU64::new(0),
            backend_errors_total: AtomicU64::new(0),
            in_flight: AtomicU64::new(0),
            workload_millis: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a received request
    pub fn record_received(&self) {
        self.requests_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an admitted request and its workload cost
    pub fn record_admitted(&self, cost: f64) {
        self.in_flight.fetch_add(1, Ordering::Relaxed);
        self.workload_millis
            .fetch_add((cost * 1000.0) as u64, Ordering::Relaxed);
    }

    /// Record a completed request
    pub fn record_completed(&self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
        self.completed_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a queue rejection
    pub fn record_rejected(&self) {
        self.rejected_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a backend failure for an admitted request
    pub fn record_backend_error(&self) {
        self.in_flight.fetch_sub(1, Ordering::Relaxed);
        self.backend_errors_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Accumulated workload of admitted requests
    pub fn workload_total(&self) -> f64 {
        self.workload_millis.load(Ordering::Relaxed) as f64 / 1000.0
    }

    /// Uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Take a point-in-time snapshot
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            requests_total: self.requests_total.load(Ordering::Relaxed),
            completed_total: self.completed_total.load(Ordering::Relaxed),
            rejected_total: self.rejected_total.load(Ordering::Relaxed),
            backend_errors_total: self.backend_errors_total.load(Ordering::Relaxed),
            in_flight: self.in_flight.load(Ordering::Relaxed),
            workload_total: self.workload_total(),
            uptime_seconds: self.uptime_seconds(),
        }
    }
}

impl Default for WorkerStats {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_lifecycle() {
        let stats = WorkerStats::new();

        stats.record_received();
        stats.record_admitted(100.0);
        assert_eq!(stats.in_flight.load(Ordering::Relaxed), 1);
        assert_eq!(stats.workload_total(), 100.0);

        stats.record_completed();
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.requests_total, 1);
        assert_eq!(snapshot.completed_total, 1);
        assert_eq!(snapshot.in_flight, 0);
    }

    #[test]
    fn test_rejection_does_not_touch_in_flight() {
        let stats = WorkerStats::new();

        stats.record_received();
        stats.record_rejected();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.rejected_total, 1);
        assert_eq!(snapshot.in_flight, 0);
        assert_eq!(snapshot.workload_total, 0.0);
    }

    #[test]
    fn test_backend_error_releases_in_flight() {
        let stats = WorkerStats::new();

        stats.record_received();
        stats.record_admitted(100.0);
        stats.record_backend_error();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.backend_errors_total, 1);
        assert_eq!(snapshot.in_flight, 0);
    }

    #[test]
    fn test_fractional_workload() {
        let stats = WorkerStats::new();
        stats.record_admitted(0.5);
        stats.record_admitted(0.25);
        assert_eq!(stats.workload_total(), 0.75);
    }

    #[test]
    fn test_snapshot_serializes() {
        let stats = WorkerStats::new();
        let json = serde_json::to_value(stats.snapshot()).unwrap();
        assert_eq!(json["requests_total"], 0);
        assert!(json.get("uptime_seconds").is_some());
    }
}
