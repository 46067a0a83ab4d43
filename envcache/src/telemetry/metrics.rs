//! Lock-free discovery counters.
//!
//! All operations use `Relaxed` ordering; the counters are independent
//! measurements read only for display.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Counters for one orchestrator.
pub struct DiscoveryMetrics {
    /// When collection started
    start_time: Instant,

    // === Request metrics ===
    /// Calls to request_discovery
    requests: AtomicU64,
    /// Requests that reused an existing result
    requests_reused: AtomicU64,
    /// Requests answered from a persisted snapshot
    snapshot_hits: AtomicU64,

    // === Scan metrics ===
    /// Scans started
    scans_started: AtomicU64,
    /// Scans that resolved
    scans_succeeded: AtomicU64,
    /// Scans that rejected
    scans_failed: AtomicU64,
    /// Total scan time in microseconds
    scan_time_us: AtomicU64,

    // === Invalidation metrics ===
    /// Watcher notifications that evicted a result
    invalidations: AtomicU64,
}

impl DiscoveryMetrics {
    /// Create zeroed counters.
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            requests: AtomicU64::new(0),
            requests_reused: AtomicU64::new(0),
            snapshot_hits: AtomicU64::new(0),
            scans_started: AtomicU64::new(0),
            scans_succeeded: AtomicU64::new(0),
            scans_failed: AtomicU64::new(0),
            scan_time_us: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    pub(crate) fn request_received(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn request_reused(&self) {
        self.requests_reused.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot_served(&self) {
        self.snapshot_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn scan_started(&self) {
        self.scans_started.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn scan_settled(&self, succeeded: bool, elapsed: Duration) {
        if succeeded {
            self.scans_succeeded.fetch_add(1, Ordering::Relaxed);
        } else {
            self.scans_failed.fetch_add(1, Ordering::Relaxed);
        }
        self.scan_time_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);
    }

    pub(crate) fn invalidated(&self) {
        self.invalidations.fetch_add(1, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters.
    pub fn snapshot(&self) -> DiscoveryMetricsSnapshot {
        let scans_succeeded = self.scans_succeeded.load(Ordering::Relaxed);
        let scans_failed = self.scans_failed.load(Ordering::Relaxed);
        let settled = scans_succeeded + scans_failed;
        let scan_time_us = self.scan_time_us.load(Ordering::Relaxed);

        DiscoveryMetricsSnapshot {
            uptime: self.start_time.elapsed(),
            requests: self.requests.load(Ordering::Relaxed),
            requests_reused: self.requests_reused.load(Ordering::Relaxed),
            snapshot_hits: self.snapshot_hits.load(Ordering::Relaxed),
            scans_started: self.scans_started.load(Ordering::Relaxed),
            scans_succeeded,
            scans_failed,
            avg_scan_time: if settled == 0 {
                Duration::ZERO
            } else {
                Duration::from_micros(scan_time_us / settled)
            },
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }
}

impl Default for DiscoveryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for DiscoveryMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.snapshot(), f)
    }
}

/// Immutable copy of [`DiscoveryMetrics`].
#[derive(Clone, Debug, PartialEq)]
pub struct DiscoveryMetricsSnapshot {
    /// How long the counters have been collecting
    pub uptime: Duration,
    /// Calls to request_discovery
    pub requests: u64,
    /// Requests that reused an existing result
    pub requests_reused: u64,
    /// Requests answered from a persisted snapshot
    pub snapshot_hits: u64,
    /// Scans started
    pub scans_started: u64,
    /// Scans that resolved
    pub scans_succeeded: u64,
    /// Scans that rejected
    pub scans_failed: u64,
    /// Mean time per settled scan
    pub avg_scan_time: Duration,
    /// Watcher notifications that evicted a result
    pub invalidations: u64,
}

impl DiscoveryMetricsSnapshot {
    /// Fraction of requests that reused an existing result (0.0 to 1.0).
    pub fn reuse_ratio(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.requests_reused as f64 / self.requests as f64
        }
    }
}

impl fmt::Display for DiscoveryMetricsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} requests ({:.1}% reused, {} from snapshot), {} scans ({} ok, {} failed, avg {}ms), {} invalidations",
            self.requests,
            self.reuse_ratio() * 100.0,
            self.snapshot_hits,
            self.scans_started,
            self.scans_succeeded,
            self.scans_failed,
            self.avg_scan_time.as_millis(),
            self.invalidations
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_is_zeroed() {
        let snapshot = DiscoveryMetrics::new().snapshot();
        assert_eq!(snapshot.requests, 0);
        assert_eq!(snapshot.scans_started, 0);
        assert_eq!(snapshot.avg_scan_time, Duration::ZERO);
        assert_eq!(snapshot.reuse_ratio(), 0.0);
    }

    #[test]
    fn test_counters_and_average() {
        let metrics = DiscoveryMetrics::new();
        metrics.request_received();
        metrics.request_received();
        metrics.request_reused();
        metrics.scan_started();
        metrics.scan_settled(true, Duration::from_millis(10));
        metrics.scan_settled(false, Duration::from_millis(30));

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.requests, 2);
        assert_eq!(snapshot.reuse_ratio(), 0.5);
        assert_eq!(snapshot.scans_succeeded, 1);
        assert_eq!(snapshot.scans_failed, 1);
        assert_eq!(snapshot.avg_scan_time, Duration::from_millis(20));
    }

    #[test]
    fn test_display() {
        let metrics = DiscoveryMetrics::new();
        metrics.request_received();
        metrics.invalidated();
        let text = metrics.snapshot().to_string();
        assert!(text.contains("1 requests"));
        assert!(text.contains("1 invalidations"));
    }
}
