//! Discovery telemetry.
//!
//! Two layers:
//!
//! ```text
//! settled scan ──► TelemetrySink::record(DiscoveryTelemetry)   (external, fire-and-forget)
//! every request ─► DiscoveryMetrics (atomic counters) ──► DiscoveryMetricsSnapshot
//! ```
//!
//! The default sink, [`TracingTelemetry`], emits one `info!` event per scan.

mod metrics;

use std::time::Duration;

use parking_lot::Mutex;
use tracing::info;

pub use metrics::{DiscoveryMetrics, DiscoveryMetricsSnapshot};

/// Kind of telemetry event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TelemetryEventKind {
    /// A runtime discovery scan settled.
    RuntimeDiscovery,
}

impl TelemetryEventKind {
    /// Stable event name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RuntimeDiscovery => "runtime_discovery",
        }
    }
}

/// One telemetry record for a settled scan.
#[derive(Debug, Clone, PartialEq)]
pub struct DiscoveryTelemetry {
    /// Event kind.
    pub kind: TelemetryEventKind,
    /// Strategy that ran the scan.
    pub strategy: String,
    /// Time from scan start to settle.
    pub elapsed: Duration,
    /// Number of runtimes found; `None` when the scan failed.
    pub count: Option<usize>,
    /// Failure description, if the scan failed.
    pub error: Option<String>,
}

impl DiscoveryTelemetry {
    /// Record for a successful scan.
    pub fn success(strategy: impl Into<String>, elapsed: Duration, count: usize) -> Self {
        Self {
            kind: TelemetryEventKind::RuntimeDiscovery,
            strategy: strategy.into(),
            elapsed,
            count: Some(count),
            error: None,
        }
    }

    /// Record for a failed scan.
    pub fn failure(strategy: impl Into<String>, elapsed: Duration, error: impl Into<String>) -> Self {
        Self {
            kind: TelemetryEventKind::RuntimeDiscovery,
            strategy: strategy.into(),
            elapsed,
            count: None,
            error: Some(error.into()),
        }
    }
}

/// Receives telemetry records. Must not block.
pub trait TelemetrySink: Send + Sync {
    /// Record one event.
    fn record(&self, event: DiscoveryTelemetry);
}

/// Sink that logs each record through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTelemetry;

impl TelemetrySink for TracingTelemetry {
    fn record(&self, event: DiscoveryTelemetry) {
        info!(
            event = event.kind.as_str(),
            strategy = %event.strategy,
            elapsed_ms = event.elapsed.as_millis() as u64,
            count = event.count,
            error = event.error.as_deref(),
            "Telemetry"
        );
    }
}

/// Sink that keeps every record in memory.
#[derive(Debug, Default)]
pub struct RecordingTelemetry {
    events: Mutex<Vec<DiscoveryTelemetry>>,
}

impl RecordingTelemetry {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all records so far.
    pub fn events(&self) -> Vec<DiscoveryTelemetry> {
        self.events.lock().clone()
    }
}

impl TelemetrySink for RecordingTelemetry {
    fn record(&self, event: DiscoveryTelemetry) {
        self.events.lock().push(event);
    }
}
