//! Request options for the discovery orchestrator.

/// Options for one [`request_discovery`](super::DiscoveryOrchestrator::request_discovery) call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiscoveryOptions {
    /// Start a new scan even if a cached result exists, and skip the
    /// persisted snapshot fallback.
    pub ignore_cache: bool,
}

impl DiscoveryOptions {
    /// Options that force a fresh scan.
    pub fn refresh() -> Self {
        Self { ignore_cache: true }
    }
}
