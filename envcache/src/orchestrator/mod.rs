//! Discovery orchestration
//!
//! Deduplicates, memoizes and invalidates runtime discovery for one scan
//! strategy, and publishes progress to observers.

mod discovery;
mod events;
mod signal;
mod types;

pub use discovery::{DiscoveryOrchestrator, DiscoveryOrchestratorBuilder};
pub use events::DiscoveryStartedReceiver;
pub use signal::HasRuntimesSignal;
pub use types::DiscoveryOptions;
