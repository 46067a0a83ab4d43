//! envcache - deduplicating, persistent cache for language-runtime discovery
//!
//! Finding installed interpreters is slow: every strategy walks directories,
//! probes registries or spawns processes. This library wraps any
//! [`ScanStrategy`] in a caching layer that
//!
//! - runs at most one scan per cache partition at a time,
//! - remembers results in-process and as persisted snapshots,
//! - serves a stale snapshot immediately on a cold start,
//! - rescans when a watcher reports that a new runtime may have appeared.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use envcache::{DirectoryScanStrategy, DiscoveryOptions, DiscoveryOrchestrator, JsonFileSnapshotStore};
//!
//! let strategy = Arc::new(DirectoryScanStrategy::new("path").with_path_env());
//! let orchestrator = DiscoveryOrchestrator::builder(strategy)
//!     .store(Arc::new(JsonFileSnapshotStore::new("/tmp/envcache")))
//!     .build();
//!
//! let runtimes = orchestrator.request_discovery(None, DiscoveryOptions::default()).await?;
//! ```

use std::future::Future;
use std::pin::Pin;

pub mod config;
pub mod error;
pub mod future_cache;
pub mod key;
pub mod logging;
pub mod orchestrator;
pub mod pending;
pub mod persistence;
pub mod runtime;
pub mod strategy;
pub mod telemetry;
pub mod watcher;
pub mod workspace;

pub use config::DiscoveryConfig;
pub use error::{DiscoveryError, PersistenceError};
pub use future_cache::{CacheBackend, FutureCache};
pub use key::CacheKey;
pub use orchestrator::{
    DiscoveryOptions, DiscoveryOrchestrator, DiscoveryOrchestratorBuilder, DiscoveryStartedReceiver,
};
pub use pending::{DiscoveryResult, PendingResult};
pub use persistence::{JsonFileSnapshotStore, MemorySnapshotStore, SnapshotScope, SnapshotStore};
pub use runtime::Runtime;
pub use strategy::{DirectoryScanStrategy, ScanStrategy};
pub use workspace::{StaticWorkspaceResolver, WorkspaceFolder, WorkspaceResolver};

/// Boxed future used at dyn-compatible trait seams.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
