//! Scan strategies.
//!
//! A [`ScanStrategy`] is the expensive operation the orchestrator caches. It
//! knows how to find runtimes and, optionally, which [`Watcher`]s signal that
//! its results may be stale. The orchestrator never calls `scan` twice
//! concurrently for one cache key unless a refresh is forced.
//!
//! # Design Principles
//!
//! - **Dyn-compatible**: returns `Pin<Box<dyn Future>>` so orchestrators hold
//!   `Arc<dyn ScanStrategy>`
//! - **Stateless from the cache's view**: the strategy never sees cache keys
//! - **Watchers optional**: the default `watchers` hook returns nothing

mod directory;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::DiscoveryError;
use crate::runtime::Runtime;
use crate::watcher::Watcher;
use crate::BoxFuture;

pub use directory::DirectoryScanStrategy;

/// Something that discovers runtimes.
pub trait ScanStrategy: Send + Sync {
    /// Strategy name, used in cache keys, logs and telemetry.
    fn name(&self) -> &str;

    /// Discover runtimes relevant to `hint` (a resource path, or none for a
    /// global scan).
    fn scan(&self, hint: Option<PathBuf>) -> BoxFuture<'_, Result<Vec<Runtime>, DiscoveryError>>;

    /// Watchers whose "created" notifications invalidate results for `hint`.
    fn watchers(&self, _hint: Option<&Path>) -> Vec<Arc<dyn Watcher>> {
        Vec::new()
    }
}
