//! Invalidation watchers.
//!
//! A [`Watcher`] signals that a partition's underlying state may have changed
//! (for example, a new interpreter appeared in a watched directory). The
//! orchestrator subscribes once per cache key and, on every "created"
//! notification, evicts that key's cached result and re-runs discovery.
//!
//! # Architecture
//!
//! ```text
//! ScanStrategy::watchers(hint) ──► [Watcher, ...]
//!                                      │ on_did_create(handler)
//!                                      ▼
//!                                 Subscription ──► DisposableRegistry
//!                                                  (released on dispose)
//! ```
//!
//! Implementations:
//! - [`ManualWatcher`]: notifications fired programmatically
//! - [`FsWatcher`]: filesystem creation events via `notify` (feature `fs-watch`)

mod dispose;
#[cfg(feature = "fs-watch")]
mod fs;
mod manual;
mod registry;

use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

pub use dispose::{DisposableRegistry, Subscription};
#[cfg(feature = "fs-watch")]
pub use fs::FsWatcher;
pub use manual::ManualWatcher;
pub use registry::WatcherRegistry;

/// Callback invoked with the path of a newly created entry.
pub type CreateHandler = Arc<dyn Fn(&Path) + Send + Sync>;

/// Errors from setting up a watcher.
#[derive(Debug, Error)]
pub enum WatchError {
    /// The underlying notification backend failed.
    #[error("Failed to create watcher: {0}")]
    Backend(String),

    /// A path could not be watched.
    #[error("Failed to watch path '{path}': {reason}")]
    Path {
        /// The path that failed.
        path: String,
        /// Backend failure description.
        reason: String,
    },
}

/// Source of "something was created" notifications.
pub trait Watcher: Send + Sync {
    /// Register `handler` for creation events.
    ///
    /// The handler stays registered until the returned [`Subscription`] is
    /// disposed or dropped.
    fn on_did_create(&self, handler: CreateHandler) -> Subscription;
}
