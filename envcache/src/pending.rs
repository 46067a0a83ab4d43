//! Write-once results for in-flight scans.
//!
//! A [`PendingResult`] starts out pending, then settles exactly once to
//! either a runtime list or an error. Any number of clones may await it,
//! before or after it settles; all of them observe the same outcome.
//!
//! # Implementation
//!
//! Backed by a `tokio::sync::watch` channel holding `Option<DiscoveryResult>`.
//! Settling uses `send_if_modified`, so only the first resolve/reject sticks
//! and late subscribers see the stored value immediately.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::error::DiscoveryError;
use crate::runtime::Runtime;

/// Outcome of one scan.
pub type DiscoveryResult = Result<Vec<Runtime>, DiscoveryError>;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Shared, write-once handle to the outcome of one scan.
#[derive(Clone)]
pub struct PendingResult {
    id: u64,
    slot: Arc<watch::Sender<Option<DiscoveryResult>>>,
}

impl PendingResult {
    /// Create a new pending result.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(None);
        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            slot: Arc::new(tx),
        }
    }

    /// Create a result that is already resolved.
    pub fn resolved(runtimes: Vec<Runtime>) -> Self {
        let pending = Self::new();
        pending.resolve(runtimes);
        pending
    }

    /// Process-unique identifier, useful in logs.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Resolve with a runtime list. Returns `false` if already settled.
    pub fn resolve(&self, runtimes: Vec<Runtime>) -> bool {
        self.settle(Ok(runtimes))
    }

    /// Reject with an error. Returns `false` if already settled.
    pub fn reject(&self, error: DiscoveryError) -> bool {
        self.settle(Err(error))
    }

    fn settle(&self, outcome: DiscoveryResult) -> bool {
        self.slot.send_if_modified(|slot| {
            if slot.is_some() {
                return false;
            }
            *slot = Some(outcome);
            true
        })
    }

    /// Whether the result has settled.
    pub fn is_settled(&self) -> bool {
        self.slot.borrow().is_some()
    }

    /// The outcome, if settled.
    pub fn peek(&self) -> Option<DiscoveryResult> {
        self.slot.borrow().clone()
    }

    /// Wait for the outcome.
    pub async fn wait(&self) -> DiscoveryResult {
        let mut rx = self.slot.subscribe();
        // The sender lives in `self`, so the channel cannot close while we wait.
        let outcome = match rx.wait_for(Option::is_some).await {
            Ok(slot) => (*slot).clone(),
            Err(_) => None,
        };
        outcome.unwrap_or_else(|| Err(DiscoveryError::Abandoned(format!("pending#{}", self.id))))
    }

    /// Whether two handles refer to the same underlying result.
    pub fn ptr_eq(&self, other: &PendingResult) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }

    /// Guard that rejects this result with [`DiscoveryError::Abandoned`] if it
    /// is dropped while the result is still pending.
    pub fn abandon_guard(&self, strategy: impl Into<String>) -> AbandonGuard {
        AbandonGuard {
            pending: self.clone(),
            strategy: strategy.into(),
        }
    }
}

impl Default for PendingResult {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for PendingResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.slot.borrow() {
            None => "pending",
            Some(Ok(_)) => "resolved",
            Some(Err(_)) => "rejected",
        };
        f.debug_struct("PendingResult")
            .field("id", &self.id)
            .field("state", &state)
            .finish()
    }
}

/// See [`PendingResult::abandon_guard`].
pub struct AbandonGuard {
    pending: PendingResult,
    strategy: String,
}

impl Drop for AbandonGuard {
    fn drop(&mut self) {
        let strategy = std::mem::take(&mut self.strategy);
        self.pending.reject(DiscoveryError::Abandoned(strategy));
    }
}
