//! Tracks which cache keys already have watchers attached.

use dashmap::DashSet;

use crate::key::CacheKey;

/// Set of cache keys whose invalidation watchers are attached.
///
/// Membership is never removed: attachment happens at most once per key for
/// the lifetime of the owning orchestrator, even after invalidation.
#[derive(Debug, Default)]
pub struct WatcherRegistry {
    attached: DashSet<CacheKey>,
}

impl WatcherRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim `key` for attachment.
    ///
    /// Returns `true` only for the first caller; every later call for the
    /// same key returns `false`.
    pub fn try_claim(&self, key: &CacheKey) -> bool {
        self.attached.insert(key.clone())
    }

    /// Whether watchers for `key` have been attached.
    pub fn is_attached(&self, key: &CacheKey) -> bool {
        self.attached.contains(key)
    }

    /// Number of claimed keys.
    pub fn len(&self) -> usize {
        self.attached.len()
    }

    /// Whether no key has been claimed.
    pub fn is_empty(&self) -> bool {
        self.attached.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_claim_once() {
        let registry = WatcherRegistry::new();
        let key = CacheKey::new("k");

        assert!(!registry.is_attached(&key));
        assert!(registry.try_claim(&key));
        assert!(!registry.try_claim(&key));
        assert!(registry.is_attached(&key));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_concurrent_claims_single_winner() {
        let registry = Arc::new(WatcherRegistry::new());
        let key = CacheKey::new("contended");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                let key = key.clone();
                std::thread::spawn(move || registry.try_claim(&key))
            })
            .collect();

        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();
        assert_eq!(winners, 1);
    }
}
