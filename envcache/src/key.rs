//! Cache key composition.
//!
//! A [`CacheKey`] names one discovery partition: a strategy, optionally
//! scoped to one workspace folder.
//!
//! ```text
//! RUNTIMES_CACHE_v3_<strategy>                      global partition
//! RUNTIMES_CACHE_v3_<strategy>:<sha256(root path)>  per-workspace partition
//! ```

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use sha2::{Digest, Sha256};

use crate::workspace::WorkspaceResolver;

/// Prefix shared by every key. Bump the version when the snapshot layout changes.
pub const CACHE_KEY_PREFIX: &str = "RUNTIMES_CACHE_v3_";

/// Identifies one discovery partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Wrap a raw key string.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this key is scoped to a workspace folder.
    pub fn is_workspace_scoped(&self) -> bool {
        self.0.contains(':')
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Computes cache keys for one strategy.
#[derive(Clone)]
pub struct CacheKeyPolicy {
    prefix: String,
    per_workspace: bool,
    resolver: Arc<dyn WorkspaceResolver>,
}

impl CacheKeyPolicy {
    /// Create a policy for the strategy `name`.
    pub fn new(name: &str, per_workspace: bool, resolver: Arc<dyn WorkspaceResolver>) -> Self {
        Self {
            prefix: format!("{}{}", CACHE_KEY_PREFIX, name),
            per_workspace,
            resolver,
        }
    }

    /// The strategy-level prefix (the global key).
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Whether keys are scoped per workspace.
    pub fn per_workspace(&self) -> bool {
        self.per_workspace
    }

    /// Compute the key for a partition hint.
    ///
    /// Falls back to the bare prefix when caching is global, no hint is given,
    /// or the hint lies outside every workspace folder.
    pub fn key_for(&self, hint: Option<&Path>) -> CacheKey {
        let folder = match hint {
            Some(resource) if self.per_workspace => self.resolver.workspace_folder(resource),
            _ => None,
        };

        match folder {
            Some(folder) => CacheKey(format!("{}:{}", self.prefix, hash_path(&folder.root))),
            None => CacheKey(self.prefix.clone()),
        }
    }
}

impl fmt::Debug for CacheKeyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheKeyPolicy")
            .field("prefix", &self.prefix)
            .field("per_workspace", &self.per_workspace)
            .finish()
    }
}

fn hash_path(path: &Path) -> String {
    let digest = Sha256::digest(path.to_string_lossy().as_bytes());
    format!("{:x}", digest)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::{NoWorkspace, StaticWorkspaceResolver};
    use proptest::prelude::*;

    fn policy(per_workspace: bool) -> CacheKeyPolicy {
        let resolver = Arc::new(StaticWorkspaceResolver::new(["/ws/one", "/ws/two"]));
        CacheKeyPolicy::new("venv", per_workspace, resolver)
    }

    #[test]
    fn test_global_key_is_prefix() {
        let key = policy(false).key_for(Some(Path::new("/ws/one/main.py")));
        assert_eq!(key.as_str(), "RUNTIMES_CACHE_v3_venv");
        assert!(!key.is_workspace_scoped());
    }

    #[test]
    fn test_no_hint_is_prefix() {
        let key = policy(true).key_for(None);
        assert_eq!(key.as_str(), "RUNTIMES_CACHE_v3_venv");
    }

    #[test]
    fn test_workspace_key_has_hash_suffix() {
        let key = policy(true).key_for(Some(Path::new("/ws/one/main.py")));
        assert!(key.as_str().starts_with("RUNTIMES_CACHE_v3_venv:"));
        assert!(key.is_workspace_scoped());
        // hex-encoded SHA-256
        assert_eq!(key.as_str().len(), "RUNTIMES_CACHE_v3_venv:".len() + 64);
    }

    #[test]
    fn test_distinct_workspaces_distinct_keys() {
        let policy = policy(true);
        let one = policy.key_for(Some(Path::new("/ws/one/a.py")));
        let two = policy.key_for(Some(Path::new("/ws/two/a.py")));
        assert_ne!(one, two);
    }

    #[test]
    fn test_outside_workspace_falls_back() {
        let key = policy(true).key_for(Some(Path::new("/elsewhere/a.py")));
        assert_eq!(key.as_str(), "RUNTIMES_CACHE_v3_venv");
    }

    #[test]
    fn test_no_workspace_open_falls_back() {
        let policy = CacheKeyPolicy::new("venv", true, Arc::new(NoWorkspace));
        let key = policy.key_for(Some(Path::new("/ws/one/a.py")));
        assert_eq!(key.as_str(), "RUNTIMES_CACHE_v3_venv");
    }

    proptest! {
        #[test]
        fn prop_same_folder_same_key(file_a in "[a-z]{1,8}", file_b in "[a-z]{1,8}") {
            let policy = policy(true);
            let a = policy.key_for(Some(&Path::new("/ws/one").join(&file_a)));
            let b = policy.key_for(Some(&Path::new("/ws/one").join(&file_b)));
            prop_assert_eq!(a, b);
        }
    }
}
