//! Snapshot store writing one JSON file per cache key.
//!
//! Layout under the store root:
//!
//! ```text
//! <root>/global/<key>.json
//! <root>/workspace/<key>.json
//! ```
//!
//! Writes go to a temporary file first and are renamed into place, so a
//! crash mid-write never leaves a truncated snapshot behind. Each write gets
//! its own temporary file, so a superseded scan and its replacement can save
//! the same key at once.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{SnapshotPartition, SnapshotScope, SnapshotStore};
use crate::error::PersistenceError;
use crate::key::CacheKey;
use crate::runtime::Runtime;
use crate::BoxFuture;

const SNAPSHOT_EXTENSION: &str = "json";

/// Distinguishes temporary files of concurrent writes within this process.
static WRITE_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// On-disk snapshot format.
#[derive(Debug, Serialize, Deserialize)]
struct SnapshotFile {
    key: String,
    saved_at_secs: u64,
    runtimes: Vec<Runtime>,
}

/// Summary of one snapshot file, for listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotFileInfo {
    /// The cache key the snapshot belongs to.
    pub key: String,
    /// Scope directory the file lives in.
    pub scope: SnapshotScope,
    /// Number of runtimes stored.
    pub runtime_count: usize,
    /// When it was written (secs since UNIX_EPOCH).
    pub saved_at_secs: u64,
    /// Path of the file.
    pub path: PathBuf,
}

impl SnapshotFileInfo {
    /// Human-readable age, e.g. `"5m ago"`.
    pub fn age_human(&self) -> String {
        let secs = now_secs().saturating_sub(self.saved_at_secs);

        if secs < 60 {
            format!("{}s ago", secs)
        } else if secs < 3600 {
            format!("{}m ago", secs / 60)
        } else if secs < 86400 {
            format!("{}h ago", secs / 3600)
        } else {
            format!("{}d ago", secs / 86400)
        }
    }
}

/// Snapshot store rooted at a directory.
#[derive(Debug, Clone)]
pub struct JsonFileSnapshotStore {
    root: PathBuf,
}

impl JsonFileSnapshotStore {
    /// Create a store rooted at `root`. Directories are created on first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Default store location (`~/.envcache/snapshots`).
    pub fn default_root() -> Option<PathBuf> {
        dirs::home_dir().map(|h| h.join(".envcache").join("snapshots"))
    }

    /// The store root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the snapshot file for `key` in `scope`.
    pub fn snapshot_path(&self, key: &CacheKey, scope: SnapshotScope) -> PathBuf {
        self.root
            .join(scope.as_str())
            .join(format!("{}.{}", file_stem(key), SNAPSHOT_EXTENSION))
    }

    /// List every readable snapshot file, sorted by scope then key.
    pub fn list(&self) -> Result<Vec<SnapshotFileInfo>, PersistenceError> {
        let mut infos = Vec::new();

        for scope in [SnapshotScope::Global, SnapshotScope::Workspace] {
            let dir = self.root.join(scope.as_str());
            let entries = match std::fs::read_dir(&dir) {
                Ok(entries) => entries,
                Err(e) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            };

            for entry in entries {
                let path = entry?.path();
                if path.extension().and_then(|e| e.to_str()) != Some(SNAPSHOT_EXTENSION) {
                    continue;
                }
                match read_snapshot_file(&path) {
                    Ok(Some(file)) => infos.push(SnapshotFileInfo {
                        key: file.key,
                        scope,
                        runtime_count: file.runtimes.len(),
                        saved_at_secs: file.saved_at_secs,
                        path,
                    }),
                    Ok(None) => {}
                    Err(e) => debug!(path = %path.display(), error = %e, "Skipping unreadable snapshot"),
                }
            }
        }

        infos.sort_by(|a, b| (a.scope, &a.key).cmp(&(b.scope, &b.key)));
        Ok(infos)
    }

    /// Delete every snapshot file. Returns the number removed.
    pub fn clear(&self) -> Result<usize, PersistenceError> {
        let infos = self.list()?;
        for info in &infos {
            std::fs::remove_file(&info.path)?;
        }
        Ok(infos.len())
    }
}

impl SnapshotStore for JsonFileSnapshotStore {
    fn create_partition(&self, key: &CacheKey, scope: SnapshotScope) -> Box<dyn SnapshotPartition> {
        Box::new(JsonFilePartition {
            key: key.clone(),
            path: self.snapshot_path(key, scope),
        })
    }
}

struct JsonFilePartition {
    key: CacheKey,
    path: PathBuf,
}

impl SnapshotPartition for JsonFilePartition {
    fn read(&self) -> Result<Option<Vec<Runtime>>, PersistenceError> {
        let file = off_worker(|| read_snapshot_file(&self.path))?;
        Ok(file.map(|file| file.runtimes))
    }

    fn write(&self, runtimes: Vec<Runtime>) -> BoxFuture<'_, Result<(), PersistenceError>> {
        Box::pin(async move {
            let file = SnapshotFile {
                key: self.key.to_string(),
                saved_at_secs: now_secs(),
                runtimes,
            };
            let bytes = serde_json::to_vec_pretty(&file)?;

            if let Some(parent) = self.path.parent() {
                tokio::fs::create_dir_all(parent).await?;
            }

            let temp_path = temp_path_for(&self.path);
            tokio::fs::write(&temp_path, bytes).await?;
            if let Err(e) = tokio::fs::rename(&temp_path, &self.path).await {
                let _ = tokio::fs::remove_file(&temp_path).await;
                return Err(e.into());
            }

            Ok(())
        })
    }
}

/// `<stem>.<pid>.<seq>.tmp` next to the target, unique per write.
fn temp_path_for(path: &Path) -> PathBuf {
    let seq = WRITE_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!("{}.{}.{}.tmp", stem, std::process::id(), seq))
}

/// Run blocking file IO without stalling a multi-threaded runtime worker.
///
/// `block_in_place` is unavailable on the current-thread runtime, where the
/// call runs inline.
fn off_worker<T>(f: impl FnOnce() -> T) -> T {
    use tokio::runtime::{Handle, RuntimeFlavor};

    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(f)
        }
        _ => f(),
    }
}

fn read_snapshot_file(path: &Path) -> Result<Option<SnapshotFile>, PersistenceError> {
    let bytes = match std::fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_slice(&bytes)?))
}

/// Keys contain `:` before the workspace hash, which is not portable in file names.
fn file_stem(key: &CacheKey) -> String {
    key.as_str()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' || c == '-' { c } else { '-' })
        .collect()
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
