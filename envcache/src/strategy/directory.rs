//! Directory listing strategy.
//!
//! Reports every file whose name matches one of a set of glob patterns in a
//! list of directories. Two kinds of directories are scanned:
//!
//! ```text
//! search paths      absolute, scanned for every hint (e.g. entries of $PATH)
//! workspace dirs    relative, joined to the workspace root of the hint
//!                   (e.g. ".venv/bin" -> /work/proj/.venv/bin)
//! ```
//!
//! Missing directories are skipped silently. Any other I/O error fails the scan.

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use glob::Pattern;
use tracing::{debug, trace};

use super::ScanStrategy;
use crate::error::DiscoveryError;
use crate::runtime::Runtime;
use crate::watcher::Watcher;
use crate::workspace::{NoWorkspace, WorkspaceResolver};
use crate::BoxFuture;

/// Default file name pattern.
pub const DEFAULT_PATTERN: &str = "python*";

/// Attribute naming where a runtime was found.
const SOURCE_ATTRIBUTE: &str = "source";

/// Scans directories for files matching glob patterns.
#[derive(Clone)]
pub struct DirectoryScanStrategy {
    name: String,
    search_paths: Vec<PathBuf>,
    workspace_dirs: Vec<PathBuf>,
    patterns: Vec<Pattern>,
    resolver: Arc<dyn WorkspaceResolver>,
}

impl DirectoryScanStrategy {
    /// Create a strategy with no directories and the default pattern.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            search_paths: Vec::new(),
            workspace_dirs: Vec::new(),
            patterns: vec![Pattern::new(DEFAULT_PATTERN).unwrap_or_default()],
            resolver: Arc::new(NoWorkspace),
        }
    }

    /// Use the entries of `$PATH` as search paths.
    pub fn with_path_env(self) -> Self {
        let paths = std::env::var_os("PATH")
            .map(|value| std::env::split_paths(&value).collect::<Vec<_>>())
            .unwrap_or_default();
        self.with_search_paths(paths)
    }

    /// Set the absolute directories scanned for every hint.
    pub fn with_search_paths<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.search_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Set the workspace-relative directories scanned when a hint is given.
    pub fn with_workspace_dirs<I, P>(mut self, dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.workspace_dirs = dirs.into_iter().map(Into::into).collect();
        self
    }

    /// Replace the file name patterns.
    pub fn with_patterns<I, S>(mut self, patterns: I) -> Result<Self, glob::PatternError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.patterns = patterns
            .into_iter()
            .map(|p| Pattern::new(p.as_ref()))
            .collect::<Result<_, _>>()?;
        Ok(self)
    }

    /// Resolver used to find the workspace root of a hint.
    ///
    /// Without one, workspace directories are joined to the hint itself.
    pub fn with_resolver(mut self, resolver: Arc<dyn WorkspaceResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// The configured patterns as strings.
    pub fn patterns(&self) -> Vec<&str> {
        self.patterns.iter().map(Pattern::as_str).collect()
    }

    /// Directories scanned for `hint`, tagged with their source, deduplicated.
    pub fn directories(&self, hint: Option<&Path>) -> Vec<(PathBuf, &'static str)> {
        let mut dirs: Vec<(PathBuf, &'static str)> = Vec::new();

        if let Some(hint) = hint {
            let base = self
                .resolver
                .workspace_folder(hint)
                .map(|folder| folder.root)
                .unwrap_or_else(|| hint.to_path_buf());
            for rel in &self.workspace_dirs {
                dirs.push((base.join(rel), "workspace"));
            }
        }
        for path in &self.search_paths {
            dirs.push((path.clone(), "search_path"));
        }

        let mut seen = std::collections::HashSet::new();
        dirs.retain(|(path, _)| seen.insert(path.clone()));
        dirs
    }

    fn matches(&self, file_name: &str) -> bool {
        self.patterns.iter().any(|p| p.matches(file_name))
    }

    async fn scan_dir(
        &self,
        dir: &Path,
        source: &'static str,
        found: &mut BTreeMap<String, Runtime>,
    ) -> Result<(), DiscoveryError> {
        let mut entries = match tokio::fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                trace!(dir = %dir.display(), "Skipping missing directory");
                return Ok(());
            }
            Err(e) => return Err(self.io_error(dir, e)),
        };

        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| self.io_error(dir, e))?
        {
            let file_name = entry.file_name();
            let Some(file_name) = file_name.to_str() else {
                continue;
            };
            if !self.matches(file_name) {
                continue;
            }

            let path = entry.path();
            // Follows symlinks; dangling links are skipped.
            match tokio::fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => {}
                _ => continue,
            }

            let id = path.display().to_string();
            found.entry(id.clone()).or_insert_with(|| {
                Runtime::new(id)
                    .with_executable(path.clone())
                    .with_attribute(SOURCE_ATTRIBUTE, source)
            });
        }

        Ok(())
    }

    fn io_error(&self, dir: &Path, e: io::Error) -> DiscoveryError {
        DiscoveryError::scan(&self.name, format!("{}: {}", dir.display(), e))
    }
}

impl ScanStrategy for DirectoryScanStrategy {
    fn name(&self) -> &str {
        &self.name
    }

    fn scan(&self, hint: Option<PathBuf>) -> BoxFuture<'_, Result<Vec<Runtime>, DiscoveryError>> {
        Box::pin(async move {
            let mut found = BTreeMap::new();
            for (dir, source) in self.directories(hint.as_deref()) {
                self.scan_dir(&dir, source, &mut found).await?;
            }
            debug!(strategy = %self.name, count = found.len(), "Directory scan complete");
            Ok(found.into_values().collect())
        })
    }

    #[cfg(feature = "fs-watch")]
    fn watchers(&self, hint: Option<&Path>) -> Vec<Arc<dyn Watcher>> {
        let dirs = self.directories(hint).into_iter().map(|(dir, _)| dir);
        match crate::watcher::FsWatcher::new(dirs) {
            Ok(watcher) => vec![Arc::new(watcher) as Arc<dyn Watcher>],
            Err(e) => {
                tracing::warn!(strategy = %self.name, error = %e, "Failed to create directory watcher");
                Vec::new()
            }
        }
    }

    #[cfg(not(feature = "fs-watch"))]
    fn watchers(&self, _hint: Option<&Path>) -> Vec<Arc<dyn Watcher>> {
        Vec::new()
    }
}

impl std::fmt::Debug for DirectoryScanStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryScanStrategy")
            .field("name", &self.name)
            .field("search_paths", &self.search_paths)
            .field("workspace_dirs", &self.workspace_dirs)
            .field("patterns", &self.patterns())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::StaticWorkspaceResolver;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"").unwrap();
    }

    #[tokio::test]
    async fn test_scan_matches_default_pattern() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "python3");
        touch(temp.path(), "python3.12");
        touch(temp.path(), "ruby");

        let strategy = DirectoryScanStrategy::new("path").with_search_paths([temp.path()]);
        let runtimes = strategy.scan(None).await.unwrap();

        assert_eq!(runtimes.len(), 2);
        assert!(runtimes.iter().all(|r| r.id.contains("python")));
        assert_eq!(
            runtimes[0].attributes.get(SOURCE_ATTRIBUTE).map(String::as_str),
            Some("search_path")
        );
    }

    #[tokio::test]
    async fn test_missing_directory_is_skipped() {
        let temp = TempDir::new().unwrap();
        let strategy =
            DirectoryScanStrategy::new("path").with_search_paths([temp.path().join("nope")]);
        assert!(strategy.scan(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_subdirectories_are_not_runtimes() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("python-docs")).unwrap();

        let strategy = DirectoryScanStrategy::new("path").with_search_paths([temp.path()]);
        assert!(strategy.scan(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_workspace_dirs_resolve_against_workspace_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("proj");
        let bin = root.join(".venv").join("bin");
        std::fs::create_dir_all(&bin).unwrap();
        std::fs::create_dir_all(root.join("src")).unwrap();
        touch(&bin, "python");

        let strategy = DirectoryScanStrategy::new("venv")
            .with_workspace_dirs([".venv/bin"])
            .with_resolver(Arc::new(StaticWorkspaceResolver::new([&root])));

        let runtimes = strategy.scan(Some(root.join("src"))).await.unwrap();
        assert_eq!(runtimes.len(), 1);
        assert_eq!(runtimes[0].executable.as_deref(), Some(bin.join("python").as_path()));

        assert!(strategy.scan(None).await.unwrap().is_empty());
    }

    #[test]
    fn test_custom_patterns() {
        let strategy = DirectoryScanStrategy::new("path")
            .with_patterns(["node*", "deno"])
            .unwrap();
        assert_eq!(strategy.patterns(), vec!["node*", "deno"]);
        assert!(strategy.matches("node18"));
        assert!(!strategy.matches("python3"));
    }

    #[test]
    fn test_invalid_pattern_is_error() {
        assert!(DirectoryScanStrategy::new("path").with_patterns(["[py"]).is_err());
    }

    #[test]
    fn test_directories_are_deduplicated() {
        let strategy = DirectoryScanStrategy::new("path").with_search_paths(["/a", "/b", "/a"]);
        let dirs = strategy.directories(None);
        assert_eq!(dirs.len(), 2);
    }
}
