//! Workspace folder resolution.
//!
//! Per-workspace cache keys need to know which workspace folder a partition
//! hint belongs to. The resolver is an injected collaborator; this module
//! provides the trait plus a static, prefix-matching implementation.

use std::path::{Path, PathBuf};

/// An open workspace folder.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WorkspaceFolder {
    /// Filesystem root of the folder.
    pub root: PathBuf,
}

impl WorkspaceFolder {
    /// Create a workspace folder rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

/// Maps a partition hint (a file or directory) to its workspace folder.
pub trait WorkspaceResolver: Send + Sync {
    /// Returns the workspace folder containing `resource`, or `None` when no
    /// folders are open or `resource` lies outside all of them.
    fn workspace_folder(&self, resource: &Path) -> Option<WorkspaceFolder>;
}

/// Resolver used when no workspace is open.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoWorkspace;

impl WorkspaceResolver for NoWorkspace {
    fn workspace_folder(&self, _resource: &Path) -> Option<WorkspaceFolder> {
        None
    }
}

/// Resolver over a fixed list of folder roots.
///
/// When folders are nested the deepest root containing the resource wins.
#[derive(Debug, Default, Clone)]
pub struct StaticWorkspaceResolver {
    folders: Vec<WorkspaceFolder>,
}

impl StaticWorkspaceResolver {
    /// Create a resolver over the given roots.
    pub fn new<I, P>(roots: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            folders: roots.into_iter().map(WorkspaceFolder::new).collect(),
        }
    }

    /// The configured folders.
    pub fn folders(&self) -> &[WorkspaceFolder] {
        &self.folders
    }
}

impl WorkspaceResolver for StaticWorkspaceResolver {
    fn workspace_folder(&self, resource: &Path) -> Option<WorkspaceFolder> {
        self.folders
            .iter()
            .filter(|folder| resource.starts_with(&folder.root))
            .max_by_key(|folder| folder.root.components().count())
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_workspace_never_resolves() {
        assert!(NoWorkspace.workspace_folder(Path::new("/src/app")).is_none());
    }

    #[test]
    fn test_static_resolver_matches_prefix() {
        let resolver = StaticWorkspaceResolver::new(["/work/a", "/work/b"]);

        let folder = resolver
            .workspace_folder(Path::new("/work/b/src/main.py"))
            .unwrap();
        assert_eq!(folder.root, PathBuf::from("/work/b"));
    }

    #[test]
    fn test_static_resolver_prefers_deepest_root() {
        let resolver = StaticWorkspaceResolver::new(["/work", "/work/nested"]);

        let folder = resolver
            .workspace_folder(Path::new("/work/nested/x.py"))
            .unwrap();
        assert_eq!(folder.root, PathBuf::from("/work/nested"));
    }

    #[test]
    fn test_static_resolver_outside_all_folders() {
        let resolver = StaticWorkspaceResolver::new(["/work/a"]);
        // Component-wise matching, so a shared string prefix is not enough
        assert!(resolver.workspace_folder(Path::new("/work/ab")).is_none());
        assert!(resolver.workspace_folder(Path::new("/other")).is_none());
    }
}
