//! Shared helpers for CLI commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use envcache::config::{ConfigFile, DiscoverySettings};
use envcache::workspace::NoWorkspace;
use envcache::{
    DirectoryScanStrategy, DiscoveryOrchestrator, JsonFileSnapshotStore, Runtime,
    StaticWorkspaceResolver, WorkspaceResolver,
};

use crate::error::CliError;

/// Resolver for an optional `--workspace` directory.
pub fn workspace_resolver(workspace: Option<&Path>) -> Arc<dyn WorkspaceResolver> {
    match workspace {
        Some(root) => Arc::new(StaticWorkspaceResolver::new([root])),
        None => Arc::new(NoWorkspace),
    }
}

/// Directory strategy from the `[discovery]` settings.
///
/// Empty `search_paths` means the entries of `$PATH`.
pub fn build_strategy(
    settings: &DiscoverySettings,
    resolver: Arc<dyn WorkspaceResolver>,
) -> Result<DirectoryScanStrategy, CliError> {
    let strategy = DirectoryScanStrategy::new(settings.name.clone())
        .with_workspace_dirs(settings.workspace_dirs.iter().cloned())
        .with_resolver(resolver)
        .with_patterns(&settings.patterns)
        .map_err(|e| CliError::Strategy(e.to_string()))?;

    Ok(if settings.search_paths.is_empty() {
        strategy.with_path_env()
    } else {
        strategy.with_search_paths(settings.search_paths.iter().cloned())
    })
}

/// Orchestrator wired from the config file, persisting to the store directory.
pub fn build_orchestrator(
    config: &ConfigFile,
    workspace: Option<&Path>,
) -> Result<DiscoveryOrchestrator, CliError> {
    let resolver = workspace_resolver(workspace);
    let strategy = build_strategy(&config.discovery, Arc::clone(&resolver))?;

    Ok(DiscoveryOrchestrator::builder(Arc::new(strategy))
        .config(config.discovery_config())
        .resolver(resolver)
        .store(Arc::new(JsonFileSnapshotStore::new(&config.store.directory)))
        .build())
}

/// Absolute form of `--workspace`, so keys do not depend on the current directory.
pub fn absolute_workspace(workspace: Option<PathBuf>) -> Option<PathBuf> {
    workspace.map(|path| std::fs::canonicalize(&path).unwrap_or(path))
}

/// One line per runtime for human-readable output.
pub fn format_runtime(runtime: &Runtime) -> String {
    let mut line = format!("  {}", runtime.id);
    if let Some(version) = &runtime.version {
        line.push_str(&format!("  ({})", version));
    }
    if runtime.cached_entry {
        line.push_str("  [cached]");
    }
    line
}

/// Convert path to display string, collapsing home dir to ~.
pub fn path_to_display(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}
