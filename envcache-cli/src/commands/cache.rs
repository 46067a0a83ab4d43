//! Snapshot management CLI commands.

use clap::Subcommand;
use envcache::config::ConfigFile;
use envcache::JsonFileSnapshotStore;

use super::common::path_to_display;
use crate::error::CliError;

/// Cache action subcommands.
#[derive(Debug, Subcommand)]
pub enum CacheAction {
    /// List persisted discovery snapshots
    Show,
    /// Delete every persisted snapshot
    Clear,
}

/// Run a cache subcommand.
pub fn run(config: &ConfigFile, action: CacheAction) -> Result<(), CliError> {
    let store = JsonFileSnapshotStore::new(&config.store.directory);
    let store_dir = path_to_display(store.root());

    match action {
        CacheAction::Show => {
            let infos = store.list()?;
            println!("Snapshot store: {}", store_dir);

            if infos.is_empty() {
                println!("  (empty)");
                return Ok(());
            }

            for info in infos {
                println!(
                    "  [{}] {}  {} runtime(s), saved {}",
                    info.scope,
                    info.key,
                    info.runtime_count,
                    info.age_human()
                );
            }
            Ok(())
        }
        CacheAction::Clear => {
            println!("Clearing snapshots at: {}", store_dir);
            let removed = store.clear()?;
            println!("Deleted {} snapshot(s)", removed);
            Ok(())
        }
    }
}
