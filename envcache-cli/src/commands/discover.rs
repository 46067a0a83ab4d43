//! One-shot runtime discovery.

use std::path::PathBuf;

use clap::Args;
use envcache::config::ConfigFile;
use envcache::{DiscoveryOptions, Runtime};
use tracing::{debug, info};

use super::common;
use crate::error::CliError;

/// Arguments for `envcache discover`.
#[derive(Debug, Args)]
pub struct DiscoverArgs {
    /// Workspace folder to discover runtimes for
    #[arg(long)]
    pub workspace: Option<PathBuf>,

    /// Ignore cached results and persisted snapshots, always rescan
    #[arg(long)]
    pub ignore_cache: bool,

    /// When a persisted snapshot is served, wait for the fresh scan and print that instead
    #[arg(long)]
    pub wait: bool,

    /// Print runtimes as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run `envcache discover`.
pub async fn run(config: &ConfigFile, args: DiscoverArgs) -> Result<(), CliError> {
    let workspace = common::absolute_workspace(args.workspace);
    let hint = workspace.as_deref();
    let orchestrator = common::build_orchestrator(config, hint)?;

    let options = DiscoveryOptions {
        ignore_cache: args.ignore_cache,
    };
    let mut runtimes = orchestrator.request_discovery(hint, options).await?;
    let from_snapshot = runtimes.iter().any(|r| r.cached_entry);

    // The background scan refreshes the snapshot; let it finish before exiting.
    let pending = orchestrator.cached(hint);
    if from_snapshot && args.wait {
        if let Some(pending) = &pending {
            runtimes = pending.wait().await?;
        }
    }

    print_runtimes(&runtimes, args.json)?;

    if let Some(pending) = pending.filter(|p| !p.is_settled()) {
        info!("Refreshing snapshot in background");
        if let Err(e) = pending.wait().await {
            debug!(error = %e, "Background refresh failed");
        }
    }

    Ok(())
}

fn print_runtimes(runtimes: &[Runtime], json: bool) -> Result<(), CliError> {
    if json {
        let text =
            serde_json::to_string_pretty(runtimes).map_err(|e| CliError::Output(e.to_string()))?;
        println!("{}", text);
        return Ok(());
    }

    if runtimes.is_empty() {
        println!("No runtimes found.");
        return Ok(());
    }

    let cached = runtimes.iter().filter(|r| r.cached_entry).count();
    println!("Found {} runtime(s):", runtimes.len());
    for runtime in runtimes {
        println!("{}", common::format_runtime(runtime));
    }
    if cached > 0 {
        println!();
        println!("Served from snapshot; run with --wait for a fresh scan.");
    }
    Ok(())
}
