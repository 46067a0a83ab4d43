//! Long-running discovery with live invalidation.
//!
//! Runs an initial discovery, then prints every scan the orchestrator starts
//! (for example after a new interpreter appears in a watched directory) until
//! Ctrl-C.

use std::path::PathBuf;

use clap::Args;
use envcache::config::ConfigFile;
use envcache::{DiscoveryOptions, PendingResult};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::common;
use crate::error::CliError;

/// Arguments for `envcache watch`.
#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Workspace folder to discover runtimes for
    #[arg(long)]
    pub workspace: Option<PathBuf>,
}

/// Run `envcache watch`.
pub async fn run(config: &ConfigFile, args: WatchArgs) -> Result<(), CliError> {
    let workspace = common::absolute_workspace(args.workspace);
    let hint = workspace.as_deref();
    let orchestrator = common::build_orchestrator(config, hint)?;
    let mut started = orchestrator.subscribe_discovery_started();

    let cancellation = CancellationToken::new();
    let token = cancellation.clone();
    ctrlc::set_handler(move || token.cancel())
        .map_err(|e| CliError::SignalHandler(e.to_string()))?;

    let initial = orchestrator
        .request_discovery(hint, DiscoveryOptions::default())
        .await?;
    println!("{} runtime(s) known, watching for changes (Ctrl-C to stop)", initial.len());

    loop {
        tokio::select! {
            _ = cancellation.cancelled() => break,
            event = started.recv() => match event {
                Some(pending) => report(pending),
                None => break,
            },
        }
    }

    orchestrator.dispose();
    info!(metrics = %orchestrator.metrics(), "Stopped watching");
    Ok(())
}

/// Print the start of a scan, and its outcome once it settles.
fn report(pending: PendingResult) {
    println!("Discovery #{} started", pending.id());
    tokio::spawn(async move {
        match pending.wait().await {
            Ok(runtimes) => {
                println!("Discovery #{} found {} runtime(s):", pending.id(), runtimes.len());
                for runtime in &runtimes {
                    println!("{}", common::format_runtime(runtime));
                }
            }
            Err(e) => println!("Discovery #{} failed: {}", pending.id(), e),
        }
    });
}
