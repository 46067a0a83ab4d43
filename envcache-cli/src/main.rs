//! envcache CLI - Command-line interface
//!
//! Runs cached runtime discovery from the shell and manages the persisted
//! snapshots it leaves behind.

mod commands;
mod error;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use envcache::config::ConfigFile;
use envcache::logging::{init_logging, LoggingGuard};

use commands::cache::CacheAction;
use commands::config::ConfigAction;
use commands::discover::DiscoverArgs;
use commands::watch::WatchArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "envcache")]
#[command(version = envcache::VERSION)]
#[command(about = "Cached discovery of installed language runtimes", long_about = None)]
struct Cli {
    /// Configuration file (defaults to ~/.envcache/config.ini)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Also write logs to the file configured in [logging]
    #[arg(long, global = true)]
    log_file: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Discover runtimes, using cached results when available
    Discover(DiscoverArgs),
    /// Discover runtimes and keep rescanning as watched directories change
    Watch(WatchArgs),
    /// Manage persisted discovery snapshots
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

fn main() {
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        e.exit();
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = match &cli.config {
        Some(path) => ConfigFile::load_from(path)?,
        None => ConfigFile::load()?,
    };

    let _logging_guard = setup_logging(&config, cli.verbose, cli.log_file)?;

    match cli.command {
        Commands::Discover(args) => block_on(commands::discover::run(&config, args)),
        Commands::Watch(args) => block_on(commands::watch::run(&config, args)),
        Commands::Cache { action } => commands::cache::run(&config, action),
        Commands::Config { action } => commands::config::run(&config, action),
    }
}

fn setup_logging(
    config: &ConfigFile,
    verbose: bool,
    log_file: bool,
) -> Result<LoggingGuard, CliError> {
    let log_dir = log_file.then_some(config.logging.directory.as_path());
    init_logging(log_dir, &config.logging.file, verbose)
        .map_err(|e| CliError::LoggingInit(e.to_string()))
}

fn block_on<F>(future: F) -> Result<(), CliError>
where
    F: std::future::Future<Output = Result<(), CliError>>,
{
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(CliError::Runtime)?;
    runtime.block_on(future)
}
