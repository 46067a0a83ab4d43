//! Configuration inspection CLI commands.

use clap::Subcommand;
use envcache::config::{config_file_path, ConfigFile};

use super::common::path_to_display;
use crate::error::CliError;

/// Config action subcommands.
#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    /// Print the effective configuration
    Show,
    /// Print the path of the configuration file
    Path,
}

/// Run a config subcommand.
pub fn run(config: &ConfigFile, action: ConfigAction) -> Result<(), CliError> {
    let path = config_file_path();

    match action {
        ConfigAction::Show => {
            let origin = if path.exists() { "" } else { " (not found, using defaults)" };
            println!("# {}{}", path_to_display(&path), origin);
            print!("{}", config.to_config_string());
        }
        ConfigAction::Path => println!("{}", path.display()),
    }

    Ok(())
}
