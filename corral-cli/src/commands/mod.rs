//! Commands module
//!
//! Defines all CLI commands and their handlers.

mod runner;
mod version;

pub use runner::RunnerCommands;

use anyhow::Result;
use clap::Subcommand;

use crate::config::Config;

/// Top-level CLI commands
#[derive(Subcommand)]
pub enum Commands {
    /// Runner management
    Runner {
        #[command(subcommand)]
        command: RunnerCommands,
    },
    /// Show the manager's build information
    Version,
}

/// Handle a CLI command
///
/// Routes the command to the appropriate handler module.
pub async fn handle_command(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Runner { command } => runner::handle_runner_command(command, config).await,
        Commands::Version => version::show_version(config).await,
    }
}
