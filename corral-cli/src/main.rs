//! Corral CLI
//!
//! Command-line interface for the Corral runner manager.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;

#[derive(Parser)]
#[command(name = "corral")]
#[command(about = "Corral runner fleet manager CLI", long_about = None)]
struct Cli {
    /// Manager URL
    #[arg(long, env = "CORRAL_MANAGER_URL", default_value = "http://localhost:8098")]
    manager_url: String,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = Config {
        manager_url: cli.manager_url,
    };

    handle_command(cli.command, &config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_delete() {
        let cli = Cli::try_parse_from([
            "corral",
            "--manager-url",
            "http://manager:8098",
            "runner",
            "delete",
            "build-01",
            "--token",
            "s3cret",
        ])
        .unwrap();

        assert_eq!(cli.manager_url, "http://manager:8098");
        assert!(matches!(
            cli.command,
            Commands::Runner {
                command: commands::RunnerCommands::Delete { ref name, ref token }
            } if name == "build-01" && token == "s3cret"
        ));
    }
}
