//! Runner command handlers
//!
//! Handles all runner-related CLI commands.

use anyhow::{Context, Result};
use clap::Subcommand;
use colored::*;
use corral_core::domain::runner::{RunnerRecord, RunnerStatus};

use crate::config::Config;
use corral_client::ManagerClient;

/// Runner subcommands
#[derive(Subcommand)]
pub enum RunnerCommands {
    /// List all registered runners
    List,
    /// Register a new runner
    Register {
        /// Unique runner name
        #[arg(long)]
        name: String,
        /// Base URL of the runner's control endpoint
        #[arg(long)]
        url: String,
        /// Shared secret, needed again to delete the runner
        #[arg(long, env = "CORRAL_RUNNER_TOKEN")]
        token: String,
    },
    /// Restart a runner's process
    Restart {
        /// Runner name
        name: String,
    },
    /// Stop and unregister a runner
    Delete {
        /// Runner name
        name: String,
        /// Token the runner was registered with
        #[arg(long, env = "CORRAL_RUNNER_TOKEN")]
        token: String,
    },
    /// Show a runner's recent log output
    Logs {
        /// Runner name
        name: String,
    },
    /// Probe a runner now and show its status
    Status {
        /// Runner name
        name: String,
    },
}

/// Handle runner commands
///
/// Routes runner subcommands to their respective handlers.
pub async fn handle_runner_command(command: RunnerCommands, config: &Config) -> Result<()> {
    let client = ManagerClient::new(&config.manager_url);

    match command {
        RunnerCommands::List => list_runners(&client).await,
        RunnerCommands::Register { name, url, token } => {
            let response = client
                .register_runner(&name, &url, &token)
                .await
                .context("Failed to register runner")?;
            print_success(response.message.as_deref(), "Runner registered");
            Ok(())
        }
        RunnerCommands::Restart { name } => {
            let response = client
                .restart_runner(&name)
                .await
                .with_context(|| format!("Failed to restart runner {}", name))?;
            print_success(response.message.as_deref(), "Runner restarted");
            Ok(())
        }
        RunnerCommands::Delete { name, token } => {
            let response = client
                .delete_runner(&name, &token)
                .await
                .with_context(|| format!("Failed to delete runner {}", name))?;
            print_success(response.message.as_deref(), "Runner deleted");
            Ok(())
        }
        RunnerCommands::Logs { name } => {
            let logs = client
                .runner_logs(&name)
                .await
                .with_context(|| format!("Failed to fetch logs for runner {}", name))?;
            print!("{}", logs);
            if !logs.ends_with('\n') {
                println!();
            }
            Ok(())
        }
        RunnerCommands::Status { name } => {
            let status = client.runner_status(&name).await?;
            println!("{} {}", name.bold(), colorize_status(&status));
            Ok(())
        }
    }
}

/// List all registered runners
async fn list_runners(client: &ManagerClient) -> Result<()> {
    let runners = client.list_runners().await?;

    if runners.is_empty() {
        println!("{}", "No runners registered.".yellow());
    } else {
        println!(
            "{}",
            format!("Found {} registered runner(s):", runners.len()).bold()
        );
        println!();
        for runner in runners {
            print_runner_summary(&runner);
        }
    }

    Ok(())
}

fn print_success(message: Option<&str>, fallback: &str) {
    println!("{} {}", "✓".green(), message.unwrap_or(fallback));
}

/// Print a runner summary
fn print_runner_summary(runner: &RunnerRecord) {
    println!("  {} Runner {}", "▸".cyan(), runner.name.bold());
    println!("    Status:       {}", colorize_status(&runner.status));
    println!("    URL:          {}", runner.url);
    println!("    Token:        {}", runner.token.dimmed());
    println!(
        "    Registered:   {}",
        runner
            .registered_at
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    if let Some(checked) = runner.last_checked_at {
        println!(
            "    Last Check:   {}",
            checked.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
        );
    }
    println!();
}

/// Colorize runner status for display
fn colorize_status(status: &RunnerStatus) -> colored::ColoredString {
    match status {
        RunnerStatus::Running => status.as_str().green(),
        RunnerStatus::Stopped => status.as_str().red(),
        RunnerStatus::Unknown => status.as_str().yellow(),
    }
}
