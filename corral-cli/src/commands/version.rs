//! Version command handler

use anyhow::Result;
use colored::*;
use corral_client::ManagerClient;

use crate::config::Config;

/// Print the manager's build information
pub async fn show_version(config: &Config) -> Result<()> {
    let client = ManagerClient::new(&config.manager_url);
    let info = client.version().await?;

    println!("{} {}", "Corral Manager".bold(), info.version.green());
    println!("  Commit:     {} ({})", info.git_commit, info.git_branch.dimmed());
    println!("  Built:      {}", info.build_time.dimmed());

    Ok(())
}
