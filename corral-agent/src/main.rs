//! Corral Agent
//!
//! Runs next to a worker process and exposes the control endpoint the
//! manager uses to probe, restart and stop it, and to read its output.
//!
//! Architecture:
//! - Configuration: Load settings from environment
//! - Services: Process supervision and output buffering
//! - API: Token-protected HTTP control endpoint
//!
//! When a manager is configured the agent registers itself on start.

mod api;
mod config;
mod service;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::AgentState;
use crate::config::{Config, Registration};
use crate::service::{InMemoryLogBuffer, LogBufferService, ProcessService, ShellProcessService};
use corral_client::ManagerClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "corral_agent=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Corral Agent");

    let config = Config::from_env()?;
    config.validate()?;
    info!(
        "Loaded configuration: command=`{}`, bind_addr={}",
        config.command, config.bind_addr
    );

    let logs: Arc<dyn LogBufferService> = Arc::new(InMemoryLogBuffer::new(config.log_buffer_lines));
    let process: Arc<dyn ProcessService> = Arc::new(ShellProcessService::new(
        config.command.clone(),
        Arc::clone(&logs),
    ));

    if config.autostart {
        process
            .start()
            .await
            .context("Failed to start supervised process")?;
    }

    if let Some(registration) = config.registration.clone() {
        let token = config.token.clone();
        tokio::spawn(async move {
            if let Err(e) = register_with_retry(&registration, &token).await {
                error!("{:#}", e);
            }
        });
    }

    let state = AgentState {
        process: Arc::clone(&process),
        logs,
        token: Arc::from(config.token.as_str()),
        max_log_bytes: config.log_max_bytes,
    };
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!("Control endpoint listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Failed to start server")?;

    info!("Shutting down, stopping supervised process");
    process.stop().await?;

    Ok(())
}

/// Resolves on Ctrl+C or, on Unix, SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C signal"),
        _ = terminate => info!("Received SIGTERM signal"),
    }
}

/// Register with the manager with retry logic and exponential backoff
///
/// The manager may not be reachable yet when the agent starts. A runner that
/// is already registered under the same name counts as registered.
async fn register_with_retry(registration: &Registration, token: &str) -> Result<()> {
    const MAX_RETRIES: u32 = 10;
    const INITIAL_DELAY_MS: u64 = 500;
    const MAX_DELAY_MS: u64 = 30_000;

    let client = ManagerClient::new(registration.manager_url.clone());
    let mut attempt = 0;
    let mut delay_ms = INITIAL_DELAY_MS;

    loop {
        attempt += 1;

        match client
            .register_runner(&registration.name, &registration.public_url, token)
            .await
        {
            Ok(_) => {
                info!(
                    "Registered as {} with manager after {} attempt(s)",
                    registration.name, attempt
                );
                return Ok(());
            }
            Err(e) if e.is_conflict() => {
                info!("Runner {} is already registered", registration.name);
                return Ok(());
            }
            Err(e) if e.is_client_error() => {
                return Err(anyhow::anyhow!("Manager rejected registration: {}", e));
            }
            Err(e) => {
                if attempt >= MAX_RETRIES {
                    return Err(anyhow::anyhow!(
                        "Failed to register with manager after {} attempts: {}",
                        MAX_RETRIES,
                        e
                    ));
                }

                warn!(
                    "Failed to register with manager (attempt {}/{}): {}",
                    attempt, MAX_RETRIES, e
                );
                warn!("Retrying in {} ms...", delay_ms);

                tokio::time::sleep(Duration::from_millis(delay_ms)).await;

                // Exponential backoff with cap
                delay_ms = (delay_ms * 2).min(MAX_DELAY_MS);
            }
        }
    }
}
