use anyhow::Context;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod config;
pub mod db;
pub mod repository;
pub mod service;

use crate::api::AppState;
use crate::config::Config;
use crate::repository::{
    FileLogSource, HttpLogSource, HttpRunnerControl, InMemoryRunnerStore, LogSource,
    PgRunnerStore, RunnerStore,
};
use crate::service::Supervisor;
use crate::service::log_service::LogService;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "corral_manager=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let version = api::system::version_info();
    tracing::info!("Starting Corral Manager...");
    tracing::info!("Version: {}", version.version);
    tracing::info!(
        "Git Commit: {} ({})",
        version.git_commit,
        version.git_branch
    );
    tracing::info!("Build Time: {}", version.build_time);

    let config = Config::from_env();
    config.validate()?;

    let store: Arc<dyn RunnerStore> = match &config.database_url {
        Some(database_url) => {
            tracing::info!("Connecting to database...");

            let pool = db::create_pool(database_url)
                .await
                .context("Failed to create database pool")?;

            tracing::info!("Database connection pool created");

            db::run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;

            Arc::new(PgRunnerStore::new(pool))
        }
        None => {
            tracing::info!("DATABASE_URL not set, keeping runners in memory");
            Arc::new(InMemoryRunnerStore::new())
        }
    };

    let control = Arc::new(
        HttpRunnerControl::new(config.probe_timeout)
            .context("Failed to build runner control client")?,
    );
    let supervisor = Supervisor::new(
        Arc::clone(&store),
        control,
        config.probe_timeout,
        config.restart_timeout,
    );

    let log_source: Arc<dyn LogSource> = match &config.log_dir {
        Some(dir) => {
            tracing::info!("Reading runner logs from {}", dir.display());
            Arc::new(FileLogSource::new(dir.clone()))
        }
        None => {
            tracing::info!("Proxying runner logs from runner agents");
            Arc::new(
                HttpLogSource::new(config.probe_timeout)
                    .context("Failed to build log client")?,
            )
        }
    };
    let logs = Arc::new(LogService::new(
        Arc::clone(&store),
        log_source,
        config.log_tail_lines,
        config.log_max_bytes,
        config.log_fetch_timeout,
    ));

    // Runs for the lifetime of the process
    let _refresh = config
        .refresh_interval
        .map(|interval| supervisor.spawn_refresh_loop(interval));

    let state = AppState {
        store,
        supervisor,
        logs,
    };

    // Build router with all API endpoints
    let app = api::create_router(state, config.static_dir.clone());

    tracing::info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .await
        .context("Failed to start server")?;

    Ok(())
}
