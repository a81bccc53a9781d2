//! API Module
//!
//! HTTP API layer for the manager.
//! Each submodule handles endpoints for a specific domain.

pub mod error;
pub mod runner;
pub mod system;

use axum::{
    Router,
    http::{Method, header},
    routing::{get, post},
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::repository::RunnerStore;
use crate::service::Supervisor;
use crate::service::log_service::LogService;

/// Shared state handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RunnerStore>,
    pub supervisor: Supervisor,
    pub logs: Arc<LogService>,
}

/// Create the main API router with all endpoints
///
/// When `static_dir` is set, unmatched paths are served from it so the
/// admin panel and the API share one origin.
pub fn create_router(state: AppState, static_dir: Option<PathBuf>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    let router = Router::new()
        // Health check
        .route("/health", get(system::health_check))
        // Runner endpoints
        .route("/api/runners", get(runner::list_runners))
        .route("/api/runners/register", post(runner::register_runner))
        .route("/api/runners/restart", post(runner::restart_runner))
        .route("/api/runners/delete", post(runner::delete_runner))
        .route("/api/runners/logs", get(runner::get_runner_logs))
        .route("/api/runners/status", get(runner::get_runner_status))
        // System endpoints
        .route("/api/version", get(system::version));

    let router = match static_dir {
        Some(dir) => router.fallback_service(ServeDir::new(dir)),
        None => router,
    };

    router
        // Add state and middleware
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
