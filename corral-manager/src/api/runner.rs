//! Runner API Handlers
//!
//! HTTP endpoints for runner registration, lifecycle and logs.
//! Malformed bodies and query strings are answered in the same
//! `{ success, message }` shape as every other failure.

use axum::{
    Json,
    extract::{
        Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
};
use corral_core::domain::runner::RunnerRecord;
use corral_core::dto::runner::{
    ActionResponse, DeleteRunner, LogsResponse, RegisterRunner, RestartRunner, RunnerQuery,
    StatusResponse,
};

use crate::api::AppState;
use crate::api::error::{ApiError, ApiResult};
use crate::service::runner_service;

fn invalid_body<E: std::fmt::Display>(err: E) -> ApiError {
    tracing::debug!("Rejected request: {}", err);
    ApiError::BadRequest("Invalid request body".to_string())
}

// =============================================================================
// Runner Registration & Lifecycle
// =============================================================================

/// POST /api/runners/register
/// Register a new runner
pub async fn register_runner(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRunner>, JsonRejection>,
) -> ApiResult<Json<ActionResponse>> {
    let Json(req) = payload.map_err(invalid_body)?;

    tracing::info!("Registering runner: {}", req.name);

    let runner = runner_service::register_runner(state.store.as_ref(), req).await?;
    state.supervisor.spawn_initial_probe(runner.name);

    Ok(Json(ActionResponse::ok("Runner registered successfully")))
}

/// POST /api/runners/restart
/// Restart a runner's process
pub async fn restart_runner(
    State(state): State<AppState>,
    payload: Result<Json<RestartRunner>, JsonRejection>,
) -> ApiResult<Json<ActionResponse>> {
    let Json(req) = payload.map_err(invalid_body)?;

    let name = req.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Runner name is required".to_string()));
    }

    state.supervisor.restart(name).await?;

    Ok(Json(ActionResponse::ok(format!(
        "Runner {} restarted successfully",
        name
    ))))
}

/// POST /api/runners/delete
/// Stop and unregister a runner; the token must match
pub async fn delete_runner(
    State(state): State<AppState>,
    payload: Result<Json<DeleteRunner>, JsonRejection>,
) -> ApiResult<Json<ActionResponse>> {
    let Json(req) = payload.map_err(invalid_body)?;

    tracing::info!("Deleting runner: {}", req.name);

    let runner = runner_service::delete_runner(state.store.as_ref(), req).await?;
    state.supervisor.stop(&runner).await;

    Ok(Json(ActionResponse::ok("Runner unregistered successfully")))
}

// =============================================================================
// Runner Query Endpoints
// =============================================================================

/// GET /api/runners
/// List all registered runners as a bare array
pub async fn list_runners(State(state): State<AppState>) -> ApiResult<Json<Vec<RunnerRecord>>> {
    tracing::debug!("Listing all runners");

    let runners = runner_service::list_runners(state.store.as_ref()).await?;

    Ok(Json(runners))
}

/// GET /api/runners/logs?name=<name>
/// Recent log output of a runner
pub async fn get_runner_logs(
    State(state): State<AppState>,
    query: Result<Query<RunnerQuery>, QueryRejection>,
) -> ApiResult<Json<LogsResponse>> {
    let Query(query) = query.map_err(invalid_body)?;

    tracing::debug!("Fetching logs for runner: {}", query.name);

    let logs = state.logs.fetch_logs(&query.name).await?;

    Ok(Json(LogsResponse {
        success: true,
        name: Some(query.name.trim().to_string()),
        logs: Some(logs),
        message: None,
    }))
}

/// GET /api/runners/status?name=<name>
/// Probe a runner now and return its status
pub async fn get_runner_status(
    State(state): State<AppState>,
    query: Result<Query<RunnerQuery>, QueryRejection>,
) -> ApiResult<Json<StatusResponse>> {
    let Query(query) = query.map_err(invalid_body)?;

    let name = query.name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Runner name is required".to_string()));
    }

    let status = state.supervisor.probe_status(name).await?;

    Ok(Json(StatusResponse {
        success: true,
        name: name.to_string(),
        status,
    }))
}
