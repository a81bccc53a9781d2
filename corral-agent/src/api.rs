//! Control endpoint
//!
//! The HTTP surface the manager drives: status probes, restart and stop
//! commands, and log fetches. Everything except status and health requires
//! `Authorization: Bearer <token>`.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use corral_core::domain::runner::tokens_match;
use corral_core::dto::agent::{AgentLogs, AgentLogsQuery, AgentStatus};
use corral_core::dto::runner::ActionResponse;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::service::{LogBufferService, ProcessService};

/// Shared state of the control endpoint
#[derive(Clone)]
pub struct AgentState {
    pub process: Arc<dyn ProcessService>,
    pub logs: Arc<dyn LogBufferService>,
    pub token: Arc<str>,
    /// Upper bound on the bytes a `/logs` answer carries
    pub max_log_bytes: usize,
}

/// Creates the agent's router
pub fn create_router(state: AgentState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(status))
        .route("/restart", post(restart))
        .route("/stop", post(stop))
        .route("/logs", get(logs))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug)]
enum AgentError {
    Unauthorized,
    Internal(String),
}

impl IntoResponse for AgentError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AgentError::Unauthorized => (StatusCode::UNAUTHORIZED, "Invalid token".to_string()),
            AgentError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(ActionResponse::failed(message))).into_response()
    }
}

fn authorize(state: &AgentState, headers: &HeaderMap) -> Result<(), AgentError> {
    let presented = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .unwrap_or_default();

    if presented.is_empty() || !tokens_match(&state.token, presented) {
        tracing::warn!("Rejected control call with missing or invalid token");
        return Err(AgentError::Unauthorized);
    }

    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}

async fn status(State(state): State<AgentState>) -> Json<AgentStatus> {
    Json(state.process.status().await)
}

async fn restart(
    State(state): State<AgentState>,
    headers: HeaderMap,
) -> Result<Json<ActionResponse>, AgentError> {
    authorize(&state, &headers)?;

    tracing::info!("Restart requested");
    state.process.restart().await.map_err(|e| {
        tracing::error!("Failed to restart process: {:#}", e);
        AgentError::Internal("Failed to restart process".to_string())
    })?;

    Ok(Json(ActionResponse::ok("Process restarted")))
}

async fn stop(
    State(state): State<AgentState>,
    headers: HeaderMap,
) -> Result<Json<ActionResponse>, AgentError> {
    authorize(&state, &headers)?;

    tracing::info!("Stop requested");
    let stopped = state.process.stop().await.map_err(|e| {
        tracing::error!("Failed to stop process: {:#}", e);
        AgentError::Internal("Failed to stop process".to_string())
    })?;

    Ok(Json(ActionResponse::ok(if stopped {
        "Process stopped"
    } else {
        "Process was not running"
    })))
}

async fn logs(
    State(state): State<AgentState>,
    headers: HeaderMap,
    Query(query): Query<AgentLogsQuery>,
) -> Result<Json<AgentLogs>, AgentError> {
    authorize(&state, &headers)?;

    let max_bytes = query
        .max_bytes
        .map_or(state.max_log_bytes, |n| n.min(state.max_log_bytes));

    Ok(Json(AgentLogs {
        logs: state.logs.tail(query.lines, max_bytes),
    }))
}
