//! API Error Handling
//!
//! Unified error type for API responses. Every failure leaves the API as
//! `{ "success": false, "message": ... }`; internal details are logged, not sent.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use corral_core::dto::runner::ActionResponse;

use crate::repository::StoreError;
use crate::service::log_service::LogError;
use crate::service::runner_service::RunnerError;

/// API error type
#[derive(Debug)]
pub enum ApiError {
    NotFound(String),
    BadRequest(String),
    Conflict(String),
    Forbidden(String),
    BadGateway(String),
    GatewayTimeout(String),
    StoreError(StoreError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            ApiError::BadGateway(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::GatewayTimeout(msg) => (StatusCode::GATEWAY_TIMEOUT, msg),
            ApiError::StoreError(err) => {
                tracing::error!("Store error: {:?}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };

        (status, Json(ActionResponse::failed(message))).into_response()
    }
}

impl From<RunnerError> for ApiError {
    fn from(err: RunnerError) -> Self {
        match err {
            RunnerError::NotFound(_) => ApiError::NotFound(err.to_string()),
            RunnerError::AlreadyExists(_) => ApiError::Conflict(err.to_string()),
            RunnerError::TokenMismatch(_) => ApiError::Forbidden(err.to_string()),
            RunnerError::ValidationError(msg) => ApiError::BadRequest(msg),
            RunnerError::RestartFailed { .. } => ApiError::BadGateway(err.to_string()),
            RunnerError::Timeout { .. } => ApiError::GatewayTimeout(err.to_string()),
            RunnerError::Store(err) => ApiError::StoreError(err),
        }
    }
}

impl From<LogError> for ApiError {
    fn from(err: LogError) -> Self {
        match err {
            LogError::NotFound(_) => ApiError::NotFound(err.to_string()),
            LogError::ValidationError(msg) => ApiError::BadRequest(msg),
            LogError::FetchError(_) => ApiError::BadGateway(err.to_string()),
            LogError::Timeout(_) => ApiError::GatewayTimeout(err.to_string()),
            LogError::Store(err) => ApiError::StoreError(err),
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
