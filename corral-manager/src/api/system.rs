//! System API Handlers
//!
//! Liveness and build information endpoints.

use axum::{Json, http::StatusCode, response::IntoResponse};
use corral_core::dto::system::VersionInfo;

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

/// Build information, stamped through `CORRAL_*` variables at compile time
pub fn version_info() -> VersionInfo {
    VersionInfo {
        version: env!("CARGO_PKG_VERSION").to_string(),
        git_commit: option_env!("CORRAL_GIT_COMMIT")
            .unwrap_or("unknown")
            .to_string(),
        git_commit_full: option_env!("CORRAL_GIT_COMMIT_FULL")
            .unwrap_or("unknown")
            .to_string(),
        git_branch: option_env!("CORRAL_GIT_BRANCH")
            .unwrap_or("unknown")
            .to_string(),
        build_time: option_env!("CORRAL_BUILD_TIME")
            .unwrap_or("unknown")
            .to_string(),
    }
}

/// GET /api/version
pub async fn version() -> Json<VersionInfo> {
    Json(version_info())
}
