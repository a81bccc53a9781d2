//! Runner DTOs
//!
//! Request and response bodies of the manager's `/api/runners` endpoints.
//! Request fields default to empty so that missing fields surface as
//! validation errors rather than decoding failures.

use serde::{Deserialize, Serialize};

use crate::domain::runner::RunnerStatus;

/// Request to register a runner
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RegisterRunner {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub token: String,
}

/// Request to restart a runner
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RestartRunner {
    #[serde(default)]
    pub name: String,
}

/// Request to delete a runner
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeleteRunner {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub token: String,
}

/// Query string selecting a runner by name
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunnerQuery {
    #[serde(default)]
    pub name: String,
}

/// Outcome of a mutating operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ActionResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

/// Recent log output of a runner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logs: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Result of an on-demand status probe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    pub name: String,
    pub status: RunnerStatus,
}
