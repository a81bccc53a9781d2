//! Agent protocol DTOs
//!
//! Bodies exchanged between the manager and a runner agent's control endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::runner::RunnerStatus;

/// Answer to `GET /status`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentStatus {
    pub status: RunnerStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
}

/// Answer to `GET /logs`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentLogs {
    #[serde(default)]
    pub logs: String,
}

/// Query string of `GET /logs`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentLogsQuery {
    pub lines: Option<usize>,
    /// Upper bound on the bytes of `logs` the caller accepts
    pub max_bytes: Option<usize>,
}
