//! System DTOs

use serde::{Deserialize, Serialize};

/// Build information reported by `GET /api/version`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VersionInfo {
    pub version: String,
    pub git_commit: String,
    pub git_commit_full: String,
    pub git_branch: String,
    pub build_time: String,
}
