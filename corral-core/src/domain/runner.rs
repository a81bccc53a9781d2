//! Runner domain model
//!
//! Represents a worker process registered with the manager and addressed
//! through its control endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A runner registered with the manager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunnerRecord {
    /// Unique, immutable name of the runner
    pub name: String,

    /// Base URL of the runner's control endpoint
    pub url: String,

    /// Shared secret required to delete the runner and sent on control calls
    pub token: String,

    /// Status derived from the latest health probe
    #[serde(default)]
    pub status: RunnerStatus,

    /// When this runner was registered
    pub registered_at: DateTime<Utc>,

    /// When the runner was last probed, if ever
    #[serde(default)]
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl RunnerRecord {
    /// Creates a freshly registered runner with an unknown status
    pub fn new(name: impl Into<String>, url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            token: token.into(),
            status: RunnerStatus::Unknown,
            registered_at: Utc::now(),
            last_checked_at: None,
        }
    }

    /// Compares `candidate` with the stored token in constant time
    pub fn token_matches(&self, candidate: &str) -> bool {
        tokens_match(&self.token, candidate)
    }
}

/// Liveness of a runner
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunnerStatus {
    /// The runner reported its process as running
    Running,

    /// The runner answered but its process is not running
    Stopped,

    /// The runner could not be reached or answered with garbage
    #[default]
    #[serde(other)]
    Unknown,
}

impl RunnerStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunnerStatus::Running => "running",
            RunnerStatus::Stopped => "stopped",
            RunnerStatus::Unknown => "unknown",
        }
    }

    /// Parses a stored or reported status, mapping anything unrecognised to `Unknown`
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "running" => RunnerStatus::Running,
            "stopped" => RunnerStatus::Stopped,
            _ => RunnerStatus::Unknown,
        }
    }
}

impl std::fmt::Display for RunnerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Compares two tokens in time that depends only on their lengths
pub fn tokens_match(expected: &str, candidate: &str) -> bool {
    let (a, b) = (expected.as_bytes(), candidate.as_bytes());
    let mut diff = a.len() ^ b.len();
    for i in 0..a.len().max(b.len()) {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        diff |= usize::from(x ^ y);
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_runner_starts_unknown() {
        let runner = RunnerRecord::new("build-01", "http://10.0.0.5:8099", "secret");
        assert_eq!(runner.status, RunnerStatus::Unknown);
        assert!(runner.last_checked_at.is_none());
    }

    #[test]
    fn test_token_matches() {
        let runner = RunnerRecord::new("build-01", "http://10.0.0.5:8099", "secret");
        assert!(runner.token_matches("secret"));
        assert!(!runner.token_matches("secreT"));
        assert!(!runner.token_matches("secret-but-longer"));
        assert!(!runner.token_matches(""));
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&RunnerStatus::Running).unwrap();
        assert_eq!(json, "\"running\"");
    }

    #[test]
    fn test_unrecognised_status_decodes_as_unknown() {
        let status: RunnerStatus = serde_json::from_str("\"paused\"").unwrap();
        assert_eq!(status, RunnerStatus::Unknown);
        assert_eq!(RunnerStatus::parse_lenient("Stopped"), RunnerStatus::Stopped);
        assert_eq!(RunnerStatus::parse_lenient("???"), RunnerStatus::Unknown);
    }

    #[test]
    fn test_listing_shape() {
        let runner = RunnerRecord::new("build-01", "http://10.0.0.5:8099", "secret");
        let value = serde_json::to_value(&runner).unwrap();
        assert_eq!(value["name"], "build-01");
        assert_eq!(value["url"], "http://10.0.0.5:8099");
        assert_eq!(value["token"], "secret");
        assert_eq!(value["status"], "unknown");
    }
}
