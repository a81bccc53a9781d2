//! Log Service
//!
//! Business logic for reading a runner's recent output. Whatever the source,
//! the returned text never exceeds the configured line and byte window.

use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::repository::log::last_lines;
use crate::repository::{LogSource, RunnerStore, StoreError};

/// Text returned when a runner has not written any output yet
pub const NO_LOGS_PLACEHOLDER: &str = "No logs available yet. Runner may not have been started.";

/// Service error type
#[derive(Debug, Error)]
pub enum LogError {
    #[error("Runner {0} not found")]
    NotFound(String),

    #[error("{0}")]
    ValidationError(String),

    #[error("Failed to fetch logs for runner {0}")]
    FetchError(String),

    #[error("Timed out fetching logs for runner {0}")]
    Timeout(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, LogError>;

/// Reads bounded log windows from a log source
pub struct LogService {
    store: Arc<dyn RunnerStore>,
    source: Arc<dyn LogSource>,
    tail_lines: usize,
    max_bytes: usize,
    fetch_timeout: Duration,
}

impl LogService {
    pub fn new(
        store: Arc<dyn RunnerStore>,
        source: Arc<dyn LogSource>,
        tail_lines: usize,
        max_bytes: usize,
        fetch_timeout: Duration,
    ) -> Self {
        Self {
            store,
            source,
            tail_lines,
            max_bytes,
            fetch_timeout,
        }
    }

    /// Get the most recent output of a runner
    ///
    /// A runner without output yields a placeholder, not an error.
    pub async fn fetch_logs(&self, name: &str) -> Result<String> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LogError::ValidationError(
                "Runner name is required".to_string(),
            ));
        }

        let runner = self
            .store
            .find_by_name(name)
            .await?
            .ok_or_else(|| LogError::NotFound(name.to_string()))?;

        let fetched = tokio::time::timeout(
            self.fetch_timeout,
            self.source.tail(&runner, self.tail_lines, self.max_bytes),
        )
        .await
        .map_err(|_| {
            tracing::warn!(
                "Fetching logs for runner {} timed out after {:?}",
                runner.name,
                self.fetch_timeout
            );
            LogError::Timeout(runner.name.clone())
        })?
        .map_err(|e| {
            tracing::warn!("Failed to fetch logs for runner {}: {:#}", runner.name, e);
            LogError::FetchError(runner.name.clone())
        })?;

        match fetched {
            Some(text) if !text.is_empty() => {
                Ok(truncate_tail(&text, self.tail_lines, self.max_bytes).to_string())
            }
            _ => Ok(NO_LOGS_PLACEHOLDER.to_string()),
        }
    }
}

/// Keeps the newest `max_lines` lines of `text`, then the newest `max_bytes` bytes
///
/// The byte cut is moved forward to the next line start (or char boundary when
/// a single line exceeds the budget).
pub fn truncate_tail(text: &str, max_lines: usize, max_bytes: usize) -> &str {
    let text = last_lines(text, max_lines);
    if text.len() <= max_bytes {
        return text;
    }

    let mut cut = text.len() - max_bytes;
    while !text.is_char_boundary(cut) {
        cut += 1;
    }

    let window = &text[cut..];
    match window.find('\n') {
        Some(pos) if pos + 1 < window.len() => &window[pos + 1..],
        _ => window,
    }
}
