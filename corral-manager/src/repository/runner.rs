//! Runner Repository
//!
//! Storage contract for runner records plus the in-memory implementation.
//! Every store is responsible for its own locking: mutations on the same
//! name never interleave.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use corral_core::domain::runner::{RunnerRecord, RunnerStatus};
use thiserror::Error;
use tokio::sync::RwLock;

/// Store failure
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Outcome of a token-guarded delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted(RunnerRecord),
    NotFound,
    TokenMismatch,
}

/// Storage for runner records, keyed by name and ordered by insertion
#[async_trait]
pub trait RunnerStore: Send + Sync {
    /// Inserts a new record. Returns `false` if the name is already taken.
    async fn insert(&self, record: RunnerRecord) -> Result<bool, StoreError>;

    /// Finds a runner by name
    async fn find_by_name(&self, name: &str) -> Result<Option<RunnerRecord>, StoreError>;

    /// Lists every runner in insertion order
    async fn list_all(&self) -> Result<Vec<RunnerRecord>, StoreError>;

    /// Removes a runner if `token` matches its stored token
    async fn delete_with_token(&self, name: &str, token: &str)
    -> Result<DeleteOutcome, StoreError>;

    /// Records a probe result. Returns `false` if the runner no longer exists.
    async fn update_status(
        &self,
        name: &str,
        status: RunnerStatus,
        checked_at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;
}

/// Runner store kept in process memory
///
/// A single writer lock over an insertion-ordered vector. Fleets are small,
/// so lookups scan linearly.
#[derive(Default)]
pub struct InMemoryRunnerStore {
    runners: RwLock<Vec<RunnerRecord>>,
}

impl InMemoryRunnerStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RunnerStore for InMemoryRunnerStore {
    async fn insert(&self, record: RunnerRecord) -> Result<bool, StoreError> {
        let mut runners = self.runners.write().await;
        if runners.iter().any(|r| r.name == record.name) {
            return Ok(false);
        }
        runners.push(record);
        Ok(true)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<RunnerRecord>, StoreError> {
        let runners = self.runners.read().await;
        Ok(runners.iter().find(|r| r.name == name).cloned())
    }

    async fn list_all(&self) -> Result<Vec<RunnerRecord>, StoreError> {
        Ok(self.runners.read().await.clone())
    }

    async fn delete_with_token(
        &self,
        name: &str,
        token: &str,
    ) -> Result<DeleteOutcome, StoreError> {
        let mut runners = self.runners.write().await;
        let Some(index) = runners.iter().position(|r| r.name == name) else {
            return Ok(DeleteOutcome::NotFound);
        };
        if !runners[index].token_matches(token) {
            return Ok(DeleteOutcome::TokenMismatch);
        }
        Ok(DeleteOutcome::Deleted(runners.remove(index)))
    }

    async fn update_status(
        &self,
        name: &str,
        status: RunnerStatus,
        checked_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut runners = self.runners.write().await;
        match runners.iter_mut().find(|r| r.name == name) {
            Some(runner) => {
                runner.status = status;
                runner.last_checked_at = Some(checked_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
