//! Runner Service
//!
//! Business logic for the runner registry: validation, registration,
//! lookup, listing and token-guarded deletion.

use chrono::Utc;
use corral_core::domain::runner::{RunnerRecord, RunnerStatus};
use corral_core::dto::runner::{DeleteRunner, RegisterRunner};
use std::time::Duration;
use thiserror::Error;

use crate::repository::{DeleteOutcome, RunnerStore, StoreError};

/// Service error type
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("Runner {0} not found")]
    NotFound(String),

    #[error("Runner {0} already exists")]
    AlreadyExists(String),

    #[error("Token does not match runner {0}")]
    TokenMismatch(String),

    #[error("{0}")]
    ValidationError(String),

    #[error("Failed to restart runner {name}: {reason}")]
    RestartFailed { name: String, reason: String },

    #[error("Runner {name} did not answer within {timeout:?}")]
    Timeout { name: String, timeout: Duration },

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, RunnerError>;

const MAX_NAME_LENGTH: usize = 255;

/// Register a new runner
///
/// Fails with `AlreadyExists` if the name is taken. The record starts with an
/// unknown status until the supervisor probes it.
pub async fn register_runner(store: &dyn RunnerStore, req: RegisterRunner) -> Result<RunnerRecord> {
    validate_register_request(&req)?;

    let runner = RunnerRecord::new(req.name.trim(), req.url.trim(), req.token);

    if !store.insert(runner.clone()).await? {
        return Err(RunnerError::AlreadyExists(runner.name));
    }

    tracing::info!("Runner registered: {}", runner.name);

    Ok(runner)
}

/// Get a runner by name
pub async fn get_runner(store: &dyn RunnerStore, name: &str) -> Result<RunnerRecord> {
    store
        .find_by_name(name)
        .await?
        .ok_or_else(|| RunnerError::NotFound(name.to_string()))
}

/// List all runners in registration order
pub async fn list_runners(store: &dyn RunnerStore) -> Result<Vec<RunnerRecord>> {
    let runners = store.list_all().await?;
    Ok(runners)
}

/// Delete a runner whose token matches
///
/// Returns the removed record so the caller can stop the runner.
pub async fn delete_runner(store: &dyn RunnerStore, req: DeleteRunner) -> Result<RunnerRecord> {
    if req.name.trim().is_empty() {
        return Err(RunnerError::ValidationError(
            "Runner name is required".to_string(),
        ));
    }

    if req.token.trim().is_empty() {
        return Err(RunnerError::ValidationError("Token is required".to_string()));
    }

    let name = req.name.trim();
    match store.delete_with_token(name, &req.token).await? {
        DeleteOutcome::Deleted(runner) => {
            tracing::info!("Runner deleted: {}", runner.name);
            Ok(runner)
        }
        DeleteOutcome::NotFound => Err(RunnerError::NotFound(name.to_string())),
        DeleteOutcome::TokenMismatch => {
            tracing::warn!("Rejected delete of runner {}: token mismatch", name);
            Err(RunnerError::TokenMismatch(name.to_string()))
        }
    }
}

/// Record the latest observed status of a runner
///
/// Only the supervisor calls this. A runner deleted in the meantime is ignored.
pub(crate) async fn update_status(
    store: &dyn RunnerStore,
    name: &str,
    status: RunnerStatus,
) -> Result<()> {
    if !store.update_status(name, status, Utc::now()).await? {
        tracing::debug!("Dropping status for runner {} (no longer registered)", name);
    }
    Ok(())
}

// =============================================================================
// Validation
// =============================================================================

/// Check that a runner name is usable as a key and as a log file name
pub fn validate_name(name: &str) -> Result<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(RunnerError::ValidationError(
            "Runner name is required".to_string(),
        ));
    }

    if name.len() > MAX_NAME_LENGTH {
        return Err(RunnerError::ValidationError(format!(
            "Runner name is too long (max {} characters)",
            MAX_NAME_LENGTH
        )));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        || name.starts_with('.')
    {
        return Err(RunnerError::ValidationError(
            "Runner name may only contain letters, digits, '.', '_' and '-'".to_string(),
        ));
    }

    Ok(())
}

fn validate_register_request(req: &RegisterRunner) -> Result<()> {
    if req.name.trim().is_empty() || req.url.trim().is_empty() || req.token.trim().is_empty() {
        return Err(RunnerError::ValidationError(
            "Name, URL and Token are required".to_string(),
        ));
    }

    validate_name(&req.name)?;

    let url = req.url.trim();
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(RunnerError::ValidationError(
            "Runner URL must start with http:// or https://".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::InMemoryRunnerStore;
    use std::sync::Arc;

    fn register(name: &str) -> RegisterRunner {
        RegisterRunner {
            name: name.to_string(),
            url: format!("http://{}.local:8099", name),
            token: format!("{}-token", name),
        }
    }

    #[tokio::test]
    async fn test_duplicate_registration_is_rejected() {
        let store = InMemoryRunnerStore::new();
        register_runner(&store, register("build-01")).await.unwrap();

        let result = register_runner(&store, register("build-01")).await;
        assert!(matches!(result, Err(RunnerError::AlreadyExists(name)) if name == "build-01"));
        assert_eq!(list_runners(&store).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_list_preserves_insertion_order() {
        let store = InMemoryRunnerStore::new();
        let names = ["zeta", "alpha", "mid", "beta", "omega"];
        for name in names {
            register_runner(&store, register(name)).await.unwrap();
        }

        let listed: Vec<_> = list_runners(&store)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(listed, names);
    }

    #[tokio::test]
    async fn test_delete_with_wrong_token_keeps_runner() {
        let store = InMemoryRunnerStore::new();
        register_runner(&store, register("build-01")).await.unwrap();

        let result = delete_runner(
            &store,
            DeleteRunner {
                name: "build-01".to_string(),
                token: "nope".to_string(),
            },
        )
        .await;
        assert!(matches!(result, Err(RunnerError::TokenMismatch(_))));
        assert!(get_runner(&store, "build-01").await.is_ok());
    }

    #[tokio::test]
    async fn test_delete_with_matching_token() {
        let store = InMemoryRunnerStore::new();
        register_runner(&store, register("build-01")).await.unwrap();

        let removed = delete_runner(
            &store,
            DeleteRunner {
                name: "build-01".to_string(),
                token: "build-01-token".to_string(),
            },
        )
        .await
        .unwrap();
        assert_eq!(removed.name, "build-01");
        assert!(matches!(
            get_runner(&store, "build-01").await,
            Err(RunnerError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_unknown_runner() {
        let store = InMemoryRunnerStore::new();
        let result = delete_runner(
            &store,
            DeleteRunner {
                name: "ghost".to_string(),
                token: "t".to_string(),
            },
        )
        .await;
        assert!(matches!(result, Err(RunnerError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_delete_with_blank_token_is_rejected() {
        let store = InMemoryRunnerStore::new();
        register_runner(&store, register("build-01")).await.unwrap();

        let result = delete_runner(
            &store,
            DeleteRunner {
                name: "build-01".to_string(),
                token: " \t ".to_string(),
            },
        )
        .await;
        assert!(matches!(result, Err(RunnerError::ValidationError(_))));
        assert!(get_runner(&store, "build-01").await.is_ok());
    }

    #[tokio::test]
    async fn test_concurrent_registration_of_same_name() {
        let store = Arc::new(InMemoryRunnerStore::new());

        let handles: Vec<_> = (0..2)
            .map(|_| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { register_runner(store.as_ref(), register("x")).await })
            })
            .collect();

        let mut ok = 0;
        let mut exists = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(RunnerError::AlreadyExists(_)) => exists += 1,
                Err(e) => panic!("unexpected error: {}", e),
            }
        }

        assert_eq!((ok, exists), (1, 1));
        let runners = list_runners(store.as_ref()).await.unwrap();
        assert_eq!(runners.len(), 1);
        assert_eq!(runners[0].url, "http://x.local:8099");
    }

    #[test]
    fn test_validate_register_request() {
        assert!(validate_register_request(&register("ok-name_1.2")).is_ok());

        let mut req = register("a");
        req.token = String::new();
        assert!(matches!(
            validate_register_request(&req),
            Err(RunnerError::ValidationError(_))
        ));

        let mut req = register("a");
        req.token = "   ".to_string();
        assert!(matches!(
            validate_register_request(&req),
            Err(RunnerError::ValidationError(_))
        ));

        let mut req = register("a");
        req.url = "ftp://a".to_string();
        assert!(validate_register_request(&req).is_err());

        assert!(validate_register_request(&register("../etc/passwd")).is_err());
        assert!(validate_register_request(&register(".hidden")).is_err());
        assert!(validate_register_request(&register(&"x".repeat(256))).is_err());
    }
}
