//! Postgres Runner Repository
//!
//! Handles all database operations related to runners.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use corral_core::domain::runner::{RunnerRecord, RunnerStatus};
use sqlx::PgPool;

use super::runner::{DeleteOutcome, RunnerStore, StoreError};

/// Runner store backed by the `runners` table
#[derive(Clone)]
pub struct PgRunnerStore {
    pool: PgPool,
}

impl PgRunnerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RunnerStore for PgRunnerStore {
    async fn insert(&self, record: RunnerRecord) -> Result<bool, StoreError> {
        // The primary key settles concurrent registrations of the same name.
        let result = sqlx::query(
            r#"
            INSERT INTO runners (name, url, token, status, registered_at, last_checked_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (name) DO NOTHING
            "#,
        )
        .bind(&record.name)
        .bind(&record.url)
        .bind(&record.token)
        .bind(record.status.as_str())
        .bind(record.registered_at)
        .bind(record.last_checked_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<RunnerRecord>, StoreError> {
        let row = sqlx::query_as::<_, RunnerRow>(
            r#"
            SELECT name, url, token, status, registered_at, last_checked_at
            FROM runners
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into()))
    }

    async fn list_all(&self) -> Result<Vec<RunnerRecord>, StoreError> {
        let rows = sqlx::query_as::<_, RunnerRow>(
            r#"
            SELECT name, url, token, status, registered_at, last_checked_at
            FROM runners
            ORDER BY position ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn delete_with_token(
        &self,
        name: &str,
        token: &str,
    ) -> Result<DeleteOutcome, StoreError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, RunnerRow>(
            r#"
            SELECT name, url, token, status, registered_at, last_checked_at
            FROM runners
            WHERE name = $1
            FOR UPDATE
            "#,
        )
        .bind(name)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(DeleteOutcome::NotFound);
        };

        let runner: RunnerRecord = row.into();
        if !runner.token_matches(token) {
            return Ok(DeleteOutcome::TokenMismatch);
        }

        sqlx::query("DELETE FROM runners WHERE name = $1")
            .bind(name)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        Ok(DeleteOutcome::Deleted(runner))
    }

    async fn update_status(
        &self,
        name: &str,
        status: RunnerStatus,
        checked_at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE runners
            SET status = $1, last_checked_at = $2
            WHERE name = $3
            "#,
        )
        .bind(status.as_str())
        .bind(checked_at)
        .bind(name)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

// =============================================================================
// Database Row Types
// =============================================================================

#[derive(sqlx::FromRow)]
struct RunnerRow {
    name: String,
    url: String,
    token: String,
    status: String,
    registered_at: DateTime<Utc>,
    last_checked_at: Option<DateTime<Utc>>,
}

impl From<RunnerRow> for RunnerRecord {
    fn from(row: RunnerRow) -> Self {
        RunnerRecord {
            name: row.name,
            url: row.url,
            token: row.token,
            status: RunnerStatus::parse_lenient(&row.status),
            registered_at: row.registered_at,
            last_checked_at: row.last_checked_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_with_unrecognised_status_maps_to_unknown() {
        let row = RunnerRow {
            name: "a".to_string(),
            url: "http://a:8099".to_string(),
            token: "t".to_string(),
            status: "Online".to_string(),
            registered_at: Utc::now(),
            last_checked_at: None,
        };

        let runner: RunnerRecord = row.into();
        assert_eq!(runner.status, RunnerStatus::Unknown);
    }
}
