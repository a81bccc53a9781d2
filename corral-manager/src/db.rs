use sqlx::{PgPool, postgres::PgPoolOptions};
use std::time::Duration;

pub async fn create_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(5))
        .connect(database_url)
        .await
}

pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    // `position` keeps listings in registration order
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS runners (
            position BIGSERIAL,
            name VARCHAR(255) PRIMARY KEY,
            url TEXT NOT NULL,
            token TEXT NOT NULL,
            status VARCHAR(20) NOT NULL,
            registered_at TIMESTAMPTZ NOT NULL,
            last_checked_at TIMESTAMPTZ
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_runners_position ON runners(position)")
        .execute(pool)
        .await?;

    tracing::info!("Database migrations completed successfully");
    Ok(())
}
