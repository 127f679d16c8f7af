//! # Database Persistence Layer
//!
//! Postgres persistence for fleet records via SQLx.
//!
//! The database layer is **optional**. When a database URL is configured,
//! every create, update and delete is written through to Postgres and the
//! in-memory stores are hydrated from it on startup. When absent, the API
//! operates in in-memory-only mode (suitable for development and testing).
//!
//! Ids are allocated by the in-memory stores and written explicitly, so the
//! tables carry no sequences.

pub mod cars;
pub mod drivers;
pub mod manufacturers;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Initialize the database connection pool and run migrations.
///
/// Returns `None` if no URL is configured (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool(url: Option<&str>) -> Result<Option<PgPool>, sqlx::Error> {
    let Some(url) = url else {
        tracing::warn!(
            "DATABASE_URL not set, running in-memory only mode. \
             Records will not survive restarts."
        );
        return Ok(None);
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}
