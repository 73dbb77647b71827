//! PostgreSQL persistence for the sigil authorization core.
//!
//! Models are plain `FromRow` structs; repositories are unit structs with
//! static async functions taking `&PgPool` (or a `&mut Transaction` where
//! the caller needs the operation to commit atomically with its ledger
//! append). All cross-request coordination happens through the database's
//! atomic operations -- there are no in-process locks, so any number of
//! server instances can share one store.

pub mod models;
pub mod repositories;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Convenience alias used across the workspace.
pub type DbPool = PgPool;

/// Create a connection pool for the given database URL.
pub async fn create_pool(database_url: &str) -> Result<DbPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
}

/// Verify the database is reachable.
pub async fn health_check(pool: &DbPool) -> Result<(), sqlx::Error> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

/// Apply embedded migrations.
pub async fn run_migrations(pool: &DbPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}
