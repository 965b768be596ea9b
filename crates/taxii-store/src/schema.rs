//! Schema definitions and migration utilities.

use sqlx::SqlitePool;

use crate::error::{StoreError, StoreResult};

/// Embedded migration SQL for the objects table (001_objects.sql).
pub const OBJECTS_MIGRATION: &str = include_str!("../../../migrations/001_objects.sql");

/// Run all migrations against the database.
///
/// Idempotent: every statement is `IF NOT EXISTS`.
pub async fn run_migrations(pool: &SqlitePool) -> StoreResult<()> {
    tracing::debug!("Running objects migration (001_objects.sql)...");
    sqlx::raw_sql(OBJECTS_MIGRATION)
        .execute(pool)
        .await
        .map_err(|e| StoreError::Migration(format!("Objects migration failed: {}", e)))?;

    tracing::debug!("Migrations completed successfully");
    Ok(())
}

/// Check if the schema has been initialized.
pub async fn is_schema_initialized(pool: &SqlitePool) -> StoreResult<bool> {
    let result: (i64,) = sqlx::query_as(
        r#"
        SELECT COUNT(*) FROM sqlite_master
        WHERE type = 'table' AND name = 'objects'
        "#,
    )
    .fetch_one(pool)
    .await?;

    Ok(result.0 > 0)
}
