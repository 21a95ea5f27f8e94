use sqlx::migrate::Migrator;
use sqlx::Row;

pub use sqlx::migrate::MigrateError;

use crate::DbPool;

pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppliedMigration {
    pub version: i64,
    pub description: String,
}

pub async fn run_pending(pool: &DbPool) -> Result<(), MigrateError> {
    MIGRATOR.run(pool).await
}

/// Successfully applied migrations in version order. Empty before the first run.
pub async fn applied_migrations(pool: &DbPool) -> Result<Vec<AppliedMigration>, MigrateError> {
    let tracked: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations'",
    )
    .fetch_one(pool)
    .await?;
    if tracked == 0 {
        return Ok(Vec::new());
    }

    let rows = sqlx::query(
        "SELECT version, description FROM _sqlx_migrations WHERE success = 1 ORDER BY version",
    )
    .fetch_all(pool)
    .await?;
    Ok(rows
        .into_iter()
        .map(|row| AppliedMigration {
            version: row.get("version"),
            description: row.get("description"),
        })
        .collect())
}
