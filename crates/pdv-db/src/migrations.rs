//! # Schema Migrations
//!
//! The SQL files under `migrations/sqlite/` are compiled into the binary and
//! applied on connect. sqlx records each applied file in `_sqlx_migrations`
//! together with its checksum, so a file that changed after being applied
//! makes startup fail instead of silently diverging.
//!
//! | File                      | Adds                                          |
//! |---------------------------|-----------------------------------------------|
//! | `001_initial_schema.sql`  | catalog, sales, purchases, finance tables,    |
//! |                           | `stock_movements`, `local_store`              |
//!
//! New schema changes go in a new `NNN_description.sql`; applied files are
//! never edited.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

/// Embedded migrations from the workspace `migrations/sqlite` directory.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Runs all pending database migrations. Idempotent.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    MIGRATOR.run(pool).await?;
    info!(count = MIGRATOR.migrations.len(), "Schema up to date");
    Ok(())
}

/// `(embedded, applied)` migration counts.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok((total, applied as usize))
}
