//! # Database Migrations
//!
//! Embedded SQL migrations for Stockbook.
//!
//! ## How Migrations Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Migration Process                                  │
//! │                                                                         │
//! │  Database::open                                                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Fresh in-memory store                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Run embedded migrations (001_initial_schema.sql, ...)                 │
//! │       │                                                                 │
//! │       ├── No snapshot in slot → store stays empty, admin bootstrapped  │
//! │       │                                                                 │
//! │       └── Snapshot in slot → ledger tables copied in from the image    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The schema always comes from the migrations compiled into this binary.
//! A snapshot only contributes rows.
//!
//! ## Adding New Migrations
//!
//! 1. Create a new file in `migrations/sqlite/` with the next sequence number
//! 2. Name format: `NNN_description.sql`
//! 3. **NEVER** modify existing migrations - always add new ones
//! 4. Extend the column lists in `snapshot::LEDGER_TABLES` when a table gains
//!    a column

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

/// Embedded migrations from the `migrations/sqlite` directory.
static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Runs all pending database migrations.
///
/// Idempotent: safe to run multiple times.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    info!("Checking for pending migrations");

    MIGRATOR.run(pool).await?;

    info!("All migrations applied successfully");
    Ok(())
}

/// Returns `(total_migrations, applied_migrations)`.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let total = MIGRATOR.migrations.len();

    let applied: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok((total, applied as usize))
}
