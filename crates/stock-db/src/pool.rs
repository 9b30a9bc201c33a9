//! # Database Pool Management
//!
//! The store is an in-memory SQLite database behind a single-connection pool.
//! Durability comes from snapshots, not from the database file.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Store Lifecycle                                    │
//! │                                                                         │
//! │  DbConfig::in_memory().snapshot_slot(slot)                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::open(config).await                                          │
//! │       │  1. connect :memory: (one connection, never recycled)          │
//! │       │  2. run migrations                                             │
//! │       │  3. slot has a snapshot? → import it                           │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │  SqlitePool (max 1)  ──►  :memory:      │                           │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       │  repositories / execute_query / execute_statement               │
//! │       ▼                                                                 │
//! │  db.flush() → export_snapshot → slot.persist                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.close()                                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Why One Connection
//! Every new connection to `:memory:` sees an empty database. The pool keeps
//! exactly one connection alive for its whole life (no idle timeout, no max
//! lifetime), which also serializes all access.

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::query::{self, QueryResult, SqlValue};
use crate::repository::expense::ExpenseRepository;
use crate::repository::movement::MovementRepository;
use crate::repository::product::ProductRepository;
use crate::repository::sale::SaleRepository;
use crate::repository::user::UserRepository;
use crate::snapshot::{self, SnapshotSlot};

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::in_memory()
///     .snapshot_slot(SnapshotSlot::new(data_dir, "stockbook"));
/// let db = Database::open(config).await?;
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Where snapshots are persisted. `None` keeps the store volatile.
    pub slot: Option<SnapshotSlot>,

    /// Connection timeout duration.
    /// Default: 5 seconds
    pub connect_timeout: Duration,

    /// Enforce declared foreign keys on the connection.
    /// Default: false (product deletion leaves ledger rows in place)
    pub foreign_keys: bool,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// Volatile in-memory store. Used directly by tests.
    pub fn in_memory() -> Self {
        DbConfig {
            slot: None,
            connect_timeout: Duration::from_secs(5),
            foreign_keys: false,
            run_migrations: true,
        }
    }

    /// In-memory store persisted to `<data_dir>/<app_id>.snapshot`.
    pub fn persistent(data_dir: impl AsRef<std::path::Path>, app_id: &str) -> Self {
        DbConfig::in_memory().snapshot_slot(SnapshotSlot::new(data_dir, app_id))
    }

    /// Sets the durable slot.
    pub fn snapshot_slot(mut self, slot: SnapshotSlot) -> Self {
        self.slot = Some(slot);
        self
    }

    /// Sets the connection timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets foreign key enforcement.
    pub fn foreign_keys(mut self, enforce: bool) -> Self {
        self.foreign_keys = enforce;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access and snapshot I/O.
///
/// Cloning is cheap and shares the same pool (and so the same in-memory
/// database).
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
    slot: Option<SnapshotSlot>,
}

impl Database {
    /// Creates an empty store with the schema applied. Ignores the slot's
    /// current content.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let db = Database::new(DbConfig::in_memory()).await?;
    /// ```
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!("Initializing in-memory store");

        // Plain `:memory:` filename. The `sqlite::memory:` URL form sets
        // SQLITE_OPEN_MEMORY, which SQLite also applies to `VACUUM INTO`
        // targets and attached files, so snapshots would never reach disk.
        let connect_options = SqliteConnectOptions::new()
            .filename(":memory:")
            .foreign_keys(config.foreign_keys);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!(foreign_keys = config.foreign_keys, "Store pool created");

        let db = Database {
            pool,
            slot: config.slot,
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Opens the store: fresh schema, then the slot's snapshot if any.
    ///
    /// A snapshot that cannot be imported is an error. The slot is left as
    /// is so the file can be inspected or restored by hand.
    pub async fn open(config: DbConfig) -> DbResult<Self> {
        let db = Database::new(config).await?;

        if let Some(slot) = &db.slot {
            match slot.load().await? {
                Some(blob) => {
                    info!(path = %slot.path().display(), "Restoring store from snapshot");
                    snapshot::import_snapshot(&db.pool, &blob).await?;
                }
                None => {
                    info!(path = %slot.path().display(), "No snapshot found, starting empty");
                }
            }
        }

        Ok(db)
    }

    /// Creates a store from a snapshot blob.
    pub async fn from_snapshot(config: DbConfig, blob: &[u8]) -> DbResult<Self> {
        snapshot::check_header(blob)?;
        let db = Database::new(config).await?;
        snapshot::import_snapshot(&db.pool, blob).await?;
        Ok(db)
    }

    /// Runs database migrations.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// The durable slot, if this store is persistent.
    pub fn slot(&self) -> Option<&SnapshotSlot> {
        self.slot.as_ref()
    }

    // -------------------------------------------------------------------------
    // Raw adapter surface
    // -------------------------------------------------------------------------

    /// Runs a row-returning statement with positional parameters.
    pub async fn execute_query(&self, sql: &str, params: &[SqlValue]) -> DbResult<QueryResult> {
        query::execute_query(&self.pool, sql, params).await
    }

    /// Runs a statement and returns the number of rows changed.
    pub async fn execute_statement(&self, sql: &str, params: &[SqlValue]) -> DbResult<u64> {
        query::execute_statement(&self.pool, sql, params).await
    }

    // -------------------------------------------------------------------------
    // Snapshots
    // -------------------------------------------------------------------------

    /// Serializes the store into a SQLite database image.
    pub async fn export_snapshot(&self) -> DbResult<Vec<u8>> {
        snapshot::export_snapshot(&self.pool).await
    }

    /// Replaces the store contents with those of `blob`.
    pub async fn import_snapshot(&self, blob: &[u8]) -> DbResult<()> {
        snapshot::import_snapshot(&self.pool, blob).await
    }

    /// Exports a snapshot and writes it to the slot. No-op without a slot.
    pub async fn flush(&self) -> DbResult<()> {
        let Some(slot) = &self.slot else {
            return Ok(());
        };

        let blob = self.export_snapshot().await?;
        slot.persist(&blob)
            .await
            .map_err(|e| DbError::Persistence(format!("{}: {e}", slot.path().display())))
    }

    /// Row counts of the ledger tables, in dependency order.
    pub async fn table_counts(&self) -> DbResult<Vec<(String, i64)>> {
        let mut counts = Vec::with_capacity(snapshot::LEDGER_TABLES.len());
        for (table, _) in snapshot::LEDGER_TABLES {
            let result = self
                .execute_query(&format!("SELECT COUNT(*) AS n FROM {table}"), &[])
                .await?;
            let n = result.get(0, "n").and_then(SqlValue::as_i64).unwrap_or(0);
            counts.push((table.to_string(), n));
        }
        Ok(counts)
    }

    // -------------------------------------------------------------------------
    // Repositories
    // -------------------------------------------------------------------------

    pub fn users(&self) -> UserRepository {
        UserRepository::new(self.pool.clone())
    }

    pub fn products(&self) -> ProductRepository {
        ProductRepository::new(self.pool.clone())
    }

    pub fn movements(&self) -> MovementRepository {
        MovementRepository::new(self.pool.clone())
    }

    pub fn sales(&self) -> SaleRepository {
        SaleRepository::new(self.pool.clone())
    }

    pub fn expenses(&self) -> ExpenseRepository {
        ExpenseRepository::new(self.pool.clone())
    }

    // -------------------------------------------------------------------------
    // Lifecycle
    // -------------------------------------------------------------------------

    /// Closes the pool without touching the slot.
    ///
    /// Every mutation is flushed by its caller, so the slot already holds
    /// the latest state. After calling close, all repository operations will
    /// fail and the in-memory contents are gone.
    pub async fn close(&self) {
        info!("Closing store");
        self.pool.close().await;
    }

    /// Checks if the database is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
