//! # Snapshots
//!
//! Export and import of the in-memory store as a SQLite database image, and
//! the durable slot that holds the latest image between runs.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  mutation ok ──► export_snapshot()  VACUUM INTO <scratch file>         │
//! │                        │            read bytes, delete scratch         │
//! │                        ▼                                                │
//! │                  SnapshotSlot::persist(blob)                           │
//! │                        │            write <slot>.tmp, rename → slot    │
//! │                        ▼                                                │
//! │                  <data dir>/<app id>.snapshot                          │
//! │                        │                                                │
//! │  next start ──► SnapshotSlot::load() ──► import_snapshot(blob)         │
//! │                                          ATTACH scratch AS snapshot    │
//! │                                          copy LEDGER_TABLES in one tx  │
//! │                                          DETACH                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::{Path, PathBuf};

use sqlx::{Connection, SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};

/// Every SQLite database file starts with these 16 bytes.
pub const SQLITE_HEADER: &[u8; 16] = b"SQLite format 3\0";

/// Ledger tables in dependency order, with the columns carried by a snapshot.
///
/// Imports delete in reverse order and insert in this order.
pub const LEDGER_TABLES: &[(&str, &str)] = &[
    ("users", "id, email, password_hash, role, created_at"),
    (
        "user_permissions",
        "id, user_id, can_stock, can_movements, can_expenses, can_dashboard, can_sales, can_debtors, can_invoices",
    ),
    (
        "products",
        "id, code, name, category, initial_stock, min_stock, unit_price_cents, purchase_price_cents, reseller_price_cents, image_path, created_by, created_at",
    ),
    (
        "movements",
        "id, date, type, product_id, quantity, unit_price_cents, client_name, client_phone, comment, created_by, created_at",
    ),
    (
        "sales",
        "id, date, product_id, quantity, unit_price_cents, total_cents, payment_mode, client_name, client_phone, paid_amount_cents, balance_cents, comment, created_by, created_at",
    ),
    (
        "expenses",
        "id, date, description, amount_cents, payment_mode, category, comment, created_by, created_at",
    ),
];

// =============================================================================
// Durable Slot
// =============================================================================

/// File that holds the latest persisted snapshot.
///
/// ## Example
/// ```rust,ignore
/// let slot = SnapshotSlot::new("/var/lib/stockbook", "stockbook");
/// // → /var/lib/stockbook/stockbook.snapshot
/// slot.persist(&blob).await?;
/// let restored = slot.load().await?;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotSlot {
    path: PathBuf,
}

impl SnapshotSlot {
    /// Slot named after the application identifier inside `data_dir`.
    pub fn new(data_dir: impl AsRef<Path>, app_id: &str) -> Self {
        SnapshotSlot {
            path: data_dir.as_ref().join(format!("{app_id}.snapshot")),
        }
    }

    /// Slot at an explicit file path.
    pub fn at(path: impl Into<PathBuf>) -> Self {
        SnapshotSlot { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes the blob atomically: temp file in the same directory, then
    /// rename over the slot.
    pub async fn persist(&self, blob: &[u8]) -> DbResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, blob).await?;
        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }

        debug!(path = %self.path.display(), bytes = blob.len(), "Snapshot persisted");
        Ok(())
    }

    /// Reads the slot. `None` when nothing was ever persisted.
    pub async fn load(&self) -> DbResult<Option<Vec<u8>>> {
        match tokio::fs::read(&self.path).await {
            Ok(blob) if blob.is_empty() => {
                warn!(path = %self.path.display(), "Snapshot slot is empty, ignoring");
                Ok(None)
            }
            Ok(blob) => {
                debug!(path = %self.path.display(), bytes = blob.len(), "Snapshot loaded");
                Ok(Some(blob))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Removes the slot file if present.
    pub async fn clear(&self) -> DbResult<()> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// Export / Import
// =============================================================================

fn scratch_path() -> PathBuf {
    std::env::temp_dir().join(format!("stockbook-{}.sqlite", Uuid::new_v4()))
}

/// Rejects blobs that are not SQLite database images.
pub fn check_header(blob: &[u8]) -> DbResult<()> {
    if blob.len() < SQLITE_HEADER.len() || &blob[..SQLITE_HEADER.len()] != SQLITE_HEADER {
        return Err(DbError::InvalidSnapshot(
            "not a SQLite database image".to_string(),
        ));
    }
    Ok(())
}

/// Serializes the whole store into a SQLite database image.
pub async fn export_snapshot(pool: &SqlitePool) -> DbResult<Vec<u8>> {
    let path = scratch_path();
    let target = path.to_string_lossy().into_owned();

    sqlx::query("VACUUM INTO ?1")
        .bind(&target)
        .persistent(false)
        .execute(pool)
        .await
        .map_err(|e| DbError::Persistence(format!("snapshot export failed: {e}")))?;

    let read = tokio::fs::read(&path).await;
    let _ = tokio::fs::remove_file(&path).await;
    let blob = read.map_err(|e| DbError::Persistence(format!("reading exported image: {e}")))?;

    debug!(bytes = blob.len(), "Snapshot exported");
    Ok(blob)
}

/// Replaces every ledger row in the store with the rows of `blob`.
///
/// All-or-nothing: the copy runs in one transaction, so a malformed image
/// leaves the current contents untouched.
pub async fn import_snapshot(pool: &SqlitePool, blob: &[u8]) -> DbResult<()> {
    check_header(blob)?;

    let path = scratch_path();
    tokio::fs::write(&path, blob).await?;
    let source = path.to_string_lossy().into_owned();

    let mut conn = pool.acquire().await?;

    let attached = sqlx::query("ATTACH DATABASE ?1 AS snapshot")
        .bind(&source)
        .persistent(false)
        .execute(&mut *conn)
        .await;

    let outcome = match attached {
        Ok(_) => {
            let copied = copy_ledger_tables(&mut conn).await;
            let detached = sqlx::query("DETACH DATABASE snapshot")
                .persistent(false)
                .execute(&mut *conn)
                .await;
            if let Err(e) = &detached {
                warn!(error = %e, "Failed to detach snapshot");
            }
            copied
        }
        Err(e) => Err(DbError::Persistence(format!("cannot attach image: {e}"))),
    };

    drop(conn);
    let _ = tokio::fs::remove_file(&path).await;

    let counts = outcome?;
    info!(?counts, "Snapshot imported");
    Ok(())
}

async fn copy_ledger_tables(conn: &mut SqliteConnection) -> DbResult<Vec<(&'static str, u64)>> {
    let mut tx = conn.begin().await?;

    for (table, _) in LEDGER_TABLES.iter().rev() {
        sqlx::query(&format!("DELETE FROM main.{table}"))
            .persistent(false)
            .execute(&mut *tx)
            .await?;
    }

    let mut counts = Vec::with_capacity(LEDGER_TABLES.len());
    for (table, columns) in LEDGER_TABLES {
        let result = sqlx::query(&format!(
            "INSERT INTO main.{table} ({columns}) SELECT {columns} FROM snapshot.{table}"
        ))
        .persistent(false)
        .execute(&mut *tx)
        .await
        .map_err(|e| DbError::InvalidSnapshot(format!("{table}: {e}")))?;
        counts.push((*table, result.rows_affected()));
    }

    tx.commit().await?;
    Ok(counts)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_slot() -> SnapshotSlot {
        let dir = std::env::temp_dir().join(format!("stockbook-slot-{}", Uuid::new_v4()));
        SnapshotSlot::new(dir, "stockbook-test")
    }

    #[test]
    fn test_slot_path() {
        let slot = SnapshotSlot::new("/data", "stockbook");
        assert_eq!(slot.path(), Path::new("/data/stockbook.snapshot"));
    }

    #[test]
    fn test_check_header() {
        let mut blob = SQLITE_HEADER.to_vec();
        blob.extend_from_slice(&[0; 84]);
        assert!(check_header(&blob).is_ok());
        assert!(check_header(b"hello").is_err());
        assert!(check_header(b"not a database at all, definitely").is_err());
    }

    #[tokio::test]
    async fn test_slot_missing_is_none() {
        let slot = temp_slot();
        assert!(slot.load().await.unwrap().is_none());
        slot.clear().await.unwrap();
    }

    #[tokio::test]
    async fn test_slot_persist_and_load() {
        let slot = temp_slot();
        slot.persist(b"first").await.unwrap();
        slot.persist(b"second").await.unwrap();

        assert_eq!(slot.load().await.unwrap().as_deref(), Some(&b"second"[..]));

        slot.clear().await.unwrap();
        assert!(slot.load().await.unwrap().is_none());
    }
}
