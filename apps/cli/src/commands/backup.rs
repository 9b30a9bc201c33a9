//! # Backup Commands
//!
//! Copy the store to and from snapshot files. Administrator only.
//!
//! A backup file is the same SQLite image the snapshot slot holds, so a
//! backup can also be dropped in as the slot by hand.

use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::auth;
use crate::error::{ApiError, ErrorCode};
use crate::state::{DbState, SessionState};

/// Outcome of an export or import.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupReport {
    pub path: PathBuf,
    pub bytes: usize,
    /// Row count per ledger table after the operation
    pub tables: Vec<(String, i64)>,
}

fn io_error(path: &Path, err: std::io::Error) -> ApiError {
    ApiError::new(
        ErrorCode::PersistenceError,
        format!("{}: {}", path.display(), err),
    )
}

/// Writes the current store to `path`.
pub async fn export_backup(db: &DbState, session: &SessionState, path: &Path) -> Result<BackupReport, ApiError> {
    let admin = session.require_admin().await?;

    let blob = db.inner().export_snapshot().await?;
    tokio::fs::write(path, &blob).await.map_err(|e| io_error(path, e))?;

    info!(admin_id = admin.user.id, path = %path.display(), bytes = blob.len(), "Backup exported");
    Ok(BackupReport {
        path: path.to_path_buf(),
        bytes: blob.len(),
        tables: db.inner().table_counts().await?,
    })
}

/// Replaces the whole store with the contents of `path`.
///
/// The session survives only if its user exists in the imported data.
///
/// ## Errors
/// - `VALIDATION_ERROR` when the file is not a store snapshot (nothing changes)
pub async fn import_backup(db: &DbState, session: &SessionState, path: &Path) -> Result<BackupReport, ApiError> {
    let admin = session.require_admin().await?;

    let blob = tokio::fs::read(path).await.map_err(|e| io_error(path, e))?;
    db.inner().import_snapshot(&blob).await?;
    db.commit().await?;

    info!(admin_id = admin.user.id, path = %path.display(), bytes = blob.len(), "Backup imported");

    match auth::load_identity(db.inner(), admin.user.id).await {
        Ok(Some(identity)) if identity.user.email == admin.user.email => {
            session.establish(identity).await?;
        }
        Ok(_) => {
            warn!(user_id = admin.user.id, "Importing user not present in backup, session ended");
            session.clear().await;
        }
        Err(e) => {
            session.clear().await;
            return Err(e.into());
        }
    }

    Ok(BackupReport {
        path: path.to_path_buf(),
        bytes: blob.len(),
        tables: db.inner().table_counts().await?,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================
