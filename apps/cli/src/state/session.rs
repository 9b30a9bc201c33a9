//! # Session State
//!
//! The logged-in identity and the capability gate.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Session Lifecycle                                    │
//! │                                                                         │
//! │  login ──► establish(identity) ──► slot: {"id": 3, "email": "..."}     │
//! │                                                                         │
//! │  start ──► restore(db)                                                  │
//! │             ├── slot absent or malformed ──► no session                 │
//! │             ├── user gone ─────────────────► clear slot, no session     │
//! │             └── user found ────────────────► Identity rebuilt by id     │
//! │                                                                         │
//! │  logout / credential change ──► clear() (memory + slot)                 │
//! │                                                                         │
//! │  every command ──► require(capability)                                  │
//! │             ├── no identity ──► UNAUTHENTICATED                         │
//! │             └── flag false ───► FORBIDDEN                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The slot holds only the id and email. Capabilities are always read back
//! from the store.

use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::auth::{self, AuthError};
use crate::error::{ApiError, ErrorCode};
use stock_core::{Capability, Identity};
use stock_db::Database;

/// What the session slot stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionToken {
    pub id: i64,
    pub email: String,
}

/// JSON file holding the current [`SessionToken`].
#[derive(Debug, Clone)]
pub struct SessionSlot {
    path: PathBuf,
}

impl SessionSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SessionSlot { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn save(&self, token: &SessionToken) -> Result<(), ApiError> {
        let json = serde_json::to_vec(token).map_err(|e| ApiError::internal(e.to_string()))?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(persistence)?;
            }
        }
        tokio::fs::write(&self.path, json).await.map_err(persistence)?;
        Ok(())
    }

    /// Reads the token. Absent and malformed slots both read as `None`.
    pub async fn load(&self) -> Option<SessionToken> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Session slot unreadable");
                return None;
            }
        };

        match serde_json::from_slice(&bytes) {
            Ok(token) => Some(token),
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Session slot malformed, ignoring");
                None
            }
        }
    }

    pub async fn clear(&self) {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => debug!(path = %self.path.display(), "Session slot cleared"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!(path = %self.path.display(), error = %e, "Could not clear session slot"),
        }
    }
}

fn persistence(err: std::io::Error) -> ApiError {
    ApiError::new(ErrorCode::PersistenceError, format!("Could not save session: {}", err))
}

/// Current identity, guarded by a mutex.
///
/// Without a slot the session lives only in memory (tests, one-shot runs).
#[derive(Debug)]
pub struct SessionState {
    current: Mutex<Option<Identity>>,
    slot: Option<SessionSlot>,
}

impl SessionState {
    pub fn new(slot: Option<SessionSlot>) -> Self {
        SessionState {
            current: Mutex::new(None),
            slot,
        }
    }

    /// A session that is never written to disk.
    pub fn volatile() -> Self {
        SessionState::new(None)
    }

    pub fn slot(&self) -> Option<&SessionSlot> {
        self.slot.as_ref()
    }

    /// The logged-in identity, if any.
    pub async fn current(&self) -> Option<Identity> {
        self.current.lock().await.clone()
    }

    pub async fn require_login(&self) -> Result<Identity, ApiError> {
        self.current().await.ok_or_else(ApiError::unauthenticated)
    }

    /// Capability gate. Checked before any read or write.
    pub async fn require(&self, capability: Capability) -> Result<Identity, ApiError> {
        let identity = self.require_login().await?;
        if !identity.can(capability) {
            warn!(user_id = identity.user.id, %capability, "Capability denied");
            return Err(ApiError::missing_capability(capability));
        }
        Ok(identity)
    }

    pub async fn require_admin(&self) -> Result<Identity, ApiError> {
        let identity = self.require_login().await?;
        if !identity.is_admin() {
            warn!(user_id = identity.user.id, "Administrator role denied");
            return Err(ApiError::admin_only());
        }
        Ok(identity)
    }

    /// Records a successful login in memory and in the slot.
    pub async fn establish(&self, identity: Identity) -> Result<(), ApiError> {
        if let Some(slot) = &self.slot {
            slot.save(&SessionToken {
                id: identity.user.id,
                email: identity.user.email.clone(),
            })
            .await?;
        }

        info!(user_id = identity.user.id, email = %identity.user.email, "Session established");
        *self.current.lock().await = Some(identity);
        Ok(())
    }

    /// Drops the session from memory and the slot, unconditionally.
    pub async fn clear(&self) {
        let previous = self.current.lock().await.take();
        if let Some(slot) = &self.slot {
            slot.clear().await;
        }
        if let Some(identity) = previous {
            info!(user_id = identity.user.id, "Session cleared");
        }
    }

    /// Rehydrates the identity named by the slot.
    ///
    /// ## Errors
    /// - `INCONSISTENT_STATE` when the user exists without a permission row
    pub async fn restore(&self, db: &Database) -> Result<Option<Identity>, ApiError> {
        let Some(slot) = &self.slot else {
            return Ok(None);
        };
        let Some(token) = slot.load().await else {
            return Ok(None);
        };

        match auth::load_identity(db, token.id).await {
            Ok(Some(identity)) => {
                debug!(user_id = identity.user.id, "Session restored");
                *self.current.lock().await = Some(identity.clone());
                Ok(Some(identity))
            }
            Ok(None) => {
                info!(user_id = token.id, "Session user no longer exists");
                self.clear().await;
                Ok(None)
            }
            Err(e @ AuthError::MissingPermissions { .. }) => {
                *self.current.lock().await = None;
                Err(e.into())
            }
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use stock_core::{Permissions, Role, User};
    use stock_db::DbConfig;

    fn temp_slot() -> SessionSlot {
        let name = format!("stockbook-session-{}.json", uuid::Uuid::new_v4());
        SessionSlot::new(std::env::temp_dir().join(name))
    }

    fn identity(permissions: Permissions, role: Role) -> Identity {
        Identity {
            user: User {
                id: 1,
                email: "clerk@shop.local".into(),
                role,
                created_at: Utc::now(),
            },
            permissions,
        }
    }

    #[tokio::test]
    async fn test_gate_without_session() {
        let session = SessionState::volatile();
        let err = session.require(Capability::Stock).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Unauthenticated);
    }

    #[tokio::test]
    async fn test_gate_checks_flag() {
        let session = SessionState::volatile();
        let perms = Permissions::all_granted().with(Capability::Sales, false);
        session.establish(identity(perms, Role::User)).await.unwrap();

        assert!(session.require(Capability::Stock).await.is_ok());
        let err = session.require(Capability::Sales).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::Forbidden);
        assert_eq!(session.require_admin().await.unwrap_err().code, ErrorCode::Forbidden);

        session.clear().await;
        assert!(session.current().await.is_none());
    }

    #[tokio::test]
    async fn test_slot_round_trip_and_malformed() {
        let slot = temp_slot();
        let token = SessionToken {
            id: 7,
            email: "a@shop.local".into(),
        };
        slot.save(&token).await.unwrap();
        assert_eq!(slot.load().await, Some(token));

        tokio::fs::write(slot.path(), b"{not json").await.unwrap();
        assert_eq!(slot.load().await, None);

        slot.clear().await;
        assert_eq!(slot.load().await, None);
        // Clearing twice is fine
        slot.clear().await;
    }

    #[tokio::test]
    async fn test_restore() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let user = db
            .users()
            .create("clerk@shop.local", "h", Role::User, Permissions::all_granted())
            .await
            .unwrap();

        let slot = temp_slot();
        slot.save(&SessionToken {
            id: user.id,
            email: user.email.clone(),
        })
        .await
        .unwrap();

        let session = SessionState::new(Some(slot.clone()));
        let restored = session.restore(&db).await.unwrap().unwrap();
        assert_eq!(restored.user, user);
        assert!(session.require(Capability::Sales).await.is_ok());

        // Token for a user that no longer exists clears the slot
        slot.save(&SessionToken {
            id: user.id + 50,
            email: "gone@shop.local".into(),
        })
        .await
        .unwrap();
        let session = SessionState::new(Some(slot.clone()));
        assert!(session.restore(&db).await.unwrap().is_none());
        assert!(slot.load().await.is_none());
    }
}
