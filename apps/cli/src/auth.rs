//! # Authentication
//!
//! Salted one-way password hashing and credential verification.
//!
//! ## Login Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  verify_credentials(db, email, password)                                │
//! │       │                                                                 │
//! │       ├── validate_email (trim + lowercase)                             │
//! │       ├── users.find_credentials(email) ──── none ──► UnknownEmail      │
//! │       ├── argon2 verify(password, hash) ──── fail ──► InvalidCredential │
//! │       ├── users.get_permissions(id) ──────── none ──► MissingPermissions│
//! │       ▼                                                                 │
//! │  Identity { user, permissions }                                         │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Hashes are PHC strings (`$argon2id$v=19$...`) carrying their own salt.
//! Neither passwords nor hashes are ever logged.

use argon2::{
    password_hash::{rand_core::OsRng, SaltString},
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
};
use thiserror::Error;
use tracing::debug;

use stock_core::validation::validate_email;
use stock_core::Identity;
use stock_db::{Database, DbError};

/// Credential check failures.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No account has this email.
    #[error("unknown email")]
    UnknownEmail,

    /// The password does not match the stored hash.
    #[error("invalid credential")]
    InvalidCredential,

    /// The account exists but has no permission row.
    ///
    /// ## When This Occurs
    /// - The row was removed by hand, or a snapshot from a damaged store was
    ///   imported
    #[error("user {user_id} has no permission record")]
    MissingPermissions { user_id: i64 },

    #[error(transparent)]
    Db(#[from] DbError),

    /// The hasher itself failed.
    #[error("password hashing failed: {0}")]
    Hash(String),
}

/// Hashes a password with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::Hash(e.to_string()))?;

    Ok(hash.to_string())
}

/// Checks a password against a stored hash. A malformed hash never matches.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Looks up a user by email and checks the password.
pub async fn verify_credentials(db: &Database, email: &str, password: &str) -> Result<Identity, AuthError> {
    // A malformed email cannot belong to anyone
    let email = validate_email(email).map_err(|_| AuthError::UnknownEmail)?;

    let credentials = db
        .users()
        .find_credentials(&email)
        .await?
        .ok_or(AuthError::UnknownEmail)?;

    if !verify_password(password, &credentials.password_hash) {
        return Err(AuthError::InvalidCredential);
    }

    let user_id = credentials.user.id;
    let permissions = db
        .users()
        .get_permissions(user_id)
        .await?
        .ok_or(AuthError::MissingPermissions { user_id })?;

    debug!(user_id, "Credentials verified");
    Ok(Identity {
        user: credentials.user,
        permissions,
    })
}

/// Rebuilds an identity from a user id. `None` when the user is gone.
pub async fn load_identity(db: &Database, user_id: i64) -> Result<Option<Identity>, AuthError> {
    let Some(user) = db.users().get_by_id(user_id).await? else {
        return Ok(None);
    };

    let permissions = db
        .users()
        .get_permissions(user_id)
        .await?
        .ok_or(AuthError::MissingPermissions { user_id })?;

    Ok(Some(Identity { user, permissions }))
}

/// Re-checks the current password of a user before a credential change.
pub async fn reverify(db: &Database, user_id: i64, password: &str) -> Result<(), AuthError> {
    let hash = db
        .users()
        .password_hash(user_id)
        .await?
        .ok_or(AuthError::UnknownEmail)?;

    if verify_password(password, &hash) {
        Ok(())
    } else {
        Err(AuthError::InvalidCredential)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use stock_core::{Permissions, Role};
    use stock_db::DbConfig;

    async fn db_with_user(perms: bool) -> (Database, i64) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let hash = hash_password("secret123").unwrap();
        let user = db
            .users()
            .create("clerk@shop.local", &hash, Role::User, Permissions::all_granted())
            .await
            .unwrap();
        if !perms {
            db.execute_statement("DELETE FROM user_permissions WHERE user_id = ?1", &[user.id.into()])
                .await
                .unwrap();
        }
        (db, user.id)
    }

    #[test]
    fn test_hash_is_salted() {
        let a = hash_password("secret123").unwrap();
        let b = hash_password("secret123").unwrap();
        assert_ne!(a, b);
        assert!(a.starts_with("$argon2"));
        assert!(verify_password("secret123", &a));
        assert!(verify_password("secret123", &b));
        assert!(!verify_password("secret124", &a));
    }

    #[test]
    fn test_malformed_hash_never_matches() {
        assert!(!verify_password("anything", "not-a-phc-string"));
        assert!(!verify_password("", ""));
    }

    #[tokio::test]
    async fn test_verify_credentials() {
        let (db, user_id) = db_with_user(true).await;

        let identity = verify_credentials(&db, " Clerk@Shop.local ", "secret123").await.unwrap();
        assert_eq!(identity.user.id, user_id);
        assert_eq!(identity.permissions, Permissions::all_granted());

        assert!(matches!(
            verify_credentials(&db, "clerk@shop.local", "wrong-pass").await,
            Err(AuthError::InvalidCredential)
        ));
        assert!(matches!(
            verify_credentials(&db, "nobody@shop.local", "secret123").await,
            Err(AuthError::UnknownEmail)
        ));
    }

    #[tokio::test]
    async fn test_missing_permissions_reported() {
        let (db, user_id) = db_with_user(false).await;

        let err = verify_credentials(&db, "clerk@shop.local", "secret123").await.unwrap_err();
        assert!(matches!(err, AuthError::MissingPermissions { user_id: id } if id == user_id));

        let err = load_identity(&db, user_id).await.unwrap_err();
        assert!(matches!(err, AuthError::MissingPermissions { .. }));
    }

    #[tokio::test]
    async fn test_load_identity_for_missing_user() {
        let (db, user_id) = db_with_user(true).await;
        assert!(load_identity(&db, user_id + 100).await.unwrap().is_none());
        assert!(load_identity(&db, user_id).await.unwrap().is_some());
    }
}
