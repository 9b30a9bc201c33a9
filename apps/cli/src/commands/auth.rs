//! # Identity Commands
//!
//! Login, logout, registration, credential changes and user administration.

use tracing::{debug, info};

use crate::auth;
use crate::error::ApiError;
use crate::state::{DbState, SessionState};
use stock_core::validation::{validate_email, validate_password};
use stock_core::{Identity, Permissions, Role, User, UserAccount};

/// Verifies credentials and opens a session.
///
/// Unknown email and wrong password return the same `AUTH_FAILURE`.
pub async fn login(
    db: &DbState,
    session: &SessionState,
    email: &str,
    password: &str,
) -> Result<Identity, ApiError> {
    let identity = auth::verify_credentials(db.inner(), email, password).await?;
    session.establish(identity.clone()).await?;
    Ok(identity)
}

/// Clears the session. Never fails.
pub async fn logout(session: &SessionState) {
    session.clear().await;
}

pub async fn whoami(session: &SessionState) -> Result<Identity, ApiError> {
    session.require_login().await
}

/// Creates an account with every capability granted.
///
/// Anyone may register a `user` account. An `admin` account needs an
/// administrator session.
///
/// ## Errors
/// - `VALIDATION_ERROR` for a malformed email or a short password
/// - `ALREADY_EXISTS` when the email is taken
pub async fn register(
    db: &DbState,
    session: &SessionState,
    email: &str,
    password: &str,
    role: Role,
) -> Result<User, ApiError> {
    if role == Role::Admin {
        session.require_admin().await?;
    }

    let email = validate_email(email)?;
    validate_password(password)?;
    let hash = auth::hash_password(password)?;

    let user = db
        .inner()
        .users()
        .create(&email, &hash, role, Permissions::all_granted())
        .await?;
    db.commit().await?;

    info!(user_id = user.id, role = role.as_str(), "User registered");
    Ok(user)
}

/// Changes the logged-in user's email and/or password.
///
/// The current password is checked first. Any effective change ends the
/// session.
///
/// ## Errors
/// - `AUTH_FAILURE` when `current_password` is wrong (nothing changes)
/// - `ALREADY_EXISTS` when the new email belongs to someone else
/// - `VALIDATION_ERROR` when neither field is given, or one is malformed
pub async fn change_credentials(
    db: &DbState,
    session: &SessionState,
    current_password: &str,
    new_email: Option<&str>,
    new_password: Option<&str>,
) -> Result<User, ApiError> {
    let identity = session.require_login().await?;
    auth::reverify(db.inner(), identity.user.id, current_password).await?;

    let new_email = new_email.map(validate_email).transpose()?;
    if let Some(password) = new_password {
        validate_password(password)?;
    }

    // Same email as now is not a change
    let new_email = new_email.filter(|email| *email != identity.user.email);
    if new_email.is_none() && new_password.is_none() {
        return Err(ApiError::validation("Nothing to change"));
    }

    let new_hash = new_password.map(auth::hash_password).transpose()?;

    let user = db
        .inner()
        .users()
        .update_credentials(identity.user.id, new_email.as_deref(), new_hash.as_deref())
        .await?;
    db.commit().await?;

    info!(
        user_id = user.id,
        email_changed = new_email.is_some(),
        password_changed = new_hash.is_some(),
        "Credentials changed, session ended"
    );
    session.clear().await;

    Ok(user)
}

/// Every account with its permissions. Administrator only.
pub async fn list_users(db: &DbState, session: &SessionState) -> Result<Vec<UserAccount>, ApiError> {
    session.require_admin().await?;
    let users = db.inner().users().list().await?;
    debug!(count = users.len(), "list_users command");
    Ok(users)
}

/// Replaces a user's capability flags. Administrator only.
pub async fn set_permissions(
    db: &DbState,
    session: &SessionState,
    user_id: i64,
    permissions: Permissions,
) -> Result<Permissions, ApiError> {
    let admin = session.require_admin().await?;

    db.inner().users().set_permissions(user_id, permissions).await?;
    db.commit().await?;

    info!(
        admin_id = admin.user.id,
        user_id,
        granted = ?permissions.granted(),
        "Permissions changed"
    );
    Ok(permissions)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use stock_core::Capability;
    use stock_db::{Database, DbConfig};

    async fn setup() -> (DbState, SessionState) {
        let db = DbState::new(Database::new(DbConfig::in_memory()).await.unwrap());
        (db, SessionState::volatile())
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let (db, session) = setup().await;

        let user = register(&db, &session, "Clerk@Shop.local", "secret123", Role::User)
            .await
            .unwrap();
        assert_eq!(user.email, "clerk@shop.local");
        assert_eq!(user.role, Role::User);

        let identity = login(&db, &session, "clerk@shop.local", "secret123").await.unwrap();
        assert_eq!(identity.permissions, Permissions::all_granted());
        assert_eq!(whoami(&session).await.unwrap().user.id, user.id);

        logout(&session).await;
        assert_eq!(whoami(&session).await.unwrap_err().code, ErrorCode::Unauthenticated);
    }

    #[tokio::test]
    async fn test_register_rules() {
        let (db, session) = setup().await;

        let short = register(&db, &session, "a@shop.local", "12345", Role::User).await.unwrap_err();
        assert_eq!(short.code, ErrorCode::ValidationError);

        register(&db, &session, "a@shop.local", "123456", Role::User).await.unwrap();
        let dup = register(&db, &session, "A@shop.local", "123456", Role::User).await.unwrap_err();
        assert_eq!(dup.code, ErrorCode::AlreadyExists);

        let admin = register(&db, &session, "boss@shop.local", "123456", Role::Admin).await.unwrap_err();
        assert_eq!(admin.code, ErrorCode::Unauthenticated);
    }

    #[tokio::test]
    async fn test_login_failures_are_generic() {
        let (db, session) = setup().await;
        register(&db, &session, "clerk@shop.local", "secret123", Role::User).await.unwrap();

        let wrong = login(&db, &session, "clerk@shop.local", "nope-nope").await.unwrap_err();
        let unknown = login(&db, &session, "ghost@shop.local", "secret123").await.unwrap_err();
        assert_eq!(wrong.code, ErrorCode::AuthFailure);
        assert_eq!(unknown.code, ErrorCode::AuthFailure);
        assert_eq!(wrong.message, unknown.message);
        assert!(session.current().await.is_none());
    }

    #[tokio::test]
    async fn test_change_credentials() {
        let (db, session) = setup().await;
        register(&db, &session, "clerk@shop.local", "secret123", Role::User).await.unwrap();
        login(&db, &session, "clerk@shop.local", "secret123").await.unwrap();

        let nothing = change_credentials(&db, &session, "secret123", Some("clerk@shop.local"), None)
            .await
            .unwrap_err();
        assert_eq!(nothing.code, ErrorCode::ValidationError);

        let user = change_credentials(&db, &session, "secret123", Some("new@shop.local"), Some("another1"))
            .await
            .unwrap();
        assert_eq!(user.email, "new@shop.local");
        assert!(session.current().await.is_none());

        login(&db, &session, "new@shop.local", "another1").await.unwrap();
        assert!(login(&db, &session, "clerk@shop.local", "secret123").await.is_err());
    }

    #[tokio::test]
    async fn test_permissions_admin_only() {
        let (db, session) = setup().await;
        let clerk = register(&db, &session, "clerk@shop.local", "secret123", Role::User).await.unwrap();
        login(&db, &session, "clerk@shop.local", "secret123").await.unwrap();

        let denied = set_permissions(&db, &session, clerk.id, Permissions::none()).await.unwrap_err();
        assert_eq!(denied.code, ErrorCode::Forbidden);
        assert_eq!(list_users(&db, &session).await.unwrap_err().code, ErrorCode::Forbidden);

        // Promote by hand, then log in again to pick up the role
        db.inner()
            .execute_statement("UPDATE users SET role = 'admin' WHERE id = ?1", &[clerk.id.into()])
            .await
            .unwrap();
        login(&db, &session, "clerk@shop.local", "secret123").await.unwrap();

        let perms = Permissions::all_granted().with(Capability::Debtors, false);
        set_permissions(&db, &session, clerk.id, perms).await.unwrap();

        let accounts = list_users(&db, &session).await.unwrap();
        assert_eq!(accounts.len(), 1);
        assert_eq!(accounts[0].permissions, Some(perms));

        let missing = set_permissions(&db, &session, 999, perms).await.unwrap_err();
        assert_eq!(missing.code, ErrorCode::NotFound);
    }
}
