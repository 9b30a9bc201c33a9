//! # User Repository
//!
//! Accounts and their permission rows.
//!
//! ```text
//! users                         user_permissions
//! ┌────┬───────────┬───────┐    ┌─────────┬───────────┬─────┐
//! │ id │ email     │ role  │◄───│ user_id │ can_stock │ ... │   exactly one
//! └────┴───────────┴───────┘    └─────────┴───────────┴─────┘   per user
//! ```
//!
//! Users and their permission rows are always written in one transaction.
//! The password hash is only ever returned by [`UserRepository::find_credentials`]
//! and [`UserRepository::password_hash`].

use chrono::{DateTime, Utc};
use sqlx::{FromRow, Sqlite, SqlitePool, Transaction};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use stock_core::{Permissions, Role, User, UserAccount};

/// A user together with the stored password hash.
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub user: User,
    pub password_hash: String,
}

#[derive(FromRow)]
struct CredentialRow {
    id: i64,
    email: String,
    password_hash: String,
    role: Role,
    created_at: DateTime<Utc>,
}

#[derive(FromRow)]
struct AccountRow {
    id: i64,
    email: String,
    role: Role,
    created_at: DateTime<Utc>,
    can_stock: Option<bool>,
    can_movements: Option<bool>,
    can_expenses: Option<bool>,
    can_dashboard: Option<bool>,
    can_sales: Option<bool>,
    can_debtors: Option<bool>,
    can_invoices: Option<bool>,
}

impl From<AccountRow> for UserAccount {
    fn from(row: AccountRow) -> Self {
        let permissions = row.can_stock.map(|can_stock| Permissions {
            can_stock,
            can_movements: row.can_movements.unwrap_or(false),
            can_expenses: row.can_expenses.unwrap_or(false),
            can_dashboard: row.can_dashboard.unwrap_or(false),
            can_sales: row.can_sales.unwrap_or(false),
            can_debtors: row.can_debtors.unwrap_or(false),
            can_invoices: row.can_invoices.unwrap_or(false),
        });

        UserAccount {
            user: User {
                id: row.id,
                email: row.email,
                role: row.role,
                created_at: row.created_at,
            },
            permissions,
        }
    }
}

/// Repository for user and permission operations.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    /// Exact email lookup, including the password hash.
    pub async fn find_credentials(&self, email: &str) -> DbResult<Option<UserCredentials>> {
        let row: Option<CredentialRow> = sqlx::query_as(
            r#"
            SELECT id, email, password_hash, role, created_at
            FROM users
            WHERE email = ?1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| UserCredentials {
            user: User {
                id: r.id,
                email: r.email,
                role: r.role,
                created_at: r.created_at,
            },
            password_hash: r.password_hash,
        }))
    }

    /// Stored hash for a user id.
    pub async fn password_hash(&self, id: i64) -> DbResult<Option<String>> {
        let hash: Option<String> = sqlx::query_scalar("SELECT password_hash FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(hash)
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<User>> {
        let user: Option<User> =
            sqlx::query_as("SELECT id, email, role, created_at FROM users WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(user)
    }

    /// Permission row of a user. `None` means the row is missing.
    pub async fn get_permissions(&self, user_id: i64) -> DbResult<Option<Permissions>> {
        let perms: Option<Permissions> = sqlx::query_as(
            r#"
            SELECT can_stock, can_movements, can_expenses, can_dashboard,
                   can_sales, can_debtors, can_invoices
            FROM user_permissions
            WHERE user_id = ?1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(perms)
    }

    /// All accounts ordered by id, with permissions when present.
    pub async fn list(&self) -> DbResult<Vec<UserAccount>> {
        let rows: Vec<AccountRow> = sqlx::query_as(
            r#"
            SELECT u.id, u.email, u.role, u.created_at,
                   p.can_stock, p.can_movements, p.can_expenses, p.can_dashboard,
                   p.can_sales, p.can_debtors, p.can_invoices
            FROM users u
            LEFT JOIN user_permissions p ON p.user_id = u.id
            ORDER BY u.id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(UserAccount::from).collect())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    /// Inserts a user and its permission row in one transaction.
    ///
    /// ## Errors
    /// - `UniqueViolation` when the email is taken
    pub async fn create(
        &self,
        email: &str,
        password_hash: &str,
        role: Role,
        permissions: Permissions,
    ) -> DbResult<User> {
        debug!(email = %email, role = role.as_str(), "Creating user");

        let mut tx = self.pool.begin().await?;
        let user = insert_user(&mut tx, email, password_hash, role, permissions).await?;
        tx.commit().await?;

        Ok(user)
    }

    /// Seeds the first administrator when the store has no users.
    ///
    /// Returns `true` when an account was created.
    pub async fn bootstrap_admin(&self, email: &str, password_hash: &str) -> DbResult<bool> {
        let mut tx = self.pool.begin().await?;

        let existing: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&mut *tx)
            .await?;
        if existing > 0 {
            return Ok(false);
        }

        let user = insert_user(&mut tx, email, password_hash, Role::Admin, Permissions::all_granted()).await?;
        tx.commit().await?;

        info!(user_id = user.id, email = %user.email, "Bootstrap administrator created");
        Ok(true)
    }

    /// Changes email and/or password hash in one transaction.
    ///
    /// ## Errors
    /// - `NotFound` when the user is gone
    /// - `UniqueViolation` when the new email belongs to someone else
    pub async fn update_credentials(
        &self,
        id: i64,
        new_email: Option<&str>,
        new_password_hash: Option<&str>,
    ) -> DbResult<User> {
        let mut tx = self.pool.begin().await?;

        if let Some(email) = new_email {
            let result = sqlx::query("UPDATE users SET email = ?2 WHERE id = ?1")
                .bind(id)
                .bind(email)
                .execute(&mut *tx)
                .await
                .map_err(|e| match DbError::from(e) {
                    DbError::UniqueViolation { .. } => DbError::duplicate("email", email),
                    other => other,
                })?;
            if result.rows_affected() == 0 {
                return Err(DbError::not_found("User", id));
            }
        }

        if let Some(hash) = new_password_hash {
            let result = sqlx::query("UPDATE users SET password_hash = ?2 WHERE id = ?1")
                .bind(id)
                .bind(hash)
                .execute(&mut *tx)
                .await?;
            if result.rows_affected() == 0 {
                return Err(DbError::not_found("User", id));
            }
        }

        let user: User = sqlx::query_as("SELECT id, email, role, created_at FROM users WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| DbError::not_found("User", id))?;

        tx.commit().await?;
        debug!(user_id = id, email_changed = new_email.is_some(), password_changed = new_password_hash.is_some(), "Credentials updated");
        Ok(user)
    }

    /// Replaces a user's permission row, creating it if it was missing.
    pub async fn set_permissions(&self, user_id: i64, permissions: Permissions) -> DbResult<()> {
        if self.get_by_id(user_id).await?.is_none() {
            return Err(DbError::not_found("User", user_id));
        }

        sqlx::query(
            r#"
            INSERT INTO user_permissions (
                user_id, can_stock, can_movements, can_expenses, can_dashboard,
                can_sales, can_debtors, can_invoices
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(user_id) DO UPDATE SET
                can_stock = excluded.can_stock,
                can_movements = excluded.can_movements,
                can_expenses = excluded.can_expenses,
                can_dashboard = excluded.can_dashboard,
                can_sales = excluded.can_sales,
                can_debtors = excluded.can_debtors,
                can_invoices = excluded.can_invoices
            "#,
        )
        .bind(user_id)
        .bind(permissions.can_stock)
        .bind(permissions.can_movements)
        .bind(permissions.can_expenses)
        .bind(permissions.can_dashboard)
        .bind(permissions.can_sales)
        .bind(permissions.can_debtors)
        .bind(permissions.can_invoices)
        .execute(&self.pool)
        .await?;

        debug!(user_id, granted = ?permissions.granted(), "Permissions updated");
        Ok(())
    }
}

async fn insert_user(
    tx: &mut Transaction<'_, Sqlite>,
    email: &str,
    password_hash: &str,
    role: Role,
    permissions: Permissions,
) -> DbResult<User> {
    let id: i64 = sqlx::query_scalar(
        "INSERT INTO users (email, password_hash, role) VALUES (?1, ?2, ?3) RETURNING id",
    )
    .bind(email)
    .bind(password_hash)
    .bind(role)
    .fetch_one(&mut **tx)
    .await
    .map_err(|e| match DbError::from(e) {
        DbError::UniqueViolation { .. } => DbError::duplicate("email", email),
        other => other,
    })?;

    sqlx::query(
        r#"
        INSERT INTO user_permissions (
            user_id, can_stock, can_movements, can_expenses, can_dashboard,
            can_sales, can_debtors, can_invoices
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(id)
    .bind(permissions.can_stock)
    .bind(permissions.can_movements)
    .bind(permissions.can_expenses)
    .bind(permissions.can_dashboard)
    .bind(permissions.can_sales)
    .bind(permissions.can_debtors)
    .bind(permissions.can_invoices)
    .execute(&mut **tx)
    .await?;

    let user: User = sqlx::query_as("SELECT id, email, role, created_at FROM users WHERE id = ?1")
        .bind(id)
        .fetch_one(&mut **tx)
        .await?;

    Ok(user)
}

// =============================================================================
// Unit Tests
// =============================================================================
