//! # API Error Type
//!
//! Unified error type for every command.
//!
//! ## Error Handling Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Flow in Stockbook                              │
//! │                                                                         │
//! │  Caller                      Command layer                              │
//! │  ──────                      ─────────────                              │
//! │                                                                         │
//! │  record_sale(...)                                                       │
//! │         │                                                               │
//! │         ▼                                                               │
//! │  ┌──────────────────────────────────────────────────────────────────┐  │
//! │  │  Command Function                                                │  │
//! │  │  Result<T, ApiError>                                             │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Gate? ──────── SessionState::require ───────────┐              │  │
//! │  │         │       (UNAUTHENTICATED / FORBIDDEN)     │              │  │
//! │  │         ▼                                         ▼              │  │
//! │  │  Validation? ── ValidationError ─────────────── ApiError ──────►│  │
//! │  │         │                                         ▲              │  │
//! │  │         ▼                                         │              │  │
//! │  │  Store? ─────── DbError::UniqueViolation ─────────┘              │  │
//! │  │         │                                                        │  │
//! │  │         ▼                                                        │  │
//! │  │  Commit ─────── PERSISTENCE_ERROR if the slot write fails ─────►│  │
//! │  └──────────────────────────────────────────────────────────────────┘  │
//! │                                                                         │
//! │  { "code": "ALREADY_EXISTS", "message": "code 'RIZ' already exists" }   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Credential Failures
//! Unknown email and wrong password both surface as `AUTH_FAILURE` with the
//! same message. [`AuthError`] keeps them apart for logs and tests.

use serde::Serialize;
use stock_core::{Capability, CoreError, ValidationError};
use stock_db::DbError;

use crate::auth::AuthError;
use crate::state::ConfigError;

/// User-facing text for any credential failure.
pub const AUTH_FAILURE_MESSAGE: &str = "Invalid email or password";

/// API error returned from commands.
///
/// ## Serialization
/// ```json
/// {
///   "code": "FORBIDDEN",
///   "message": "Missing capability: can_sales"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Caller-supplied data broke a required-field or positivity rule
    ValidationError,

    /// Referenced user, product or sale does not exist
    NotFound,

    /// Duplicate email or product code
    AlreadyExists,

    /// Credential mismatch
    AuthFailure,

    /// No session
    Unauthenticated,

    /// Session lacks the capability or role
    Forbidden,

    /// The snapshot slot could not be written or read
    PersistenceError,

    /// Store operation failed
    DatabaseError,

    /// A user without a permission row, or a similar broken invariant
    InconsistentState,

    /// Anything else
    Internal,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: impl std::fmt::Display) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates the generic credential failure.
    pub fn auth_failure() -> Self {
        ApiError::new(ErrorCode::AuthFailure, AUTH_FAILURE_MESSAGE)
    }

    pub fn unauthenticated() -> Self {
        ApiError::new(ErrorCode::Unauthenticated, "Not logged in")
    }

    /// Creates a denial for a missing capability.
    pub fn missing_capability(capability: Capability) -> Self {
        ApiError::new(
            ErrorCode::Forbidden,
            format!("Missing capability: {}", capability),
        )
    }

    pub fn admin_only() -> Self {
        ApiError::new(ErrorCode::Forbidden, "Administrator role required")
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::AlreadyExists,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::ConnectionFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Store connection failed")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Store migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Store query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Store operation failed")
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Store transaction failed")
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::validation("Invalid reference")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Store connection busy")
            }
            DbError::InvalidSnapshot(e) => {
                ApiError::new(ErrorCode::ValidationError, format!("Invalid snapshot: {}", e))
            }
            DbError::Persistence(e) => {
                tracing::error!("Snapshot persistence failed: {}", e);
                ApiError::new(ErrorCode::PersistenceError, format!("Could not save data: {}", e))
            }
            DbError::Inconsistent(e) => ApiError::new(ErrorCode::InconsistentState, e),
            DbError::Internal(e) => {
                tracing::error!("Internal store error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Store operation failed")
            }
        }
    }
}

/// Converts core errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ProductNotFound(id) => ApiError::not_found("Product", id),
            CoreError::SaleNotFound(id) => ApiError::not_found("Sale", id),
            CoreError::AmountOverflow { .. } => ApiError::validation(err.to_string()),
            CoreError::Validation(e) => ApiError::validation(e.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}

/// Credential errors collapse to one message; the distinction is logged.
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::UnknownEmail | AuthError::InvalidCredential => {
                tracing::info!(reason = %err, "Authentication rejected");
                ApiError::auth_failure()
            }
            AuthError::MissingPermissions { user_id } => ApiError::new(
                ErrorCode::InconsistentState,
                format!("User {} has no permission record", user_id),
            ),
            AuthError::Db(e) => e.into(),
            AuthError::Hash(e) => {
                tracing::error!("Password hashing failed: {}", e);
                ApiError::internal("Password hashing failed")
            }
        }
    }
}

impl From<ConfigError> for ApiError {
    fn from(err: ConfigError) -> Self {
        ApiError::internal(err.to_string())
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}

impl std::error::Error for ApiError {}
