//! # Error Types
//!
//! Domain-specific error types for stock-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  stock-core errors (this file)                                         │
//! │  ├── CoreError        - General domain errors                          │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  stock-db errors (separate crate)                                      │
//! │  └── DbError          - Database and snapshot failures                 │
//! │                                                                         │
//! │  Command errors (in app)                                               │
//! │  ├── AuthError        - Credential checks                              │
//! │  └── ApiError         - What the caller sees (serialized)              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → ApiError → Caller                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Product cannot be found.
    ///
    /// ## When This Occurs
    /// - A movement or sale references a product id that was never created
    /// - The product was deleted before the ledger entry was recorded
    #[error("Product not found: {0}")]
    ProductNotFound(i64),

    /// Sale not found.
    #[error("Sale not found: {0}")]
    SaleNotFound(i64),

    /// An amount computation left the i64 range.
    ///
    /// ## When This Occurs
    /// - `quantity × unit_price` on absurd inputs
    #[error("Amount overflow while computing {what}")]
    AmountOverflow { what: String },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when caller-supplied data violates a required-field or
/// positivity constraint. The operation is aborted before any write.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Invalid format (e.g., malformed email).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

impl ValidationError {
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }

    pub fn must_be_positive(field: impl Into<String>) -> Self {
        ValidationError::MustBePositive {
            field: field.into(),
        }
    }

    pub fn negative(field: impl Into<String>) -> Self {
        ValidationError::Negative {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
