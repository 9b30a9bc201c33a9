//! # stock-core: Pure Business Logic for Stockbook
//!
//! This crate is the **heart** of Stockbook. It contains the ledger rules
//! as pure functions with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockbook Architecture                           │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    Command Layer (apps/cli)                     │   │
//! │  │    login ──► capability gate ──► record_sale ──► commit         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ stock-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │  ledger   │  │  reports  │  │   │
//! │  │   │  Product  │  │   Money   │  │  stock    │  │ dashboard │  │   │
//! │  │   │  Sale     │  │           │  │  totals   │  │ debtors   │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    stock-db (Database Layer)                    │   │
//! │  │          SQLite queries, migrations, snapshots, repositories    │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Movement, Sale, Expense, User, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation for every ledger write
//! - [`ledger`] - Stock derivation and sale totals
//! - [`reports`] - Dashboard, category and debtor roll-ups
//!
//! ## Design Principles
//!
//! 1. **Derived, never stored**: current stock is always folded from the
//!    full movement history, never kept as a running counter
//! 2. **No I/O**: Database, network, file system access is FORBIDDEN here
//! 3. **Integer Money**: All monetary values are in minor units (i64)
//! 4. **Explicit Errors**: All errors are typed, never strings or panics
//!
//! ## Example Usage
//!
//! ```rust
//! use stock_core::ledger::SaleTotals;
//!
//! // 3 items at 1500, customer paid 4000 up front
//! let totals = SaleTotals::compute(3, 1500, 4000).unwrap();
//! assert_eq!(totals.total_cents, 4500);
//! assert_eq!(totals.balance_cents, 500);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod ledger;
pub mod money;
pub mod reports;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Bucket used by the category roll-up when a product has no category.
pub const UNCATEGORIZED: &str = "Uncategorized";

/// Debtor name used when a sale carries no client name.
pub const UNKNOWN_CLIENT: &str = "Unknown client";

/// Minimum length of a new password.
pub const MIN_PASSWORD_LEN: usize = 6;

/// Maximum quantity accepted on a single movement or sale line.
///
/// ## Business Reason
/// Catches typing slips (an extra zero or two) before they skew the
/// derived stock of a product.
pub const MAX_LINE_QUANTITY: i64 = 1_000_000;

/// Maximum opening or minimum stock accepted on a product.
pub const MAX_STOCK_LEVEL: i64 = 1_000_000_000;
