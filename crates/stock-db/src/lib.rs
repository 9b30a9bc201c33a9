//! # stock-db: Store Layer for Stockbook
//!
//! This crate owns the ledger store: an in-memory SQLite database whose
//! durable form is a binary snapshot kept in a single slot file.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Stockbook Data Flow                              │
//! │                                                                         │
//! │  CLI command (record_sale)                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     stock-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Snapshot    │  │   │
//! │  │   │   (pool.rs)   │    │               │    │ (snapshot.rs)│  │   │
//! │  │   │               │    │ UserRepo      │    │              │  │   │
//! │  │   │ :memory:      │◄───│ ProductRepo   │    │ VACUUM INTO  │  │   │
//! │  │   │ 1 connection  │    │ MovementRepo  │    │ ATTACH+copy  │  │   │
//! │  │   │               │    │ SaleRepo      │    │ slot file    │  │   │
//! │  │   └───────────────┘    │ ExpenseRepo   │    └──────────────┘  │   │
//! │  │                        └───────────────┘                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     Snapshot slot                               │   │
//! │  │   ~/.local/share/stockbook/stockbook.snapshot                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Store creation, lifecycle and snapshot flushing
//! - [`migrations`] - Embedded schema migrations
//! - [`snapshot`] - Snapshot export/import and the durable slot
//! - [`query`] - Raw parameterized query surface
//! - [`error`] - Store error types
//! - [`repository`] - Typed access per table
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stock_db::{Database, DbConfig};
//!
//! let db = Database::open(DbConfig::persistent(data_dir, "stockbook")).await?;
//!
//! let products = db.products().list().await?;
//! let movements = db.movements().list().await?;
//!
//! // After a mutation
//! db.flush().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod query;
pub mod repository;
pub mod snapshot;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use query::{QueryResult, SqlValue};
pub use snapshot::SnapshotSlot;

// Repository re-exports for convenience
pub use repository::expense::ExpenseRepository;
pub use repository::movement::{insert_movement, MovementRepository};
pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
pub use repository::user::{UserCredentials, UserRepository};
