//! # Repository Module
//!
//! Typed access to each ledger table.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Command                                                                │
//! │       │  db.sales().record(&new_sale, user_id)                          │
//! │       ▼                                                                 │
//! │  SaleRepository                                                        │
//! │  ├── list(&self)                 newest first, joined display fields   │
//! │  ├── get_by_id(&self, id)                                               │
//! │  └── record(&self, sale, user)   sale + SORTIE movement, one tx        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  In-memory SQLite                                                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every list query joins display fields (creator email, product code and
//! name) with LEFT JOINs so rows whose product or creator is gone still show
//! up, with those fields empty.
//!
//! ## Available Repositories
//!
//! - [`user::UserRepository`] - Accounts, password hashes, permissions
//! - [`product::ProductRepository`] - Catalog CRUD
//! - [`movement::MovementRepository`] - Append-only stock ledger
//! - [`sale::SaleRepository`] - Append-only sales ledger
//! - [`expense::ExpenseRepository`] - Expense ledger

pub mod expense;
pub mod movement;
pub mod product;
pub mod sale;
pub mod user;
