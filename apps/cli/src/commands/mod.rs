//! # Commands Module
//!
//! One async function per operation. The binary, the tests and any future
//! front end all call these.
//!
//! ## Command Organization
//! ```text
//! commands/
//! ├── mod.rs       ◄─── You are here (exports)
//! ├── auth.rs      ◄─── login, logout, register, credentials, users
//! ├── product.rs   ◄─── catalog CRUD, stock levels, shop
//! ├── movement.rs  ◄─── stock ledger
//! ├── sale.rs      ◄─── sales ledger, invoices
//! ├── expense.rs   ◄─── expense ledger
//! ├── report.rs    ◄─── dashboard, debtors
//! └── backup.rs    ◄─── snapshot export / import
//! ```
//!
//! ## How Commands Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Command Flow                                         │
//! │                                                                         │
//! │  pub async fn record_sale(                                              │
//! │      db: &DbState,            ◄── store handle                         │
//! │      session: &SessionState,  ◄── capability gate                      │
//! │      input: SaleInput,        ◄── caller data                          │
//! │  ) -> Result<Sale, ApiError>                                            │
//! │         │                                                               │
//! │         ├── 1. session.require(Capability::Sales)                       │
//! │         ├── 2. validate (stock-core)                                    │
//! │         ├── 3. write through a repository (stock-db)                    │
//! │         └── 4. db.commit()  → snapshot persisted                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Read commands skip step 4 and recompute every derived view from the full
//! history on each call.

pub mod auth;
pub mod backup;
pub mod expense;
pub mod movement;
pub mod product;
pub mod report;
pub mod sale;
