//! # State Module
//!
//! Application state for the command layer, split into focused types so
//! each command declares exactly what it touches.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    State Architecture                                   │
//! │                                                                         │
//! │  ┌──────────────┐  ┌──────────────────┐  ┌──────────────────┐          │
//! │  │   DbState    │  │  SessionState    │  │   ConfigState    │          │
//! │  │              │  │                  │  │                  │          │
//! │  │  Database    │  │  Mutex<Option<   │  │  data_dir        │          │
//! │  │  (in-memory  │  │    Identity      │  │  app_id          │          │
//! │  │   + slot)    │  │  >> + slot file  │  │  currency        │          │
//! │  └──────────────┘  └──────────────────┘  └──────────────────┘          │
//! │                                                                         │
//! │  • DbState: single-connection pool, commit() after every mutation      │
//! │  • SessionState: capability gate, session slot                         │
//! │  • ConfigState: read-only after startup                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod db;
mod session;

pub use config::{ConfigError, ConfigState, DEFAULT_ADMIN_EMAIL, DEFAULT_ADMIN_PASSWORD};
pub use db::DbState;
pub use session::{SessionSlot, SessionState, SessionToken};
