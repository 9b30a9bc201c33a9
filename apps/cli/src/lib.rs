//! # Stockbook Command Layer
//!
//! Identity, capability gate and one command per ledger operation, on top of
//! `stock-core` (rules) and `stock-db` (store).
//!
//! ## Module Organization
//! ```text
//! stock_cli/
//! ├── lib.rs          ◄─── You are here (startup, tracing)
//! ├── auth.rs         ◄─── argon2 hashing, credential checks
//! ├── cli.rs          ◄─── clap definitions for the stockbook binary
//! ├── state/
//! │   ├── mod.rs      ◄─── State type exports
//! │   ├── db.rs       ◄─── Database state + commit
//! │   ├── session.rs  ◄─── Session slot and capability gate
//! │   └── config.rs   ◄─── Configuration state
//! ├── commands/       ◄─── One function per operation
//! └── error.rs        ◄─── API error type for commands
//! ```
//!
//! ## Startup Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Application Startup                               │
//! │                                                                         │
//! │  1. Initialize Logging (RUST_LOG, default warn, -v for debug)          │
//! │                                                                         │
//! │  2. ConfigState::from_env()                                            │
//! │     • data dir, app id, bootstrap admin, currency                       │
//! │                                                                         │
//! │  3. Database::open ── in-memory store, snapshot slot imported           │
//! │                                                                         │
//! │  4. No users? ── seed the administrator, commit                        │
//! │                                                                         │
//! │  5. SessionState::restore ── identity from the session slot            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod auth;
pub mod cli;
pub mod commands;
pub mod error;
pub mod state;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use error::ApiError;
use state::{ConfigState, DbState, SessionSlot, SessionState};
use stock_core::validation::{validate_email, validate_password};
use stock_db::{Database, DbConfig};

/// Everything a command may ask for.
#[derive(Debug)]
pub struct App {
    pub config: ConfigState,
    pub db: DbState,
    pub session: SessionState,
}

impl App {
    /// Opens the persisted store, seeds the administrator if needed and
    /// restores the session.
    pub async fn start(config: ConfigState) -> Result<App, ApiError> {
        info!(data_dir = %config.data_dir.display(), app_id = %config.app_id, "Starting Stockbook");

        let db_config = DbConfig::in_memory().snapshot_slot(config.snapshot_slot());
        let db = DbState::new(Database::open(db_config).await?);

        bootstrap_admin(&db, &config).await?;

        let session = SessionState::new(Some(SessionSlot::new(config.session_path())));
        if let Err(e) = session.restore(db.inner()).await {
            error!(error = %e, "Session could not be restored");
            session.clear().await;
        }

        Ok(App { config, db, session })
    }

    /// Volatile app for tests: no slots, nothing touches the disk.
    pub async fn in_memory(config: ConfigState) -> Result<App, ApiError> {
        let db = DbState::new(Database::new(DbConfig::in_memory()).await?);
        bootstrap_admin(&db, &config).await?;

        Ok(App {
            config,
            db,
            session: SessionState::volatile(),
        })
    }

    /// Closes the store. Mutating commands have already committed.
    pub async fn shutdown(self) {
        self.db.inner().close().await;
    }
}

/// Seeds one administrator with every capability when the store has no users.
///
/// Returns `true` when an account was created.
pub async fn bootstrap_admin(db: &DbState, config: &ConfigState) -> Result<bool, ApiError> {
    if db.inner().users().count().await? > 0 {
        return Ok(false);
    }

    let email = validate_email(&config.admin_email)?;
    validate_password(&config.admin_password)?;
    let hash = auth::hash_password(&config.admin_password)?;

    let created = db.inner().users().bootstrap_admin(&email, &hash).await?;
    if created {
        db.commit().await?;
        if config.uses_default_admin() {
            warn!(
                email = %email,
                "Administrator seeded with the built-in development credential; set STOCKBOOK_ADMIN_EMAIL and STOCKBOOK_ADMIN_PASSWORD"
            );
        }
    }
    Ok(created)
}

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=stock=trace` - Show trace for stock crates only
/// - Default: `warn`, or `info,stock=debug,sqlx=warn` with `--verbose`
///
/// Logs go to stderr so command output on stdout stays parseable.
pub fn init_tracing(verbose: bool) {
    let rust_log = std::env::var("RUST_LOG").ok();

    tracing_subscriber::fmt()
        .with_env_filter(log_filter(rust_log.as_deref(), verbose))
        .with_writer(std::io::stderr)
        .init();
}

/// Filter from `RUST_LOG` when it parses, otherwise the built-in default.
pub fn log_filter(rust_log: Option<&str>, verbose: bool) -> EnvFilter {
    let default = if verbose {
        "info,stock=debug,sqlx=warn"
    } else {
        "warn"
    };

    rust_log
        .filter(|directives| !directives.trim().is_empty())
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(default))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing::Level;

    #[test]
    fn test_log_filter_levels() {
        let quiet = tracing_subscriber::fmt().with_env_filter(log_filter(None, false)).finish();
        tracing::subscriber::with_default(quiet, || {
            assert!(tracing::enabled!(target: "stock_cli", Level::WARN));
            assert!(!tracing::enabled!(target: "stock_cli", Level::INFO));
            assert!(!tracing::enabled!(target: "sqlx::query", Level::TRACE));
        });

        let verbose = tracing_subscriber::fmt().with_env_filter(log_filter(None, true)).finish();
        tracing::subscriber::with_default(verbose, || {
            assert!(tracing::enabled!(target: "stock_db", Level::DEBUG));
            assert!(!tracing::enabled!(target: "stock_db", Level::TRACE));
            assert!(!tracing::enabled!(target: "sqlx::query", Level::INFO));
        });

        let explicit = tracing_subscriber::fmt()
            .with_env_filter(log_filter(Some("stock_cli=trace"), false))
            .finish();
        tracing::subscriber::with_default(explicit, || {
            assert!(tracing::enabled!(target: "stock_cli", Level::TRACE));
            assert!(!tracing::enabled!(target: "sqlx::query", Level::WARN));
        });
    }
}
