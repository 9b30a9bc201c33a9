//! # Database State
//!
//! Wraps the `Database` handle for use in commands.
//!
//! ## Commit Rule
//! Every command that changes the store ends with [`DbState::commit`]:
//! export a snapshot and persist it to the slot. A failed persist is
//! returned as `PERSISTENCE_ERROR`; the in-memory change stays.
//!
//! ## Usage in Commands
//! ```rust,ignore
//! pub async fn create_product(db: &DbState, session: &SessionState, input: ProductInput)
//!     -> Result<Product, ApiError>
//! {
//!     let identity = session.require(Capability::Stock).await?;
//!     let product = db.inner().products().insert(&input, identity.user.id).await?;
//!     db.commit().await?;
//!     Ok(product)
//! }
//! ```

use tracing::debug;

use crate::error::ApiError;
use stock_db::Database;

/// Wrapper around `Database` for command state.
#[derive(Debug, Clone)]
pub struct DbState {
    db: Database,
}

impl DbState {
    pub fn new(db: Database) -> Self {
        DbState { db }
    }

    /// Returns a reference to the inner Database.
    pub fn inner(&self) -> &Database {
        &self.db
    }

    /// Persists the current store contents to the snapshot slot.
    pub async fn commit(&self) -> Result<(), ApiError> {
        self.db.flush().await?;
        debug!("Store committed");
        Ok(())
    }
}
