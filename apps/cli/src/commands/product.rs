//! # Product Commands
//!
//! Catalog CRUD and the stock views derived from the movement ledger.
//!
//! ## Stock View Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  list_stock()                                                           │
//! │       │                                                                 │
//! │       ├── products.list()    (ordered by name)                          │
//! │       ├── movements.list()   (full history)                             │
//! │       ▼                                                                 │
//! │  ledger::stock_levels(products, movements)                              │
//! │       current = initial + Σ ENTREE − Σ SORTIE                          │
//! │       low     = current <= min_stock                                    │
//! │                                                                         │
//! │  Nothing is cached: every call folds the whole history again.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::Serialize;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::state::{DbState, SessionState};
use stock_core::ledger;
use stock_core::validation::{validate_product_input, validate_search_query};
use stock_core::{Capability, Product, ProductInput, StockLevel};

/// A product that can be sold right now.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShopItem {
    pub product: Product,
    pub current_stock: i64,
}

/// All products ordered by name, with creator email.
pub async fn list_products(db: &DbState, session: &SessionState) -> Result<Vec<Product>, ApiError> {
    session.require(Capability::Stock).await?;
    Ok(db.inner().products().list().await?)
}

/// Case-insensitive filter over code, name and category.
pub async fn search_products(
    db: &DbState,
    session: &SessionState,
    query: &str,
) -> Result<Vec<Product>, ApiError> {
    session.require(Capability::Stock).await?;

    let start = Instant::now();
    let query = validate_search_query(query)?;
    let products = db.inner().products().list().await?;
    let found: Vec<Product> = ledger::search_products(&products, &query)
        .into_iter()
        .cloned()
        .collect();

    debug!(
        query = %query,
        results = found.len(),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "search_products command"
    );
    Ok(found)
}

/// ## Errors
/// - `VALIDATION_ERROR` when code or name is blank, or a number is negative
/// - `ALREADY_EXISTS` when the code is taken
pub async fn create_product(
    db: &DbState,
    session: &SessionState,
    input: ProductInput,
) -> Result<Product, ApiError> {
    let identity = session.require(Capability::Stock).await?;
    let input = validate_product_input(&input)?;

    let product = db.inner().products().insert(&input, identity.user.id).await?;
    db.commit().await?;

    info!(product_id = product.id, code = %product.code, "Product created");
    Ok(product)
}

/// Overwrites every editable field.
///
/// ## Errors
/// - `NOT_FOUND` when the product does not exist
/// - `ALREADY_EXISTS` when the new code belongs to another product
pub async fn update_product(
    db: &DbState,
    session: &SessionState,
    id: i64,
    input: ProductInput,
) -> Result<Product, ApiError> {
    session.require(Capability::Stock).await?;
    let input = validate_product_input(&input)?;

    let product = db.inner().products().update(id, &input).await?;
    db.commit().await?;

    info!(product_id = id, code = %product.code, "Product updated");
    Ok(product)
}

/// Deletes a product. Administrator with the stock capability only.
///
/// Movements and sales that reference the product are left in place and
/// drop out of the stock fold.
pub async fn delete_product(db: &DbState, session: &SessionState, id: i64) -> Result<(), ApiError> {
    session.require(Capability::Stock).await?;
    let admin = session.require_admin().await?;

    let products = db.inner().products();
    if !products.exists(id).await? {
        return Err(ApiError::not_found("Product", id));
    }

    let (movements, sales) = products.count_references(id).await?;
    products.delete(id).await?;
    db.commit().await?;

    if movements > 0 || sales > 0 {
        warn!(
            product_id = id,
            orphaned_movements = movements,
            orphaned_sales = sales,
            "Product deleted with ledger rows still referencing it"
        );
    }
    info!(product_id = id, admin_id = admin.user.id, "Product deleted");
    Ok(())
}

/// Per-product stock derived from the full movement history.
pub async fn list_stock(db: &DbState, session: &SessionState) -> Result<Vec<StockLevel>, ApiError> {
    session.require(Capability::Stock).await?;

    let products = db.inner().products().list().await?;
    let movements = db.inner().movements().list().await?;
    Ok(ledger::stock_levels(&products, &movements))
}

/// Products with stock above zero. Open to any logged-in user.
pub async fn shop(db: &DbState, session: &SessionState) -> Result<Vec<ShopItem>, ApiError> {
    session.require_login().await?;

    let products = db.inner().products().list().await?;
    let movements = db.inner().movements().list().await?;
    Ok(ledger::available_products(&products, &movements)
        .into_iter()
        .map(|(product, current_stock)| ShopItem {
            product: product.clone(),
            current_stock,
        })
        .collect())
}

// =============================================================================
// Unit Tests
// =============================================================================
