//! # Product Repository
//!
//! Catalog CRUD. Stock is never stored here: `initial_stock` is the baseline
//! and the current level is folded from movements by `stock_core::ledger`.
//!
//! ## Deletion
//! Deleting a product does not touch its movements or sales. Those rows keep
//! their `product_id`, show no product code/name in list views, and are
//! skipped by the stock fold. [`ProductRepository::count_references`] tells
//! the caller how many rows are left behind.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use stock_core::{Product, ProductInput};

const SELECT_PRODUCT: &str = r#"
    SELECT p.id, p.code, p.name, p.category, p.initial_stock, p.min_stock,
           p.unit_price_cents, p.purchase_price_cents, p.reseller_price_cents,
           p.image_path, p.created_by, u.email AS creator_email
    FROM products p
    LEFT JOIN users u ON u.id = p.created_by
"#;

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

fn map_code_conflict(err: sqlx::Error, code: &str) -> DbError {
    match DbError::from(err) {
        DbError::UniqueViolation { .. } => DbError::duplicate("code", code),
        other => other,
    }
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// All products ordered by name, then id.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let products: Vec<Product> =
            sqlx::query_as(&format!("{SELECT_PRODUCT} ORDER BY p.name, p.id"))
                .fetch_all(&self.pool)
                .await?;

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Product>> {
        let product: Option<Product> = sqlx::query_as(&format!("{SELECT_PRODUCT} WHERE p.id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Product>> {
        let product: Option<Product> =
            sqlx::query_as(&format!("{SELECT_PRODUCT} WHERE p.code = ?1"))
                .bind(code)
                .fetch_optional(&self.pool)
                .await?;
        Ok(product)
    }

    pub async fn exists(&self, id: i64) -> DbResult<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(found.is_some())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let n: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;
        Ok(n)
    }

    /// Inserts a validated product.
    ///
    /// ## Errors
    /// - `UniqueViolation` on `code` when another product already uses it
    pub async fn insert(&self, input: &ProductInput, created_by: i64) -> DbResult<Product> {
        debug!(code = %input.code, "Inserting product");

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO products (
                code, name, category, initial_stock, min_stock,
                unit_price_cents, purchase_price_cents, reseller_price_cents,
                image_path, created_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            RETURNING id
            "#,
        )
        .bind(&input.code)
        .bind(&input.name)
        .bind(&input.category)
        .bind(input.initial_stock)
        .bind(input.min_stock)
        .bind(input.unit_price_cents)
        .bind(input.purchase_price_cents)
        .bind(input.reseller_price_cents)
        .bind(&input.image_path)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_code_conflict(e, &input.code))?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Overwrites every editable field of a product.
    ///
    /// ## Errors
    /// - `NotFound` when no product has this id
    /// - `UniqueViolation` on `code` when it collides with another product
    pub async fn update(&self, id: i64, input: &ProductInput) -> DbResult<Product> {
        debug!(id, code = %input.code, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                code = ?2,
                name = ?3,
                category = ?4,
                initial_stock = ?5,
                min_stock = ?6,
                unit_price_cents = ?7,
                purchase_price_cents = ?8,
                reseller_price_cents = ?9,
                image_path = ?10
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&input.code)
        .bind(&input.name)
        .bind(&input.category)
        .bind(input.initial_stock)
        .bind(input.min_stock)
        .bind(input.unit_price_cents)
        .bind(input.purchase_price_cents)
        .bind(input.reseller_price_cents)
        .bind(&input.image_path)
        .execute(&self.pool)
        .await
        .map_err(|e| map_code_conflict(e, &input.code))?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Deletes a product row. Ledger rows referencing it stay.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        debug!(id, "Product deleted");
        Ok(())
    }

    /// Number of `(movements, sales)` rows pointing at a product.
    pub async fn count_references(&self, id: i64) -> DbResult<(i64, i64)> {
        let counts: (i64, i64) = sqlx::query_as(
            r#"
            SELECT
                (SELECT COUNT(*) FROM movements WHERE product_id = ?1),
                (SELECT COUNT(*) FROM sales WHERE product_id = ?1)
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(counts)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use stock_core::{Permissions, Role};

    async fn setup() -> (Database, i64) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let user = db
            .users()
            .create("clerk@shop.local", "h", Role::User, Permissions::all_granted())
            .await
            .unwrap();
        (db, user.id)
    }

    fn input(code: &str, name: &str) -> ProductInput {
        ProductInput {
            code: code.into(),
            name: name.into(),
            category: Some("Food".into()),
            initial_stock: 10,
            min_stock: 2,
            unit_price_cents: 1500,
            purchase_price_cents: 1000,
            reseller_price_cents: 1200,
            image_path: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let (db, user_id) = setup().await;
        let repo = db.products();

        let product = repo.insert(&input("RIZ", "Rice"), user_id).await.unwrap();
        assert_eq!(product.code, "RIZ");
        assert_eq!(product.initial_stock, 10);
        assert_eq!(product.created_by, Some(user_id));
        assert_eq!(product.creator_email.as_deref(), Some("clerk@shop.local"));

        assert_eq!(repo.get_by_code("RIZ").await.unwrap(), Some(product.clone()));
        assert!(repo.exists(product.id).await.unwrap());
        assert!(!repo.exists(product.id + 1).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_ordered_by_name() {
        let (db, user_id) = setup().await;
        let repo = db.products();
        repo.insert(&input("C", "Sugar"), user_id).await.unwrap();
        repo.insert(&input("A", "Oil"), user_id).await.unwrap();
        repo.insert(&input("B", "Beans"), user_id).await.unwrap();

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Beans", "Oil", "Sugar"]);
    }

    #[tokio::test]
    async fn test_duplicate_code() {
        let (db, user_id) = setup().await;
        let repo = db.products();
        repo.insert(&input("RIZ", "Rice"), user_id).await.unwrap();

        let err = repo.insert(&input("RIZ", "Other"), user_id).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref value, .. } if value == "RIZ"));
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_update() {
        let (db, user_id) = setup().await;
        let repo = db.products();
        let rice = repo.insert(&input("RIZ", "Rice"), user_id).await.unwrap();
        repo.insert(&input("OIL", "Oil"), user_id).await.unwrap();

        let mut changed = input("RIZ-5", "Rice 5kg");
        changed.min_stock = 4;
        let updated = repo.update(rice.id, &changed).await.unwrap();
        assert_eq!(updated.code, "RIZ-5");
        assert_eq!(updated.min_stock, 4);

        let clash = repo.update(rice.id, &input("OIL", "Rice")).await.unwrap_err();
        assert!(matches!(clash, DbError::UniqueViolation { .. }));

        let missing = repo.update(999, &input("ZZZ", "Nothing")).await.unwrap_err();
        assert!(matches!(missing, DbError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_delete() {
        let (db, user_id) = setup().await;
        let repo = db.products();
        let rice = repo.insert(&input("RIZ", "Rice"), user_id).await.unwrap();

        repo.delete(rice.id).await.unwrap();
        assert!(repo.get_by_id(rice.id).await.unwrap().is_none());
        assert!(matches!(repo.delete(rice.id).await, Err(DbError::NotFound { .. })));
    }
}
