//! # Sale Repository
//!
//! Database operations for the sales ledger.
//!
//! ## Recording a Sale
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  record(new_sale, user)                                                 │
//! │     │                                                                   │
//! │     ├── BEGIN                                                           │
//! │     ├── INSERT INTO sales (... total, balance ...)                      │
//! │     ├── INSERT INTO movements (SORTIE, same date/product/qty/price/     │
//! │     │                          client/comment/creator)                 │
//! │     └── COMMIT                                                          │
//! │                                                                         │
//! │  Either both rows exist or neither does. The derived stock drops by    │
//! │  exactly the sold quantity.                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::movement::insert_movement;
use stock_core::{NewSale, Sale};

const SELECT_SALE: &str = r#"
    SELECT s.id, s.date, s.product_id, s.quantity, s.unit_price_cents,
           s.total_cents, s.payment_mode, s.client_name, s.client_phone,
           s.paid_amount_cents, s.balance_cents, s.comment, s.created_by,
           p.code AS product_code, p.name AS product_name,
           u.email AS creator_email
    FROM sales s
    LEFT JOIN products p ON p.id = s.product_id
    LEFT JOIN users u ON u.id = s.created_by
"#;

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Full history, newest first by `(date, id)`.
    pub async fn list(&self) -> DbResult<Vec<Sale>> {
        let sales: Vec<Sale> = sqlx::query_as(&format!("{SELECT_SALE} ORDER BY s.date DESC, s.id DESC"))
            .fetch_all(&self.pool)
            .await?;

        debug!(count = sales.len(), "Listed sales");
        Ok(sales)
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Sale>> {
        let sale: Option<Sale> = sqlx::query_as(&format!("{SELECT_SALE} WHERE s.id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(sale)
    }

    /// Writes the sale and its outbound movement in one transaction.
    ///
    /// Returns the sale and the id of the movement written with it.
    pub async fn record(&self, sale: &NewSale, created_by: i64) -> DbResult<(Sale, i64)> {
        debug!(
            product_id = sale.product_id,
            quantity = sale.quantity,
            total = sale.total_cents,
            balance = sale.balance_cents,
            "Recording sale"
        );

        let mut tx = self.pool.begin().await?;

        let sale_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO sales (
                date, product_id, quantity, unit_price_cents, total_cents,
                payment_mode, client_name, client_phone,
                paid_amount_cents, balance_cents, comment, created_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
            RETURNING id
            "#,
        )
        .bind(sale.date)
        .bind(sale.product_id)
        .bind(sale.quantity)
        .bind(sale.unit_price_cents)
        .bind(sale.total_cents)
        .bind(sale.payment_mode)
        .bind(sale.client_name.as_deref())
        .bind(sale.client_phone.as_deref())
        .bind(sale.paid_amount_cents)
        .bind(sale.balance_cents)
        .bind(sale.comment.as_deref())
        .bind(created_by)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| DbError::TransactionFailed(format!("sale insert: {e}")))?;

        let movement_id = insert_movement(&mut *tx, &sale.outbound_movement(), created_by)
            .await
            .map_err(|e| DbError::TransactionFailed(format!("sale movement insert: {e}")))?;

        tx.commit().await?;

        debug!(sale_id, movement_id, "Sale recorded");

        let stored = self
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| DbError::not_found("Sale", sale_id))?;
        Ok((stored, movement_id))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::SqlValue;
    use crate::{Database, DbConfig};
    use chrono::NaiveDate;
    use stock_core::{MovementKind, PaymentMode, Permissions, ProductInput, Role};

    async fn setup() -> (Database, i64, i64) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let user = db
            .users()
            .create("clerk@shop.local", "h", Role::User, Permissions::all_granted())
            .await
            .unwrap();
        let product = db
            .products()
            .insert(
                &ProductInput {
                    code: "RIZ".into(),
                    name: "Rice".into(),
                    initial_stock: 20,
                    ..Default::default()
                },
                user.id,
            )
            .await
            .unwrap();
        (db, user.id, product.id)
    }

    fn new_sale(product_id: i64) -> NewSale {
        NewSale {
            date: NaiveDate::from_ymd_opt(2024, 4, 10).unwrap(),
            product_id,
            quantity: 3,
            unit_price_cents: 500,
            total_cents: 1500,
            payment_mode: PaymentMode::MobileMoney,
            client_name: Some("Awa".into()),
            client_phone: Some("770000000".into()),
            paid_amount_cents: 1000,
            balance_cents: 500,
            comment: Some("first order".into()),
        }
    }

    #[tokio::test]
    async fn test_record_writes_sale_and_movement() {
        let (db, user_id, product_id) = setup().await;

        let (sale, movement_id) = db.sales().record(&new_sale(product_id), user_id).await.unwrap();
        assert_eq!(sale.total_cents, 1500);
        assert_eq!(sale.balance_cents, 500);
        assert_eq!(sale.payment_mode, PaymentMode::MobileMoney);
        assert_eq!(sale.product_code.as_deref(), Some("RIZ"));

        let movement = db.movements().get_by_id(movement_id).await.unwrap().unwrap();
        assert_eq!(movement.kind, MovementKind::Sortie);
        assert_eq!(movement.date, sale.date);
        assert_eq!(movement.product_id, product_id);
        assert_eq!(movement.quantity, 3);
        assert_eq!(movement.unit_price_cents, Some(500));
        assert_eq!(movement.client_name.as_deref(), Some("Awa"));
        assert_eq!(movement.client_phone.as_deref(), Some("770000000"));
        assert_eq!(movement.comment.as_deref(), Some("first order"));
        assert_eq!(movement.created_by, Some(user_id));

        assert_eq!(db.sales().list().await.unwrap().len(), 1);
        assert_eq!(db.movements().list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_record_rolls_back_when_movement_fails() {
        let (db, user_id, product_id) = setup().await;

        // Make every movement insert fail
        db.execute_statement(
            "CREATE TRIGGER block_movements BEFORE INSERT ON movements BEGIN SELECT RAISE(ABORT, 'blocked'); END",
            &[],
        )
        .await
        .unwrap();

        let err = db.sales().record(&new_sale(product_id), user_id).await.unwrap_err();
        assert!(matches!(err, DbError::TransactionFailed(_)));

        let sales = db.execute_query("SELECT COUNT(*) AS n FROM sales", &[]).await.unwrap();
        assert_eq!(sales.get(0, "n"), Some(&SqlValue::Integer(0)));
        assert!(db.movements().list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_payment_mode_stored_as_label() {
        let (db, user_id, product_id) = setup().await;
        db.sales().record(&new_sale(product_id), user_id).await.unwrap();

        let stored = db.execute_query("SELECT payment_mode FROM sales", &[]).await.unwrap();
        assert_eq!(stored.rows[0][0], SqlValue::Text("Mobile money".into()));
    }
}
