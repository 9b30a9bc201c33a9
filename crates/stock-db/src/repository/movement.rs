//! # Movement Repository
//!
//! The append-only stock ledger. There is no update or delete here.
//!
//! [`insert_movement`] is generic over the executor so the sale repository
//! can append the outbound movement inside its own transaction.

use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use stock_core::{Movement, NewMovement};

const SELECT_MOVEMENT: &str = r#"
    SELECT m.id, m.date, m.type AS kind, m.product_id, m.quantity,
           m.unit_price_cents, m.client_name, m.client_phone, m.comment,
           m.created_by,
           p.code AS product_code, p.name AS product_name,
           u.email AS creator_email
    FROM movements m
    LEFT JOIN products p ON p.id = m.product_id
    LEFT JOIN users u ON u.id = m.created_by
"#;

/// Appends one movement row and returns its id.
pub async fn insert_movement<'e, E>(executor: E, movement: &NewMovement, created_by: i64) -> DbResult<i64>
where
    E: Executor<'e, Database = Sqlite>,
{
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO movements (
            date, type, product_id, quantity, unit_price_cents,
            client_name, client_phone, comment, created_by
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
        RETURNING id
        "#,
    )
    .bind(movement.date)
    .bind(movement.kind)
    .bind(movement.product_id)
    .bind(movement.quantity)
    .bind(movement.unit_price_cents)
    .bind(movement.client_name.as_deref())
    .bind(movement.client_phone.as_deref())
    .bind(movement.comment.as_deref())
    .bind(created_by)
    .fetch_one(executor)
    .await?;

    Ok(id)
}

/// Repository for movement database operations.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
}

impl MovementRepository {
    pub fn new(pool: SqlitePool) -> Self {
        MovementRepository { pool }
    }

    /// Full history, newest first by `(date, id)`.
    pub async fn list(&self) -> DbResult<Vec<Movement>> {
        let movements: Vec<Movement> =
            sqlx::query_as(&format!("{SELECT_MOVEMENT} ORDER BY m.date DESC, m.id DESC"))
                .fetch_all(&self.pool)
                .await?;

        debug!(count = movements.len(), "Listed movements");
        Ok(movements)
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Movement>> {
        let movement: Option<Movement> =
            sqlx::query_as(&format!("{SELECT_MOVEMENT} WHERE m.id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(movement)
    }

    /// Appends a validated movement.
    pub async fn insert(&self, movement: &NewMovement, created_by: i64) -> DbResult<Movement> {
        debug!(
            product_id = movement.product_id,
            kind = %movement.kind,
            quantity = movement.quantity,
            "Appending movement"
        );

        let id = insert_movement(&self.pool, movement, created_by).await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Movement", id))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
