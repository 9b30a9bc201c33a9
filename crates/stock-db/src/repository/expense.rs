//! # Expense Repository
//!
//! Expenses are an independent ledger with no effect on stock.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use stock_core::{Expense, NewExpense};

const SELECT_EXPENSE: &str = r#"
    SELECT e.id, e.date, e.description, e.amount_cents, e.payment_mode,
           e.category, e.comment, e.created_by, u.email AS creator_email
    FROM expenses e
    LEFT JOIN users u ON u.id = e.created_by
"#;

/// Repository for expense database operations.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    pool: SqlitePool,
}

impl ExpenseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ExpenseRepository { pool }
    }

    /// Full history, newest first by `(date, id)`.
    pub async fn list(&self) -> DbResult<Vec<Expense>> {
        let expenses: Vec<Expense> =
            sqlx::query_as(&format!("{SELECT_EXPENSE} ORDER BY e.date DESC, e.id DESC"))
                .fetch_all(&self.pool)
                .await?;
        Ok(expenses)
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Expense>> {
        let expense: Option<Expense> = sqlx::query_as(&format!("{SELECT_EXPENSE} WHERE e.id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(expense)
    }

    pub async fn insert(&self, expense: &NewExpense, created_by: i64) -> DbResult<Expense> {
        debug!(amount = expense.amount_cents, mode = %expense.payment_mode, "Inserting expense");

        let id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO expenses (
                date, description, amount_cents, payment_mode, category, comment, created_by
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            RETURNING id
            "#,
        )
        .bind(expense.date)
        .bind(&expense.description)
        .bind(expense.amount_cents)
        .bind(expense.payment_mode)
        .bind(expense.category.as_deref())
        .bind(expense.comment.as_deref())
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Expense", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::NaiveDate;
    use stock_core::PaymentMode;

    fn expense(day: u32, amount: i64) -> NewExpense {
        NewExpense {
            date: NaiveDate::from_ymd_opt(2024, 7, day).unwrap(),
            description: "Transport".into(),
            amount_cents: amount,
            payment_mode: PaymentMode::Cheque,
            category: Some("Logistics".into()),
            comment: None,
        }
    }

    #[tokio::test]
    async fn test_insert_and_list() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.expenses();

        repo.insert(&expense(1, 100), 1).await.unwrap();
        let newest = repo.insert(&expense(8, 200), 1).await.unwrap();
        assert_eq!(newest.payment_mode, PaymentMode::Cheque);
        // creator row does not exist in this store
        assert_eq!(newest.creator_email, None);

        let listed = repo.list().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].id, newest.id);
        assert_eq!(listed[1].amount_cents, 100);
    }
}
