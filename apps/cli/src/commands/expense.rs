//! # Expense Commands

use tracing::info;

use crate::error::ApiError;
use crate::state::{DbState, SessionState};
use stock_core::validation::validate_expense;
use stock_core::{Capability, Expense, ExpenseInput};

/// Full history, newest first.
pub async fn list_expenses(db: &DbState, session: &SessionState) -> Result<Vec<Expense>, ApiError> {
    session.require(Capability::Expenses).await?;
    Ok(db.inner().expenses().list().await?)
}

/// ## Errors
/// - `VALIDATION_ERROR` when the description is blank, the amount is not
///   positive or the payment mode is missing
pub async fn record_expense(
    db: &DbState,
    session: &SessionState,
    input: ExpenseInput,
) -> Result<Expense, ApiError> {
    let identity = session.require(Capability::Expenses).await?;
    let expense = validate_expense(&input)?;

    let stored = db.inner().expenses().insert(&expense, identity.user.id).await?;
    db.commit().await?;

    info!(expense_id = stored.id, amount = stored.amount_cents, "Expense recorded");
    Ok(stored)
}
