//! # Report Commands
//!
//! Dashboard and debtor views. Both load the full ledger and hand it to the
//! pure functions in `stock_core::reports`; nothing is cached between calls.

use serde::Serialize;
use tracing::debug;

use crate::error::ApiError;
use crate::state::{DbState, SessionState};
use stock_core::reports::{compute_dashboard, compute_debtors, compute_sales_summary};
use stock_core::{Capability, Dashboard, Debtor, SalesSummary};

/// Dashboard payload: stock and expense roll-up plus the sales summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardReport {
    pub stock: Dashboard,
    pub sales: SalesSummary,
}

pub async fn dashboard(db: &DbState, session: &SessionState) -> Result<DashboardReport, ApiError> {
    session.require(Capability::Dashboard).await?;

    let store = db.inner();
    let products = store.products().list().await?;
    let movements = store.movements().list().await?;
    let expenses = store.expenses().list().await?;
    let sales = store.sales().list().await?;

    let report = DashboardReport {
        stock: compute_dashboard(&products, &movements, &expenses),
        sales: compute_sales_summary(&products, &sales),
    };

    debug!(
        products = products.len(),
        movements = movements.len(),
        low_stock = report.stock.low_stock_count,
        "dashboard command"
    );
    Ok(report)
}

/// Clients with an outstanding balance, largest first.
pub async fn debtors(db: &DbState, session: &SessionState) -> Result<Vec<Debtor>, ApiError> {
    session.require(Capability::Debtors).await?;

    let sales = db.inner().sales().list().await?;
    Ok(compute_debtors(&sales))
}
