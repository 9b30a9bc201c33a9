//! # Sale Commands
//!
//! Recording sales and printing invoices.
//!
//! ## Sale Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Sale Recording                                       │
//! │                                                                         │
//! │  record_sale(input)                                                     │
//! │       │                                                                 │
//! │       ├── require(can_sales)                                            │
//! │       ├── prepare_sale: quantity > 0, unit price > 0, payment mode,    │
//! │       │                 paid >= 0                                       │
//! │       │                 total   = quantity × unit price                 │
//! │       │                 balance = max(total − paid, 0)                  │
//! │       ├── product exists?                                               │
//! │       ├── sales.record()  ── one transaction ──┐                        │
//! │       │                                        ├── INSERT sales         │
//! │       │                                        └── INSERT movements     │
//! │       │                                             (SORTIE)            │
//! │       └── commit → snapshot slot                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use serde::Serialize;
use std::fmt::Write as _;
use tracing::info;

use crate::error::ApiError;
use crate::state::{ConfigState, DbState, SessionState};
use stock_core::ledger::prepare_sale;
use stock_core::{Capability, Sale, SaleInput, UNKNOWN_CLIENT};

/// Printable view of one sale.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub number: String,
    pub store_name: String,
    pub date: NaiveDate,
    pub client_name: String,
    pub client_phone: Option<String>,
    pub product: String,
    pub quantity: i64,
    pub unit_price: String,
    pub total: String,
    pub paid: String,
    pub balance: String,
    pub payment_mode: String,
    pub comment: Option<String>,
}

impl Invoice {
    pub fn from_sale(sale: &Sale, config: &ConfigState) -> Self {
        let product = match (&sale.product_code, &sale.product_name) {
            (Some(code), Some(name)) => format!("{} - {}", code, name),
            _ => format!("Product #{}", sale.product_id),
        };

        Invoice {
            number: format!("INV-{:06}", sale.id),
            store_name: config.store_name.clone(),
            date: sale.date,
            client_name: sale
                .client_name
                .clone()
                .unwrap_or_else(|| UNKNOWN_CLIENT.to_string()),
            client_phone: sale.client_phone.clone(),
            product,
            quantity: sale.quantity,
            unit_price: config.format_currency(sale.unit_price_cents),
            total: config.format_currency(sale.total_cents),
            paid: config.format_currency(sale.paid_amount_cents),
            balance: config.format_currency(sale.balance_cents),
            payment_mode: sale.payment_mode.label().to_string(),
            comment: sale.comment.clone(),
        }
    }

    /// Plain-text rendering for the terminal or a receipt printer.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let rule = "-".repeat(44);

        let _ = writeln!(out, "{}", self.store_name);
        let _ = writeln!(out, "Invoice {}    {}", self.number, self.date);
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "Client:  {}", self.client_name);
        if let Some(phone) = &self.client_phone {
            let _ = writeln!(out, "Phone:   {}", phone);
        }
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "{}", self.product);
        let _ = writeln!(out, "  {} x {}", self.quantity, self.unit_price);
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "Total:    {:>32}", self.total);
        let _ = writeln!(out, "Paid:     {:>32}", self.paid);
        let _ = writeln!(out, "Balance:  {:>32}", self.balance);
        let _ = writeln!(out, "Payment:  {}", self.payment_mode);
        if let Some(comment) = &self.comment {
            let _ = writeln!(out, "Note:     {}", comment);
        }
        out
    }
}

/// Full history, newest first.
pub async fn list_sales(db: &DbState, session: &SessionState) -> Result<Vec<Sale>, ApiError> {
    session.require(Capability::Sales).await?;
    Ok(db.inner().sales().list().await?)
}

/// Records a sale and its outbound movement atomically.
///
/// ## Errors
/// - `VALIDATION_ERROR` for a missing or unknown product, a non-positive
///   quantity or unit price, a missing payment mode or a negative payment
pub async fn record_sale(db: &DbState, session: &SessionState, input: SaleInput) -> Result<Sale, ApiError> {
    let identity = session.require(Capability::Sales).await?;
    let sale = prepare_sale(&input)?;

    if !db.inner().products().exists(sale.product_id).await? {
        return Err(ApiError::validation(format!(
            "product {} does not exist",
            sale.product_id
        )));
    }

    let (stored, movement_id) = db.inner().sales().record(&sale, identity.user.id).await?;
    db.commit().await?;

    info!(
        sale_id = stored.id,
        movement_id,
        product_id = stored.product_id,
        quantity = stored.quantity,
        total = stored.total_cents,
        balance = stored.balance_cents,
        "Sale recorded"
    );
    Ok(stored)
}

/// Invoice for one sale.
pub async fn invoice(
    db: &DbState,
    session: &SessionState,
    config: &ConfigState,
    sale_id: i64,
) -> Result<Invoice, ApiError> {
    session.require(Capability::Invoices).await?;

    let sale = db
        .inner()
        .sales()
        .get_by_id(sale_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Sale", sale_id))?;

    Ok(Invoice::from_sale(&sale, config))
}

// =============================================================================
// Unit Tests
// =============================================================================
