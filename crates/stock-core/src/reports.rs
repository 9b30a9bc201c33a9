//! # Reports Module
//!
//! Read-only roll-ups over the ledger. Every function here takes the full
//! history and recomputes from scratch; nothing is cached.
//!
//! ```text
//! products + movements + expenses ──► compute_dashboard()
//!                                        ├── total stock value
//!                                        ├── low stock count
//!                                        ├── per-category buckets
//!                                        └── total expenses
//!
//! sales ──► compute_debtors()      (balance > 0, grouped by client)
//! products + sales ──► compute_sales_summary()
//! ```

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::ledger::{compute_stock, is_low_stock};
use crate::types::{
    CategoryStats, Dashboard, Debtor, Expense, Movement, Product, Sale, SalesSummary,
};
use crate::{UNCATEGORIZED, UNKNOWN_CLIENT};

// =============================================================================
// Dashboard
// =============================================================================

/// Stock value, low-stock count, category buckets and expense total.
///
/// - stock value of a product = current stock × unit price
/// - low stock is `current <= min_stock`
/// - a blank or missing category falls into [`UNCATEGORIZED`]
///
/// Buckets are ordered by category name.
pub fn compute_dashboard(
    products: &[Product],
    movements: &[Movement],
    expenses: &[Expense],
) -> Dashboard {
    let stock = compute_stock(products, movements);

    let mut total_stock_value_cents = 0_i64;
    let mut low_stock_count = 0_i64;
    let mut buckets: BTreeMap<String, (i64, i64)> = BTreeMap::new();

    for product in products {
        let current = stock.get(&product.id).copied().unwrap_or(product.initial_stock);
        let value = current.saturating_mul(product.unit_price_cents);
        total_stock_value_cents = total_stock_value_cents.saturating_add(value);

        if is_low_stock(current, product.min_stock) {
            low_stock_count += 1;
        }

        let category = product.category_label().unwrap_or(UNCATEGORIZED).to_string();
        let bucket = buckets.entry(category).or_insert((0, 0));
        bucket.0 += 1;
        bucket.1 = bucket.1.saturating_add(value);
    }

    let per_category = buckets
        .into_iter()
        .map(|(category, (product_count, stock_value_cents))| CategoryStats {
            category,
            product_count,
            stock_value_cents,
        })
        .collect();

    let total_expenses_cents = expenses
        .iter()
        .fold(0_i64, |acc, e| acc.saturating_add(e.amount_cents));

    Dashboard {
        total_stock_value_cents,
        low_stock_count,
        per_category,
        total_expenses_cents,
    }
}

// =============================================================================
// Debtors
// =============================================================================

struct DebtorAcc {
    first_date: NaiveDate,
    last_date: NaiveDate,
    total_due_cents: i64,
    total_balance_cents: i64,
    sale_count: i64,
}

/// Groups sales with an outstanding balance by client.
///
/// ## Grouping Key
/// `(client name or UNKNOWN_CLIENT, client phone or "")`. Two sales from the
/// same name with different phones are different debtors.
///
/// ## Ordering
/// Summed balance descending. Ties keep group-key order.
///
/// ```text
/// sale A  total 1000  paid 600  ─┐
/// sale B  total  500  paid 300  ─┼─► [ A: 400 (1 sale), B: 200 (1 sale) ]
/// sale C  total  200  paid 200  ─┘     C settled, not a debtor
/// ```
pub fn compute_debtors(sales: &[Sale]) -> Vec<Debtor> {
    let mut groups: BTreeMap<(String, String), DebtorAcc> = BTreeMap::new();

    for sale in sales.iter().filter(|s| s.balance_cents > 0) {
        let name = sale
            .client_name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .unwrap_or(UNKNOWN_CLIENT)
            .to_string();
        let phone = sale
            .client_phone
            .as_deref()
            .map(str::trim)
            .unwrap_or("")
            .to_string();

        groups
            .entry((name, phone))
            .and_modify(|acc| {
                acc.first_date = acc.first_date.min(sale.date);
                acc.last_date = acc.last_date.max(sale.date);
                acc.total_due_cents = acc.total_due_cents.saturating_add(sale.total_cents);
                acc.total_balance_cents = acc.total_balance_cents.saturating_add(sale.balance_cents);
                acc.sale_count += 1;
            })
            .or_insert(DebtorAcc {
                first_date: sale.date,
                last_date: sale.date,
                total_due_cents: sale.total_cents,
                total_balance_cents: sale.balance_cents,
                sale_count: 1,
            });
    }

    let mut debtors: Vec<Debtor> = groups
        .into_iter()
        .map(|((client_name, client_phone), acc)| Debtor {
            client_name,
            client_phone,
            first_date: acc.first_date,
            last_date: acc.last_date,
            total_due_cents: acc.total_due_cents,
            total_balance_cents: acc.total_balance_cents,
            sale_count: acc.sale_count,
        })
        .collect();

    // sort_by is stable: equal balances stay in key order
    debtors.sort_by(|a, b| b.total_balance_cents.cmp(&a.total_balance_cents));
    debtors
}

// =============================================================================
// Sales Summary
// =============================================================================

/// Product count, sale count, revenue and outstanding debt.
pub fn compute_sales_summary(products: &[Product], sales: &[Sale]) -> SalesSummary {
    let revenue_cents = sales
        .iter()
        .fold(0_i64, |acc, s| acc.saturating_add(s.total_cents));
    let total_debt_cents = sales
        .iter()
        .fold(0_i64, |acc, s| acc.saturating_add(s.balance_cents));

    SalesSummary {
        total_products: products.len() as i64,
        sales_count: sales.len() as i64,
        revenue_cents,
        total_debt_cents,
        debtor_count: compute_debtors(sales).len() as i64,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
