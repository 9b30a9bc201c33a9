//! # Ledger Module
//!
//! Stock derivation and sale arithmetic.
//!
//! ## Stock Is Derived
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  current_stock(p) = p.initial_stock                                    │
//! │                   + Σ quantity of ENTREE movements for p               │
//! │                   − Σ quantity of SORTIE movements for p               │
//! │                                                                         │
//! │  products ──┐                                                           │
//! │             ├──► compute_stock() ──► BTreeMap<product id, stock>       │
//! │  movements ─┘         (fold, any order)                                 │
//! │                                                                         │
//! │  • Recomputed from the full history on every read                      │
//! │  • Movements for unknown product ids are skipped                       │
//! │  • Nothing here is ever written back to the store                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Movement, MovementKind, NewSale, Product, SaleInput, StockLevel};
use crate::validation::{
    normalize_optional, validate_payment_mode, validate_product_ref, validate_quantity,
};
use crate::ValidationError;

// =============================================================================
// Stock Derivation
// =============================================================================

/// Folds the movement history into the current stock of every product.
///
/// Each product starts at its `initial_stock`. `ENTREE` adds, `SORTIE`
/// subtracts. Movements referencing a product that is not in `products`
/// are ignored rather than failing the computation.
///
/// ## Example
/// ```rust
/// # use stock_core::ledger::compute_stock;
/// # use stock_core::types::Product;
/// let products: Vec<Product> = Vec::new();
/// assert!(compute_stock(&products, &[]).is_empty());
/// ```
pub fn compute_stock(products: &[Product], movements: &[Movement]) -> BTreeMap<i64, i64> {
    let mut stock: BTreeMap<i64, i64> = products
        .iter()
        .map(|p| (p.id, p.initial_stock))
        .collect();

    for movement in movements {
        if let Some(current) = stock.get_mut(&movement.product_id) {
            *current = current.saturating_add(movement.kind.signed(movement.quantity));
        }
    }

    stock
}

/// Low stock is inclusive: a product sitting exactly at its threshold is low.
#[inline]
pub fn is_low_stock(current_stock: i64, min_stock: i64) -> bool {
    current_stock <= min_stock
}

/// Per-product stock view: baseline, entries, exits, current, low flag.
///
/// Rows follow the order of `products`.
pub fn stock_levels(products: &[Product], movements: &[Movement]) -> Vec<StockLevel> {
    let mut flows: BTreeMap<i64, (i64, i64)> = products.iter().map(|p| (p.id, (0, 0))).collect();

    for movement in movements {
        if let Some((entries, exits)) = flows.get_mut(&movement.product_id) {
            match movement.kind {
                MovementKind::Entree => *entries = entries.saturating_add(movement.quantity),
                MovementKind::Sortie => *exits = exits.saturating_add(movement.quantity),
            }
        }
    }

    products
        .iter()
        .map(|p| {
            let (total_entries, total_exits) = flows.get(&p.id).copied().unwrap_or((0, 0));
            let current_stock = p
                .initial_stock
                .saturating_add(total_entries)
                .saturating_sub(total_exits);
            StockLevel {
                product_id: p.id,
                code: p.code.clone(),
                name: p.name.clone(),
                initial_stock: p.initial_stock,
                total_entries,
                total_exits,
                current_stock,
                min_stock: p.min_stock,
                is_low_stock: is_low_stock(current_stock, p.min_stock),
            }
        })
        .collect()
}

/// Products with current stock above zero, paired with that stock.
///
/// This is the storefront view: what can actually be handed to a customer.
pub fn available_products<'a>(
    products: &'a [Product],
    movements: &[Movement],
) -> Vec<(&'a Product, i64)> {
    let stock = compute_stock(products, movements);
    products
        .iter()
        .filter_map(|p| {
            let current = stock.get(&p.id).copied().unwrap_or(p.initial_stock);
            (current > 0).then_some((p, current))
        })
        .collect()
}

/// Case-insensitive substring filter over code, name and category.
/// An empty query keeps everything.
pub fn search_products<'a>(products: &'a [Product], query: &str) -> Vec<&'a Product> {
    let needle = query.trim().to_lowercase();
    if needle.is_empty() {
        return products.iter().collect();
    }

    products
        .iter()
        .filter(|p| {
            p.code.to_lowercase().contains(&needle)
                || p.name.to_lowercase().contains(&needle)
                || p
                    .category
                    .as_deref()
                    .is_some_and(|c| c.to_lowercase().contains(&needle))
        })
        .collect()
}

// =============================================================================
// Sale Arithmetic
// =============================================================================

/// Total and outstanding balance of a sale line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaleTotals {
    pub total_cents: i64,
    pub balance_cents: i64,
}

impl SaleTotals {
    /// `total = quantity × unit_price`, `balance = max(total − paid, 0)`.
    ///
    /// Overpayment leaves a zero balance, never a credit.
    pub fn compute(quantity: i64, unit_price_cents: i64, paid_amount_cents: i64) -> CoreResult<Self> {
        let total = Money::from_cents(unit_price_cents)
            .checked_mul_quantity(quantity)
            .ok_or_else(|| CoreError::AmountOverflow {
                what: "sale total".to_string(),
            })?;

        let balance = total.saturating_sub_floor_zero(Money::from_cents(paid_amount_cents));

        Ok(SaleTotals {
            total_cents: total.cents(),
            balance_cents: balance.cents(),
        })
    }
}

/// Validates a sale input and computes its totals.
///
/// ## Rules
/// - Product reference present
/// - Quantity > 0
/// - Unit price > 0
/// - Payment mode present
/// - Paid amount >= 0
///
/// Caller-supplied totals do not exist on [`SaleInput`]; the stored total and
/// balance always come from [`SaleTotals::compute`].
pub fn prepare_sale(input: &SaleInput) -> CoreResult<NewSale> {
    let product_id = validate_product_ref(input.product_id)?;
    validate_quantity(input.quantity)?;
    if input.unit_price_cents <= 0 {
        return Err(ValidationError::must_be_positive("unit price").into());
    }
    let payment_mode = validate_payment_mode(input.payment_mode)?;
    if input.paid_amount_cents < 0 {
        return Err(ValidationError::negative("paid amount").into());
    }

    let totals = SaleTotals::compute(input.quantity, input.unit_price_cents, input.paid_amount_cents)?;

    Ok(NewSale {
        date: input.date,
        product_id,
        quantity: input.quantity,
        unit_price_cents: input.unit_price_cents,
        total_cents: totals.total_cents,
        payment_mode,
        client_name: normalize_optional(input.client_name.as_deref()),
        client_phone: normalize_optional(input.client_phone.as_deref()),
        paid_amount_cents: input.paid_amount_cents,
        balance_cents: totals.balance_cents,
        comment: normalize_optional(input.comment.as_deref()),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::types::PaymentMode;
    use chrono::NaiveDate;

    pub(crate) fn product(id: i64, initial_stock: i64, min_stock: i64) -> Product {
        Product {
            id,
            code: format!("P{id}"),
            name: format!("Product {id}"),
            category: None,
            initial_stock,
            min_stock,
            unit_price_cents: 100,
            purchase_price_cents: 80,
            reseller_price_cents: 90,
            image_path: None,
            created_by: Some(1),
            creator_email: None,
        }
    }

    pub(crate) fn movement(id: i64, product_id: i64, kind: MovementKind, quantity: i64) -> Movement {
        Movement {
            id,
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(id as u64),
            kind,
            product_id,
            quantity,
            unit_price_cents: None,
            client_name: None,
            client_phone: None,
            comment: None,
            created_by: Some(1),
            product_code: None,
            product_name: None,
            creator_email: None,
        }
    }

    #[test]
    fn test_compute_stock_invariant() {
        let products = vec![product(1, 10, 0), product(2, 0, 0)];
        let movements = vec![
            movement(1, 1, MovementKind::Entree, 5),
            movement(2, 1, MovementKind::Sortie, 3),
            movement(3, 2, MovementKind::Entree, 7),
            movement(4, 1, MovementKind::Sortie, 2),
        ];

        let stock = compute_stock(&products, &movements);
        assert_eq!(stock[&1], 10 + 5 - 3 - 2);
        assert_eq!(stock[&2], 7);
    }

    #[test]
    fn test_compute_stock_order_independent() {
        let products = vec![product(1, 4, 0), product(2, 9, 0)];
        let mut movements = vec![
            movement(1, 1, MovementKind::Entree, 5),
            movement(2, 2, MovementKind::Sortie, 3),
            movement(3, 1, MovementKind::Sortie, 8),
            movement(4, 2, MovementKind::Entree, 1),
            movement(5, 1, MovementKind::Entree, 2),
        ];

        let forward = compute_stock(&products, &movements);
        movements.reverse();
        let reversed = compute_stock(&products, &movements);
        movements.rotate_left(2);
        let rotated = compute_stock(&products, &movements);

        assert_eq!(forward, reversed);
        assert_eq!(forward, rotated);
        assert_eq!(forward[&1], 3);
        assert_eq!(forward[&2], 7);
    }

    #[test]
    fn test_compute_stock_ignores_unknown_products() {
        let products = vec![product(1, 2, 0)];
        let movements = vec![
            movement(1, 99, MovementKind::Sortie, 50),
            movement(2, 1, MovementKind::Entree, 1),
        ];

        let stock = compute_stock(&products, &movements);
        assert_eq!(stock.len(), 1);
        assert_eq!(stock[&1], 3);
    }

    #[test]
    fn test_compute_stock_can_go_negative() {
        let products = vec![product(1, 1, 0)];
        let movements = vec![movement(1, 1, MovementKind::Sortie, 4)];
        assert_eq!(compute_stock(&products, &movements)[&1], -3);
    }

    #[test]
    fn test_low_stock_boundary_inclusive() {
        assert!(is_low_stock(5, 5));
        assert!(is_low_stock(4, 5));
        assert!(!is_low_stock(6, 5));

        let products = vec![product(1, 5, 5), product(2, 6, 5)];
        let levels = stock_levels(&products, &[]);
        assert!(levels[0].is_low_stock);
        assert!(!levels[1].is_low_stock);
    }

    #[test]
    fn test_stock_levels_totals() {
        let products = vec![product(1, 10, 3)];
        let movements = vec![
            movement(1, 1, MovementKind::Entree, 4),
            movement(2, 1, MovementKind::Sortie, 6),
            movement(3, 1, MovementKind::Sortie, 5),
        ];

        let level = &stock_levels(&products, &movements)[0];
        assert_eq!(level.total_entries, 4);
        assert_eq!(level.total_exits, 11);
        assert_eq!(level.current_stock, 3);
        assert!(level.is_low_stock);
    }

    #[test]
    fn test_stock_saturates_instead_of_overflowing() {
        let products = vec![product(1, i64::MAX, 0), product(2, i64::MIN + 1, 0)];
        let movements = vec![
            movement(1, 1, MovementKind::Entree, 1),
            movement(2, 2, MovementKind::Sortie, 5),
            movement(3, 1, MovementKind::Entree, i64::MAX),
        ];

        let stock = compute_stock(&products, &movements);
        assert_eq!(stock[&1], i64::MAX);
        assert_eq!(stock[&2], i64::MIN);

        let levels = stock_levels(&products, &movements);
        assert_eq!(levels[0].current_stock, i64::MAX);
        assert_eq!(levels[0].total_entries, i64::MAX);
        assert_eq!(levels[1].current_stock, i64::MIN);
    }

    #[test]
    fn test_available_products_excludes_empty() {
        let products = vec![product(1, 0, 0), product(2, 3, 0), product(3, 2, 0)];
        let movements = vec![movement(1, 3, MovementKind::Sortie, 2)];

        let available = available_products(&products, &movements);
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].0.id, 2);
        assert_eq!(available[0].1, 3);
    }

    #[test]
    fn test_search_products() {
        let mut rice = product(1, 0, 0);
        rice.name = "Riz parfumé".into();
        rice.category = Some("Cereals".into());
        let mut oil = product(2, 0, 0);
        oil.code = "HUILE-1L".into();
        let products = vec![rice, oil];

        assert_eq!(search_products(&products, "").len(), 2);
        assert_eq!(search_products(&products, "RIZ")[0].id, 1);
        assert_eq!(search_products(&products, "cereal")[0].id, 1);
        assert_eq!(search_products(&products, "huile")[0].id, 2);
        assert!(search_products(&products, "sugar").is_empty());
    }

    #[test]
    fn test_sale_totals() {
        let partial = SaleTotals::compute(2, 500, 600).unwrap();
        assert_eq!(partial.total_cents, 1000);
        assert_eq!(partial.balance_cents, 400);

        let exact = SaleTotals::compute(2, 500, 1000).unwrap();
        assert_eq!(exact.balance_cents, 0);

        let overpaid = SaleTotals::compute(2, 500, 5000).unwrap();
        assert_eq!(overpaid.balance_cents, 0);

        let unpaid = SaleTotals::compute(3, 700, 0).unwrap();
        assert_eq!(unpaid.total_cents, 2100);
        assert_eq!(unpaid.balance_cents, 2100);
    }

    #[test]
    fn test_sale_totals_property_grid() {
        for quantity in 1..=6 {
            for unit in [1, 99, 250, 10_000] {
                for paid in [0, 1, 500, 60_000] {
                    let t = SaleTotals::compute(quantity, unit, paid).unwrap();
                    assert_eq!(t.total_cents, quantity * unit);
                    assert_eq!(t.balance_cents, (quantity * unit - paid).max(0));
                }
            }
        }
    }

    #[test]
    fn test_sale_totals_overflow() {
        assert!(matches!(
            SaleTotals::compute(i64::MAX, 2, 0),
            Err(CoreError::AmountOverflow { .. })
        ));
    }

    fn sale_input() -> SaleInput {
        SaleInput {
            date: NaiveDate::from_ymd_opt(2024, 5, 2).unwrap(),
            product_id: Some(1),
            quantity: 2,
            unit_price_cents: 500,
            payment_mode: Some(PaymentMode::Cash),
            client_name: Some(" A ".into()),
            client_phone: Some("".into()),
            paid_amount_cents: 600,
            comment: None,
        }
    }

    #[test]
    fn test_prepare_sale() {
        let sale = prepare_sale(&sale_input()).unwrap();
        assert_eq!(sale.total_cents, 1000);
        assert_eq!(sale.balance_cents, 400);
        assert_eq!(sale.client_name.as_deref(), Some("A"));
        assert_eq!(sale.client_phone, None);

        let movement = sale.outbound_movement();
        assert_eq!(movement.kind, MovementKind::Sortie);
        assert_eq!(movement.quantity, 2);
        assert_eq!(movement.unit_price_cents, Some(500));
        assert_eq!(movement.client_name.as_deref(), Some("A"));
    }

    #[test]
    fn test_prepare_sale_rejects() {
        let cases = [
            SaleInput {
                product_id: None,
                ..sale_input()
            },
            SaleInput {
                quantity: 0,
                ..sale_input()
            },
            SaleInput {
                unit_price_cents: 0,
                ..sale_input()
            },
            SaleInput {
                payment_mode: None,
                ..sale_input()
            },
            SaleInput {
                paid_amount_cents: -1,
                ..sale_input()
            },
        ];

        for input in cases {
            assert!(matches!(prepare_sale(&input), Err(CoreError::Validation(_))));
        }
    }
}
