//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Integer Minor Units
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Every amount in the ledger is an i64 count of minor units.            │
//! │                                                                         │
//! │  Currency         decimals    1 major unit                              │
//! │  ─────────────    ────────    ─────────────                             │
//! │  FCFA (XOF/XAF)   0           1                                         │
//! │  EUR / USD        2           100                                       │
//! │                                                                         │
//! │  The ledger never divides, so no rounding ever happens:                │
//! │    total   = quantity × unit_price                                     │
//! │    balance = max(total − paid, 0)                                       │
//! │                                                                         │
//! │  Decimals only matter when an amount is rendered for a human.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use stock_core::money::Money;
//!
//! let price = Money::from_cents(2500);
//! let total = price.checked_mul_quantity(4).unwrap();
//! assert_eq!(total.cents(), 10_000);
//! assert_eq!(total.format(0, "FCFA"), "10 000 FCFA");
//! assert_eq!(total.format(2, "€"), "100.00 €");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit.
///
/// The field is named "cents" throughout the codebase even for currencies
/// without a fractional unit; for FCFA one "cent" is one franc.
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Product.unit_price_cents ──► Sale.unit_price ──► Sale.total            │
/// │                                                     │                   │
/// │                          Sale.paid_amount ──────────┴──► Sale.balance   │
/// │                                                              │          │
/// │                                              Debtor.total_balance       │
/// │                                                                         │
/// │  Product.purchase_price × current stock ──► Dashboard stock value      │
/// │  Expense.amount ──────────────────────────► Dashboard total expenses   │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from minor units.
    ///
    /// ## Example
    /// ```rust
    /// use stock_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in minor units.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies by a quantity, returning `None` on overflow.
    ///
    /// ## Example
    /// ```rust
    /// use stock_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(299).checked_mul_quantity(3), Some(Money::from_cents(897)));
    /// assert_eq!(Money::from_cents(i64::MAX).checked_mul_quantity(2), None);
    /// ```
    #[inline]
    pub const fn checked_mul_quantity(&self, qty: i64) -> Option<Self> {
        match self.0.checked_mul(qty) {
            Some(v) => Some(Money(v)),
            None => None,
        }
    }

    /// Subtracts `other`, clamping the result at zero.
    ///
    /// Used for the outstanding balance of a sale: overpayment never turns
    /// into a negative debt.
    #[inline]
    pub fn saturating_sub_floor_zero(self, other: Money) -> Money {
        Money(self.0.saturating_sub(other.0).max(0))
    }

    /// Renders the amount with a currency symbol and a fixed number of
    /// decimals, grouping thousands with a space.
    ///
    /// ```rust
    /// use stock_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(1_250_000).format(0, "FCFA"), "1 250 000 FCFA");
    /// assert_eq!(Money::from_cents(-550).format(2, "$"), "-5.50 $");
    /// ```
    pub fn format(&self, decimals: u32, symbol: &str) -> String {
        // 10^19 overflows u64.
        let decimals = decimals.min(18);
        let divisor = 10_u64.pow(decimals);
        let abs = self.0.unsigned_abs();
        let major = abs / divisor;
        let minor = abs % divisor;

        let digits = major.to_string();
        let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
        for (i, ch) in digits.chars().enumerate() {
            if i > 0 && (digits.len() - i) % 3 == 0 {
                grouped.push(' ');
            }
            grouped.push(ch);
        }

        let sign = if self.0 < 0 { "-" } else { "" };
        let number = if decimals == 0 {
            format!("{sign}{grouped}")
        } else {
            format!("{sign}{grouped}.{minor:0width$}", width = decimals as usize)
        };

        if symbol.is_empty() {
            number
        } else {
            format!("{number} {symbol}")
        }
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display shows the raw minor-unit count. Use [`Money::format`] for
/// anything a person reads.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl From<i64> for Money {
    fn from(cents: i64) -> Self {
        Money(cents)
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

/// Multiplication by a quantity.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
