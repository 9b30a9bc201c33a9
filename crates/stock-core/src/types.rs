//! # Domain Types
//!
//! Core domain types used throughout Stockbook.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      User       │   │    Product      │   │    Movement     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id             │   │  date           │       │
//! │  │  email (unique) │   │  code (unique)  │   │  kind           │       │
//! │  │  role           │   │  initial_stock  │   │  product_id     │       │
//! │  │  Permissions    │   │  min_stock      │   │  quantity > 0   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Sale       │   │    Expense      │   │  Debtor (view)  │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  total          │   │  description    │   │  client name    │       │
//! │  │  paid_amount    │   │  amount         │   │  client phone   │       │
//! │  │  balance        │   │  payment_mode   │   │  Σ balance      │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Read Models vs Inputs
//! Every ledger entity comes in two shapes:
//! - the read model (`Product`, `Movement`, ...) as returned by list queries,
//!   enriched with joined display fields such as the creator's email
//! - the input (`ProductInput`, `MovementInput`, ...) as supplied by a caller,
//!   validated by [`crate::validation`] before any write
//!
//! Movements and sales are append-only. There is no update input for them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Role & Capabilities
// =============================================================================

/// Account role. `Admin` stacks on top of capabilities for destructive and
/// administrative operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    User,
}

impl Default for Role {
    fn default() -> Self {
        Role::User
    }
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

/// A named capability checked by the command layer before any read or write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    Stock,
    Movements,
    Expenses,
    Dashboard,
    Sales,
    Debtors,
    Invoices,
}

impl Capability {
    pub const ALL: [Capability; 7] = [
        Capability::Stock,
        Capability::Movements,
        Capability::Expenses,
        Capability::Dashboard,
        Capability::Sales,
        Capability::Debtors,
        Capability::Invoices,
    ];

    /// Column name of the flag in `user_permissions`.
    pub fn column(&self) -> &'static str {
        match self {
            Capability::Stock => "can_stock",
            Capability::Movements => "can_movements",
            Capability::Expenses => "can_expenses",
            Capability::Dashboard => "can_dashboard",
            Capability::Sales => "can_sales",
            Capability::Debtors => "can_debtors",
            Capability::Invoices => "can_invoices",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

/// Flat capability flags, one record per user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Permissions {
    pub can_stock: bool,
    pub can_movements: bool,
    pub can_expenses: bool,
    pub can_dashboard: bool,
    pub can_sales: bool,
    pub can_debtors: bool,
    pub can_invoices: bool,
}

impl Permissions {
    /// Every capability granted. Used for the bootstrap administrator and
    /// for freshly registered accounts.
    pub const fn all_granted() -> Self {
        Permissions {
            can_stock: true,
            can_movements: true,
            can_expenses: true,
            can_dashboard: true,
            can_sales: true,
            can_debtors: true,
            can_invoices: true,
        }
    }

    /// Nothing granted.
    pub const fn none() -> Self {
        Permissions {
            can_stock: false,
            can_movements: false,
            can_expenses: false,
            can_dashboard: false,
            can_sales: false,
            can_debtors: false,
            can_invoices: false,
        }
    }

    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::Stock => self.can_stock,
            Capability::Movements => self.can_movements,
            Capability::Expenses => self.can_expenses,
            Capability::Dashboard => self.can_dashboard,
            Capability::Sales => self.can_sales,
            Capability::Debtors => self.can_debtors,
            Capability::Invoices => self.can_invoices,
        }
    }

    /// Returns a copy with one flag changed.
    pub fn with(mut self, capability: Capability, granted: bool) -> Self {
        let flag = match capability {
            Capability::Stock => &mut self.can_stock,
            Capability::Movements => &mut self.can_movements,
            Capability::Expenses => &mut self.can_expenses,
            Capability::Dashboard => &mut self.can_dashboard,
            Capability::Sales => &mut self.can_sales,
            Capability::Debtors => &mut self.can_debtors,
            Capability::Invoices => &mut self.can_invoices,
        };
        *flag = granted;
        self
    }

    /// Capabilities currently granted, in declaration order.
    pub fn granted(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|c| self.allows(*c))
            .collect()
    }
}

// =============================================================================
// User & Identity
// =============================================================================

/// A user account as seen outside the database layer. The password hash
/// never appears here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub role: Role,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl User {
    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// An authenticated user together with their capability flags.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Identity {
    pub user: User,
    pub permissions: Permissions,
}

impl Identity {
    pub fn can(&self, capability: Capability) -> bool {
        self.permissions.allows(capability)
    }

    pub fn is_admin(&self) -> bool {
        self.user.is_admin()
    }
}

/// A user row with its permissions, for the administration listing.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct UserAccount {
    pub user: User,
    /// `None` when the permission row is missing (inconsistent account).
    pub permissions: Option<Permissions>,
}

// =============================================================================
// Product
// =============================================================================

/// A catalog product (read model).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: i64,

    /// Unique human-facing code.
    pub code: String,

    pub name: String,

    pub category: Option<String>,

    /// Baseline quantity before any movement.
    pub initial_stock: i64,

    /// Alert threshold. Stock at or below it counts as low.
    pub min_stock: i64,

    /// Reference selling price.
    pub unit_price_cents: i64,

    pub purchase_price_cents: i64,

    pub reseller_price_cents: i64,

    pub image_path: Option<String>,

    pub created_by: Option<i64>,

    /// Joined at read time.
    pub creator_email: Option<String>,
}

impl Product {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// Category with the empty string treated as absent.
    pub fn category_label(&self) -> Option<&str> {
        self.category
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
    }
}

/// Caller-supplied product fields for create and update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductInput {
    pub code: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub initial_stock: i64,
    #[serde(default)]
    pub min_stock: i64,
    #[serde(default)]
    pub unit_price_cents: i64,
    #[serde(default)]
    pub purchase_price_cents: i64,
    #[serde(default)]
    pub reseller_price_cents: i64,
    #[serde(default)]
    pub image_path: Option<String>,
}

// =============================================================================
// Movement
// =============================================================================

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementKind {
    /// Inbound.
    Entree,
    /// Outbound.
    Sortie,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Entree => "ENTREE",
            MovementKind::Sortie => "SORTIE",
        }
    }

    /// Signed effect of `quantity` on stock.
    #[inline]
    pub fn signed(&self, quantity: i64) -> i64 {
        match self {
            MovementKind::Entree => quantity,
            MovementKind::Sortie => quantity.saturating_neg(),
        }
    }
}

impl fmt::Display for MovementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An immutable stock ledger entry (read model).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Movement {
    pub id: i64,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub kind: MovementKind,
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price_cents: Option<i64>,
    pub client_name: Option<String>,
    pub client_phone: Option<String>,
    pub comment: Option<String>,
    pub created_by: Option<i64>,

    /// Joined at read time. `None` when the product was deleted.
    pub product_code: Option<String>,
    pub product_name: Option<String>,
    pub creator_email: Option<String>,
}

/// Caller-supplied movement fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MovementInput {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub kind: MovementKind,
    pub product_id: Option<i64>,
    pub quantity: i64,
    #[serde(default)]
    pub unit_price_cents: Option<i64>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub client_phone: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

// =============================================================================
// Payment Mode
// =============================================================================

/// How a sale or an expense was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum PaymentMode {
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Chèque"))]
    #[serde(rename = "Chèque")]
    Cheque,
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Virement bancaire"))]
    #[serde(rename = "Virement bancaire")]
    BankTransfer,
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Cash"))]
    #[serde(rename = "Cash")]
    Cash,
    #[cfg_attr(feature = "sqlx", sqlx(rename = "Mobile money"))]
    #[serde(rename = "Mobile money")]
    MobileMoney,
}

impl PaymentMode {
    pub const ALL: [PaymentMode; 4] = [
        PaymentMode::Cheque,
        PaymentMode::BankTransfer,
        PaymentMode::Cash,
        PaymentMode::MobileMoney,
    ];

    /// Stored label.
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMode::Cheque => "Chèque",
            PaymentMode::BankTransfer => "Virement bancaire",
            PaymentMode::Cash => "Cash",
            PaymentMode::MobileMoney => "Mobile money",
        }
    }

    /// Parses a stored label or a loose spelling (`cheque`, `transfer`,
    /// `mobile-money`, ...). Case-insensitive.
    pub fn parse(input: &str) -> Option<Self> {
        let normalized = input.trim().to_lowercase().replace(['-', '_'], " ");
        match normalized.as_str() {
            "chèque" | "cheque" | "check" => Some(PaymentMode::Cheque),
            "virement bancaire" | "virement" | "bank transfer" | "transfer" => {
                Some(PaymentMode::BankTransfer)
            }
            "cash" | "espèces" | "especes" => Some(PaymentMode::Cash),
            "mobile money" | "mobile" | "momo" => Some(PaymentMode::MobileMoney),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Sale
// =============================================================================

/// An immutable sales ledger entry (read model).
///
/// `total_cents` and `balance_cents` are computed when the sale is recorded
/// and stored with it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: i64,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub total_cents: i64,
    pub payment_mode: PaymentMode,
    pub client_name: Option<String>,
    pub client_phone: Option<String>,
    pub paid_amount_cents: i64,
    pub balance_cents: i64,
    pub comment: Option<String>,
    pub created_by: Option<i64>,

    pub product_code: Option<String>,
    pub product_name: Option<String>,
    pub creator_email: Option<String>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.balance_cents)
    }
}

/// Caller-supplied sale fields. Totals are never accepted from the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleInput {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub product_id: Option<i64>,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub payment_mode: Option<PaymentMode>,
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub client_phone: Option<String>,
    #[serde(default)]
    pub paid_amount_cents: i64,
    #[serde(default)]
    pub comment: Option<String>,
}

// =============================================================================
// Expense
// =============================================================================

/// An expense ledger entry (read model).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Expense {
    pub id: i64,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub description: String,
    pub amount_cents: i64,
    pub payment_mode: PaymentMode,
    pub category: Option<String>,
    pub comment: Option<String>,
    pub created_by: Option<i64>,
    pub creator_email: Option<String>,
}

/// Caller-supplied expense fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ExpenseInput {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub description: String,
    pub amount_cents: i64,
    pub payment_mode: Option<PaymentMode>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

// =============================================================================
// Write Models
// =============================================================================
// Produced by validation from the caller inputs above. Optional text fields
// are trimmed and blank strings collapsed to None; required references are
// no longer optional.

/// A validated movement, ready to append.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMovement {
    pub date: NaiveDate,
    pub kind: MovementKind,
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price_cents: Option<i64>,
    pub client_name: Option<String>,
    pub client_phone: Option<String>,
    pub comment: Option<String>,
}

/// A validated sale with its computed total and balance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSale {
    pub date: NaiveDate,
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub total_cents: i64,
    pub payment_mode: PaymentMode,
    pub client_name: Option<String>,
    pub client_phone: Option<String>,
    pub paid_amount_cents: i64,
    pub balance_cents: i64,
    pub comment: Option<String>,
}

impl NewSale {
    /// The outbound movement written alongside the sale.
    pub fn outbound_movement(&self) -> NewMovement {
        NewMovement {
            date: self.date,
            kind: MovementKind::Sortie,
            product_id: self.product_id,
            quantity: self.quantity,
            unit_price_cents: Some(self.unit_price_cents),
            client_name: self.client_name.clone(),
            client_phone: self.client_phone.clone(),
            comment: self.comment.clone(),
        }
    }
}

/// A validated expense.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExpense {
    pub date: NaiveDate,
    pub description: String,
    pub amount_cents: i64,
    pub payment_mode: PaymentMode,
    pub category: Option<String>,
    pub comment: Option<String>,
}

// =============================================================================
// Derived Views
// =============================================================================

/// Current stock of one product, folded from its full movement history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockLevel {
    pub product_id: i64,
    pub code: String,
    pub name: String,
    pub initial_stock: i64,
    pub total_entries: i64,
    pub total_exits: i64,
    pub current_stock: i64,
    pub min_stock: i64,
    pub is_low_stock: bool,
}

/// Client with an outstanding balance, grouped over sales.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Debtor {
    pub client_name: String,
    pub client_phone: String,
    #[ts(as = "String")]
    pub first_date: NaiveDate,
    #[ts(as = "String")]
    pub last_date: NaiveDate,
    pub total_due_cents: i64,
    pub total_balance_cents: i64,
    pub sale_count: i64,
}

/// One bucket of the per-category roll-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CategoryStats {
    pub category: String,
    pub product_count: i64,
    pub stock_value_cents: i64,
}

/// Stock and expense roll-up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Dashboard {
    pub total_stock_value_cents: i64,
    pub low_stock_count: i64,
    pub per_category: Vec<CategoryStats>,
    pub total_expenses_cents: i64,
}

/// Sales-side roll-up shown next to the dashboard.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SalesSummary {
    pub total_products: i64,
    pub sales_count: i64,
    pub revenue_cents: i64,
    pub total_debt_cents: i64,
    pub debtor_count: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================
