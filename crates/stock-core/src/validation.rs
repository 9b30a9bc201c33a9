//! # Validation Module
//!
//! Input validation for every ledger and account write.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Command (apps/cli)                                           │
//! │  ├── Capability gate                                                   │
//! │  └── Type validation (argument parsing / deserialization)              │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Required fields, positivity, lengths                              │
//! │  └── Normalization (trim, blank → None)                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL constraints                                              │
//! │  └── UNIQUE constraints (product code, user email)                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Existence of referenced products is checked by the command layer against
//! the store; this module only checks that a reference is present.
//!
//! ## Usage
//! ```rust
//! use stock_core::validation::{validate_product_code, validate_quantity};
//!
//! validate_product_code("RIZ-25KG").unwrap();
//! validate_quantity(5).unwrap();
//! assert!(validate_quantity(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::types::{
    ExpenseInput, MovementInput, NewExpense, NewMovement, PaymentMode, ProductInput,
};
use crate::{MAX_LINE_QUANTITY, MAX_STOCK_LEVEL, MIN_PASSWORD_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Helpers
// =============================================================================

/// Trims an optional string and collapses blank values to `None`.
///
/// ```rust
/// use stock_core::validation::normalize_optional;
///
/// assert_eq!(normalize_optional(Some("  Food ")), Some("Food".to_string()));
/// assert_eq!(normalize_optional(Some("   ")), None);
/// assert_eq!(normalize_optional(None), None);
/// ```
pub fn normalize_optional(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn required_text(value: &str, field: &str, max: usize) -> ValidationResult<String> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::required(field));
    }

    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }

    Ok(value.to_string())
}

// =============================================================================
// Product Validators
// =============================================================================

/// Validates a product code.
///
/// ## Rules
/// - Must not be empty
/// - At most 50 characters
/// - No whitespace inside the code
pub fn validate_product_code(code: &str) -> ValidationResult<String> {
    let code = required_text(code, "code", 50)?;

    if code.chars().any(char::is_whitespace) {
        return Err(ValidationError::InvalidFormat {
            field: "code".to_string(),
            reason: "must not contain spaces".to_string(),
        });
    }

    Ok(code)
}

/// Validates a product name (required, at most 200 characters).
pub fn validate_product_name(name: &str) -> ValidationResult<String> {
    required_text(name, "name", 200)
}

/// Validates a price in minor units.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Zero is allowed on catalog prices
///
/// ```rust
/// use stock_core::validation::validate_price_cents;
///
/// assert!(validate_price_cents("unit price", 0).is_ok());
/// assert!(validate_price_cents("unit price", -100).is_err());
/// ```
pub fn validate_price_cents(field: &str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::negative(field));
    }
    Ok(())
}

/// Validates an opening or threshold stock level.
///
/// ## Rules
/// - Must be non-negative (>= 0)
/// - Must not exceed MAX_STOCK_LEVEL
pub fn validate_stock_level(field: &str, level: i64) -> ValidationResult<()> {
    if level < 0 {
        return Err(ValidationError::negative(field));
    }
    if level > MAX_STOCK_LEVEL {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_STOCK_LEVEL,
        });
    }
    Ok(())
}

/// Validates every product field and returns the normalized input.
pub fn validate_product_input(input: &ProductInput) -> ValidationResult<ProductInput> {
    let code = validate_product_code(&input.code)?;
    let name = validate_product_name(&input.name)?;

    validate_stock_level("initial stock", input.initial_stock)?;
    validate_stock_level("minimum stock", input.min_stock)?;
    validate_price_cents("unit price", input.unit_price_cents)?;
    validate_price_cents("purchase price", input.purchase_price_cents)?;
    validate_price_cents("reseller price", input.reseller_price_cents)?;

    Ok(ProductInput {
        code,
        name,
        category: normalize_optional(input.category.as_deref()),
        initial_stock: input.initial_stock,
        min_stock: input.min_stock,
        unit_price_cents: input.unit_price_cents,
        purchase_price_cents: input.purchase_price_cents,
        reseller_price_cents: input.reseller_price_cents,
        image_path: normalize_optional(input.image_path.as_deref()),
    })
}

/// Validates a search query (may be empty, at most 100 characters).
pub fn validate_search_query(query: &str) -> ValidationResult<String> {
    let query = query.trim();

    if query.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: "query".to_string(),
            max: 100,
        });
    }

    Ok(query.to_string())
}

// =============================================================================
// Ledger Validators
// =============================================================================

/// Validates a line quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_LINE_QUANTITY
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::must_be_positive("quantity"));
    }

    if qty > MAX_LINE_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_LINE_QUANTITY,
        });
    }

    Ok(())
}

/// Validates that a product reference is present.
pub fn validate_product_ref(product_id: Option<i64>) -> ValidationResult<i64> {
    product_id.ok_or_else(|| ValidationError::required("product"))
}

/// Validates that a payment mode was chosen.
pub fn validate_payment_mode(mode: Option<PaymentMode>) -> ValidationResult<PaymentMode> {
    mode.ok_or_else(|| ValidationError::required("payment mode"))
}

/// Validates a movement and returns its write model.
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Movements: New entry                                                   │
/// │                                                                         │
/// │  validate_movement(input) ← THIS FUNCTION                              │
/// │       │                                                                 │
/// │       ├── no product?   → "product is required"                        │
/// │       ├── quantity <= 0 → "quantity must be positive"                  │
/// │       ├── unit price < 0 → "unit price must not be negative"           │
/// │       │                                                                 │
/// │       └── OK → product existence check → append                        │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_movement(input: &MovementInput) -> ValidationResult<NewMovement> {
    let product_id = validate_product_ref(input.product_id)?;
    validate_quantity(input.quantity)?;
    if let Some(price) = input.unit_price_cents {
        validate_price_cents("unit price", price)?;
    }

    Ok(NewMovement {
        date: input.date,
        kind: input.kind,
        product_id,
        quantity: input.quantity,
        unit_price_cents: input.unit_price_cents,
        client_name: normalize_optional(input.client_name.as_deref()),
        client_phone: normalize_optional(input.client_phone.as_deref()),
        comment: normalize_optional(input.comment.as_deref()),
    })
}

/// Validates an expense and returns its write model.
///
/// ## Rules
/// - Description required
/// - Amount > 0
/// - Payment mode present
pub fn validate_expense(input: &ExpenseInput) -> ValidationResult<NewExpense> {
    let description = required_text(&input.description, "description", 500)?;

    if input.amount_cents <= 0 {
        return Err(ValidationError::must_be_positive("amount"));
    }

    let payment_mode = validate_payment_mode(input.payment_mode)?;

    Ok(NewExpense {
        date: input.date,
        description,
        amount_cents: input.amount_cents,
        payment_mode,
        category: normalize_optional(input.category.as_deref()),
        comment: normalize_optional(input.comment.as_deref()),
    })
}

// =============================================================================
// Account Validators
// =============================================================================

/// Validates and normalizes an email address (trimmed, lowercased).
///
/// ```rust
/// use stock_core::validation::validate_email;
///
/// assert_eq!(validate_email(" Admin@Shop.local ").unwrap(), "admin@shop.local");
/// assert!(validate_email("not-an-email").is_err());
/// ```
pub fn validate_email(email: &str) -> ValidationResult<String> {
    let email = required_text(email, "email", 254)?.to_lowercase();

    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: reason.to_string(),
    };

    if email.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain spaces"));
    }

    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => {
            if domain.contains('@') {
                return Err(invalid("must contain a single @"));
            }
        }
        _ => return Err(invalid("must look like name@domain")),
    }

    Ok(email)
}

/// Validates a new password (at least MIN_PASSWORD_LEN characters).
pub fn validate_password(password: &str) -> ValidationResult<()> {
    if password.is_empty() {
        return Err(ValidationError::required("password"));
    }

    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ValidationError::TooShort {
            field: "password".to_string(),
            min: MIN_PASSWORD_LEN,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MovementKind;
    use chrono::NaiveDate;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn test_validate_product_code() {
        assert_eq!(validate_product_code("  RIZ-25 ").unwrap(), "RIZ-25");
        assert!(validate_product_code("").is_err());
        assert!(validate_product_code("   ").is_err());
        assert!(validate_product_code("has space").is_err());
        assert!(validate_product_code(&"A".repeat(51)).is_err());
    }

    #[test]
    fn test_validate_product_input_normalizes() {
        let input = ProductInput {
            code: " P-1 ".into(),
            name: " Sugar 1kg ".into(),
            category: Some("  ".into()),
            initial_stock: 10,
            min_stock: 2,
            unit_price_cents: 800,
            purchase_price_cents: 600,
            reseller_price_cents: 700,
            image_path: None,
        };

        let valid = validate_product_input(&input).unwrap();
        assert_eq!(valid.code, "P-1");
        assert_eq!(valid.name, "Sugar 1kg");
        assert_eq!(valid.category, None);
    }

    #[test]
    fn test_validate_product_input_rejects() {
        let base = ProductInput {
            code: "P-1".into(),
            name: "Sugar".into(),
            ..Default::default()
        };
        assert!(validate_product_input(&base).is_ok());

        let no_name = ProductInput {
            name: String::new(),
            ..base.clone()
        };
        assert!(matches!(
            validate_product_input(&no_name),
            Err(ValidationError::Required { .. })
        ));

        let negative = ProductInput {
            min_stock: -1,
            ..base.clone()
        };
        assert!(validate_product_input(&negative).is_err());

        let huge = ProductInput {
            initial_stock: i64::MAX,
            ..base.clone()
        };
        assert!(matches!(
            validate_product_input(&huge),
            Err(ValidationError::OutOfRange { .. })
        ));

        let at_limit = ProductInput {
            initial_stock: MAX_STOCK_LEVEL,
            min_stock: MAX_STOCK_LEVEL,
            ..base
        };
        assert!(validate_product_input(&at_limit).is_ok());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_LINE_QUANTITY).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(-1).is_err());
        assert!(validate_quantity(MAX_LINE_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_validate_movement() {
        let input = MovementInput {
            date: day(),
            kind: MovementKind::Entree,
            product_id: Some(3),
            quantity: 4,
            unit_price_cents: None,
            client_name: Some(" ".into()),
            client_phone: None,
            comment: Some(" restock ".into()),
        };

        let valid = validate_movement(&input).unwrap();
        assert_eq!(valid.product_id, 3);
        assert_eq!(valid.client_name, None);
        assert_eq!(valid.comment.as_deref(), Some("restock"));

        let missing = MovementInput {
            product_id: None,
            ..input.clone()
        };
        assert!(validate_movement(&missing).is_err());

        let zero = MovementInput {
            quantity: 0,
            ..input
        };
        assert!(validate_movement(&zero).is_err());
    }

    #[test]
    fn test_validate_expense() {
        let input = ExpenseInput {
            date: day(),
            description: "Rent".into(),
            amount_cents: 50_000,
            payment_mode: Some(PaymentMode::BankTransfer),
            category: None,
            comment: None,
        };
        assert!(validate_expense(&input).is_ok());

        let no_mode = ExpenseInput {
            payment_mode: None,
            ..input.clone()
        };
        assert!(validate_expense(&no_mode).is_err());

        let zero = ExpenseInput {
            amount_cents: 0,
            ..input.clone()
        };
        assert!(validate_expense(&zero).is_err());

        let blank = ExpenseInput {
            description: "  ".into(),
            ..input
        };
        assert!(validate_expense(&blank).is_err());
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("a@b").is_ok());
        assert!(validate_email("").is_err());
        assert!(validate_email("@b").is_err());
        assert!(validate_email("a@").is_err());
        assert!(validate_email("a@b@c").is_err());
        assert!(validate_email("a b@c").is_err());
    }

    #[test]
    fn test_validate_password() {
        assert!(validate_password("secret").is_ok());
        assert!(validate_password("short").is_err());
        assert!(validate_password("").is_err());
    }
}
