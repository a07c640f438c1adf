//! # Validation Module
//!
//! Shared validators used by event structural checks and command handlers.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Command handler                                              │
//! │  ├── THIS MODULE: field checks on the command                          │
//! │  └── Business rules against the projection (stock, balances)           │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: EventLog::append                                             │
//! │  └── EventKind::validate (same validators, on the payload)             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite                                                       │
//! │  ├── PRIMARY KEY (tenant_id, sequence)                                 │
//! │  └── Append-only triggers                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use biashara_core::validation::{validate_name, validate_quantity};
//!
//! validate_name("customer", "Mama Neema").unwrap();
//! validate_quantity(10).unwrap();
//! assert!(validate_quantity(0).is_err());
//! ```

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{PaymentMethod, Rate};
use crate::{MAX_AMOUNT, MAX_BALANCE, MAX_NAME_LENGTH, MAX_QUANTITY};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a free-text name (customer, supplier, product, reason...).
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most [`MAX_NAME_LENGTH`] characters
///
/// ## Example
/// ```rust
/// use biashara_core::validation::validate_name;
///
/// assert!(validate_name("supplier", "Azam Mills").is_ok());
/// assert!(validate_name("supplier", "   ").is_err());
/// ```
pub fn validate_name(field: &str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LENGTH,
        });
    }

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a stock quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed [`MAX_QUANTITY`]
///
/// ## User Workflow
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Record Sale                                                            │
/// │                                                                         │
/// │  User enters quantity: 10                                              │
/// │       │                                                                 │
/// │       ▼                                                                 │
/// │  validate_quantity(10) ← THIS FUNCTION                                 │
/// │       │                                                                 │
/// │       ├── qty <= 0?        → "quantity must be positive"               │
/// │       ├── qty > MAX?       → "quantity must be between ..."            │
/// │       └── OK → stock check against the projection                      │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a monetary amount that must be strictly positive.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed [`MAX_AMOUNT`] cents
pub fn validate_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if !amount.is_positive() {
        return Err(ValidationError::MustBePositive {
            field: field.to_string(),
        });
    }

    if amount.cents() > MAX_AMOUNT {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 1,
            max: MAX_AMOUNT,
        });
    }

    Ok(())
}

/// Unit amount × quantity, held to the same ceiling as a single amount.
///
/// ```rust
/// use biashara_core::money::Money;
/// use biashara_core::validation::line_total;
///
/// let total = line_total("sale total", Money::from_major(3_000), 10).unwrap();
/// assert_eq!(total, Money::from_major(30_000));
/// assert!(line_total("sale total", Money::from_major(1_000_000_000), 1_000_000).is_err());
/// ```
pub fn line_total(field: &str, unit: Money, quantity: i64) -> ValidationResult<Money> {
    let total = unit
        .checked_multiply_quantity(quantity)
        .filter(|total| total.cents() <= MAX_AMOUNT)
        .ok_or_else(|| ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT,
        })?;
    Ok(total)
}

/// Adds a signed change to a running balance, refusing results outside
/// ±[`MAX_BALANCE`].
pub fn bounded_add(field: &str, balance: Money, change: Money) -> ValidationResult<Money> {
    balance
        .checked_add(change)
        .filter(|sum| sum.cents().abs() <= MAX_BALANCE)
        .ok_or_else(|| ValidationError::OutOfRange {
            field: field.to_string(),
            min: -MAX_BALANCE,
            max: MAX_BALANCE,
        })
}

/// Validates a rate in basis points.
///
/// ## Rules
/// - Must be between 0 and 10000 (0% to 100%)
pub fn validate_rate(field: &str, rate: Rate) -> ValidationResult<()> {
    if rate > Rate::FULL {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: Rate::FULL.bps() as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Enum Validators
// =============================================================================

/// Payments, capital, drawings, loans and payroll must actually move money.
pub fn validate_settling_method(method: PaymentMethod) -> ValidationResult<()> {
    if method.cash_account().is_none() {
        return Err(ValidationError::NotAllowed {
            field: "payment method".to_string(),
            allowed: vec!["cash".to_string(), "bank".to_string(), "mobile".to_string()],
        });
    }

    Ok(())
}

// =============================================================================
// UUID Validators
// =============================================================================

/// Validates a UUID string (tenant ids).
///
/// ## Example
/// ```rust
/// use biashara_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
