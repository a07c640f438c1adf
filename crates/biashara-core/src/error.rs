//! # Error Types
//!
//! Domain-specific error types for biashara-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  biashara-core errors (this file)                                      │
//! │  ├── CoreError        - Business rule violations (command rejected)    │
//! │  └── ValidationError  - Malformed input (rejected before append)       │
//! │                                                                         │
//! │  biashara-db errors (separate crate)                                   │
//! │  └── DbError          - Event store failures                           │
//! │                                                                         │
//! │  biashara-ledger errors (separate crate)                               │
//! │  └── LedgerError      - What the presentation layer sees               │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → LedgerError → UI message          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every `CoreError` is local and recoverable: the command is rejected and
//! the event log is left exactly as it was.

use thiserror::Error;

use crate::event::EventId;
use crate::money::Money;
use crate::types::{AssetStatus, Location, ObligationKind, PayrollPeriod, ProductId, ShopId};

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised by command handlers, the reversal
/// handler and log replay.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Input failed structural checks.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Selling or moving more stock than the location holds.
    ///
    /// ## User Workflow
    /// ```text
    /// RecordSale (qty: 90) at main store
    ///      │
    ///      ▼
    /// Check projection: available=80
    ///      │
    ///      ▼
    /// InsufficientStock { product: "mchele", available: 80, requested: 90 }
    ///      │
    ///      ▼
    /// UI shows: "Only 80 Mchele left in main store"
    /// ```
    #[error("Insufficient stock of {product} at {location}: available {available}, requested {requested}")]
    InsufficientStock {
        product: ProductId,
        location: Location,
        available: i64,
        requested: i64,
    },

    /// Payment exceeds what is still owed (receivable, payable or loan).
    #[error("Payment of {attempted} exceeds outstanding {outstanding} on {obligation}")]
    Overpayment {
        obligation: String,
        outstanding: Money,
        attempted: Money,
    },

    /// Obligation has already been paid in full.
    #[error("{kind} {obligation} is already settled")]
    AlreadySettled {
        kind: ObligationKind,
        obligation: EventId,
    },

    /// A compensating event already targets this event.
    #[error("Event {0} has already been reversed")]
    AlreadyReversed(EventId),

    /// Payroll for this period and shop is already on the books.
    #[error("Payroll for {period} ({}) has already been processed", shop_label(.shop))]
    AlreadyProcessed {
        period: PayrollPeriod,
        shop: Option<ShopId>,
    },

    /// A later event relies on the one being reversed.
    #[error("Event {event_id} cannot be reversed: event {dependent_id} depends on it and must be reversed first")]
    DependentEventExists {
        event_id: EventId,
        dependent_id: EventId,
    },

    /// Referenced entity does not exist (or is no longer in force).
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Asset is not in a state that allows the operation.
    #[error("Asset {asset} is {status}, cannot perform operation")]
    InvalidAssetStatus { asset: EventId, status: AssetStatus },

    /// A persisted log cannot be replayed (gap, reordering, bad payload).
    #[error("Event log is corrupt: {0}")]
    CorruptLog(String),
}

fn shop_label(shop: &Option<ShopId>) -> String {
    match shop {
        Some(id) => format!("shop {}", id),
        None => "headquarters".to_string(),
    }
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        CoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when a command or event payload is malformed. They are
/// raised before any business rule runs and before anything is appended.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid period, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value (e.g., product listed twice).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::InsufficientStock {
            product: ProductId::new("mchele"),
            location: Location::Main,
            available: 80,
            requested: 90,
        };
        assert_eq!(
            err.to_string(),
            "Insufficient stock of mchele at main store: available 80, requested 90"
        );

        let err = CoreError::AlreadyProcessed {
            period: PayrollPeriod::new(2026, 9).unwrap(),
            shop: None,
        };
        assert_eq!(
            err.to_string(),
            "Payroll for 2026-09 (headquarters) has already been processed"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        let err = ValidationError::Required {
            field: "customer".to_string(),
        };
        assert_eq!(err.to_string(), "customer is required");

        let err = ValidationError::MustBePositive {
            field: "amount".to_string(),
        };
        assert_eq!(err.to_string(), "amount must be positive");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required {
            field: "product".to_string(),
        };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }

    #[test]
    fn test_overpayment_message() {
        let err = CoreError::Overpayment {
            obligation: "receivable 4".to_string(),
            outstanding: Money::from_major(500),
            attempted: Money::from_major(600),
        };
        assert_eq!(
            err.to_string(),
            "Payment of TSh 600.00 exceeds outstanding TSh 500.00 on receivable 4"
        );
    }

    #[test]
    fn test_dependent_event_message() {
        let err = CoreError::DependentEventExists {
            event_id: EventId::new(3),
            dependent_id: EventId::new(7),
        };
        assert!(err.to_string().contains("event 7 depends on it"));
    }
}
