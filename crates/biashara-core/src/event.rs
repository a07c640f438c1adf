//! # Business Events
//!
//! The immutable facts the ledger is built from.
//!
//! ## Event Anatomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Event                                                                  │
//! │  ├── id             EventId   per-tenant sequence (1, 2, 3, ...)        │
//! │  ├── business_date  NaiveDate when it happened in the business          │
//! │  ├── recorded_at    DateTime  when it was appended (wall clock)         │
//! │  ├── shop_id        Option    None = headquarters                       │
//! │  └── kind           EventKind tagged payload                            │
//! │                                                                         │
//! │  Command handler ──► EventDraft (no id) ──► EventLog::append ──► Event  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Events are never edited. Corrections are `EventReversed` events that
//! point at the original, optionally followed by a corrective event.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::types::{EmployeeId, Location, PaymentMethod, PayrollPeriod, ProductId, Rate, ShopId};
use crate::validation::{
    line_total, validate_amount, validate_name, validate_quantity, validate_rate,
    validate_settling_method,
};
use crate::MAX_AMOUNT;

// =============================================================================
// Event Id
// =============================================================================

/// Per-tenant, monotonically increasing event sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct EventId(u64);

impl EventId {
    pub const fn new(seq: u64) -> Self {
        EventId(seq)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }

    /// The id that follows this one.
    pub const fn next(&self) -> EventId {
        EventId(self.0 + 1)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Payload Helpers
// =============================================================================

/// One employee's gross pay inside a payroll run.
///
/// Deductions and net pay are derived (see [`crate::payroll`]).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollLine {
    pub employee_id: EmployeeId,
    pub name: String,
    pub gross_salary: Money,
}

/// The two halves of a VAT correction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VatAdjustment {
    /// Takes the sale's current VAT portion off the books.
    Reversal,
    /// Puts the VAT back at the corrected rate.
    Correction,
}

// =============================================================================
// Event Kind
// =============================================================================

/// Tagged event payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    ProductListed {
        product_id: ProductId,
        name: String,
        selling_price: Money,
        cost_price: Money,
        vat_rate: Rate,
    },
    StockReceived {
        product_id: ProductId,
        quantity: i64,
        unit_cost: Money,
        supplier: String,
        method: PaymentMethod,
    },
    SaleRecorded {
        customer: String,
        product_id: ProductId,
        quantity: i64,
        unit_price: Money,
        unit_cost: Money,
        vat_rate: Rate,
        vat: Money,
        method: PaymentMethod,
    },
    PaymentReceived {
        receivable: EventId,
        amount: Money,
        method: PaymentMethod,
    },
    PaymentMade {
        payable: EventId,
        amount: Money,
        method: PaymentMethod,
    },
    ExpensePosted {
        category: String,
        description: String,
        supplier: String,
        amount: Money,
        method: PaymentMethod,
    },
    ExpenseApproved {
        expense: EventId,
        category: String,
        supplier: String,
        amount: Money,
        method: PaymentMethod,
    },
    StockTransferred {
        product_id: ProductId,
        from: Location,
        to: Location,
        quantity: i64,
    },
    StockDamaged {
        product_id: ProductId,
        quantity: i64,
        unit_cost: Money,
        reason: String,
    },
    AssetAcquired {
        name: String,
        cost: Money,
        depreciation_rate: Rate,
        supplier: String,
        method: PaymentMethod,
    },
    AssetSold {
        asset: EventId,
        buyer: String,
        price: Money,
        net_book_value: Money,
        method: PaymentMethod,
    },
    AssetWrittenOff {
        asset: EventId,
        net_book_value: Money,
        reason: String,
    },
    CapitalContributed {
        contributor: String,
        amount: Money,
        method: PaymentMethod,
    },
    DrawingMade {
        owner: String,
        amount: Money,
        method: PaymentMethod,
    },
    LoanReceived {
        lender: String,
        amount: Money,
        method: PaymentMethod,
    },
    LoanRepaid {
        lender: String,
        amount: Money,
        method: PaymentMethod,
    },
    EmployeeRegistered {
        employee_id: EmployeeId,
        name: String,
        gross_salary: Money,
    },
    PayrollProcessed {
        period: PayrollPeriod,
        lines: Vec<PayrollLine>,
        method: PaymentMethod,
    },
    VatAdjusted {
        sale: EventId,
        adjustment: VatAdjustment,
        rate: Rate,
        amount: Money,
    },
    EventReversed {
        target: EventId,
        reason: String,
    },
}

/// Something an event relies on being in force.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum Reference {
    Event(EventId),
    Product(ProductId),
    Employee(EmployeeId),
}

impl EventKind {
    /// Stable snake_case name, also stored as the `event_type` column.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::ProductListed { .. } => "product_listed",
            EventKind::StockReceived { .. } => "stock_received",
            EventKind::SaleRecorded { .. } => "sale_recorded",
            EventKind::PaymentReceived { .. } => "payment_received",
            EventKind::PaymentMade { .. } => "payment_made",
            EventKind::ExpensePosted { .. } => "expense_posted",
            EventKind::ExpenseApproved { .. } => "expense_approved",
            EventKind::StockTransferred { .. } => "stock_transferred",
            EventKind::StockDamaged { .. } => "stock_damaged",
            EventKind::AssetAcquired { .. } => "asset_acquired",
            EventKind::AssetSold { .. } => "asset_sold",
            EventKind::AssetWrittenOff { .. } => "asset_written_off",
            EventKind::CapitalContributed { .. } => "capital_contributed",
            EventKind::DrawingMade { .. } => "drawing_made",
            EventKind::LoanReceived { .. } => "loan_received",
            EventKind::LoanRepaid { .. } => "loan_repaid",
            EventKind::EmployeeRegistered { .. } => "employee_registered",
            EventKind::PayrollProcessed { .. } => "payroll_processed",
            EventKind::VatAdjusted { .. } => "vat_adjusted",
            EventKind::EventReversed { .. } => "event_reversed",
        }
    }

    /// What this event relies on. Used to build the dependency index that
    /// guards reversals.
    pub fn references(&self) -> Vec<Reference> {
        match self {
            EventKind::StockReceived { product_id, .. }
            | EventKind::SaleRecorded { product_id, .. }
            | EventKind::StockTransferred { product_id, .. }
            | EventKind::StockDamaged { product_id, .. } => {
                vec![Reference::Product(product_id.clone())]
            }
            EventKind::PaymentReceived { receivable, .. } => vec![Reference::Event(*receivable)],
            EventKind::PaymentMade { payable, .. } => vec![Reference::Event(*payable)],
            EventKind::ExpenseApproved { expense, .. } => vec![Reference::Event(*expense)],
            EventKind::AssetSold { asset, .. } | EventKind::AssetWrittenOff { asset, .. } => {
                vec![Reference::Event(*asset)]
            }
            EventKind::PayrollProcessed { lines, .. } => lines
                .iter()
                .map(|line| Reference::Employee(line.employee_id.clone()))
                .collect(),
            EventKind::VatAdjusted { sale, .. } => vec![Reference::Event(*sale)],
            _ => Vec::new(),
        }
    }

    /// Whether applying this event moves cash, bank or mobile balances.
    ///
    /// Reversals move cash exactly when their target did.
    pub fn moves_cash(&self) -> bool {
        let method = match self {
            EventKind::StockReceived { method, .. }
            | EventKind::SaleRecorded { method, .. }
            | EventKind::PaymentReceived { method, .. }
            | EventKind::PaymentMade { method, .. }
            | EventKind::ExpenseApproved { method, .. }
            | EventKind::AssetAcquired { method, .. }
            | EventKind::AssetSold { method, .. }
            | EventKind::CapitalContributed { method, .. }
            | EventKind::DrawingMade { method, .. }
            | EventKind::LoanReceived { method, .. }
            | EventKind::LoanRepaid { method, .. }
            | EventKind::PayrollProcessed { method, .. } => method,
            _ => return false,
        };
        method.cash_account().is_some()
    }

    /// Structural checks that do not need the projection.
    ///
    /// ## Rules
    /// - Amounts and quantities are strictly positive
    /// - Names and references are present
    /// - Rates are at most 100%
    /// - Events that must move money cannot use `Credit`
    /// - A transfer has two distinct locations
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            EventKind::ProductListed {
                product_id,
                name,
                selling_price,
                cost_price,
                vat_rate,
            } => {
                validate_name("product_id", product_id.as_str())?;
                validate_name("name", name)?;
                validate_amount("selling_price", *selling_price)?;
                if cost_price.is_negative() || cost_price.cents() > MAX_AMOUNT {
                    return Err(ValidationError::OutOfRange {
                        field: "cost_price".to_string(),
                        min: 0,
                        max: MAX_AMOUNT,
                    });
                }
                validate_rate("vat_rate", *vat_rate)
            }
            EventKind::StockReceived {
                product_id,
                quantity,
                unit_cost,
                supplier,
                ..
            } => {
                validate_name("product_id", product_id.as_str())?;
                validate_quantity(*quantity)?;
                validate_amount("unit_cost", *unit_cost)?;
                line_total("receipt total", *unit_cost, *quantity)?;
                validate_name("supplier", supplier)
            }
            EventKind::SaleRecorded {
                customer,
                product_id,
                quantity,
                unit_price,
                unit_cost,
                vat_rate,
                vat,
                ..
            } => {
                validate_name("customer", customer)?;
                validate_name("product_id", product_id.as_str())?;
                validate_quantity(*quantity)?;
                validate_amount("unit_price", *unit_price)?;
                line_total("sale total", *unit_price, *quantity)?;
                line_total("sale cost", *unit_cost, *quantity)?;
                validate_rate("vat_rate", *vat_rate)?;
                if vat.is_negative() || vat.cents() > MAX_AMOUNT {
                    return Err(ValidationError::MustBePositive {
                        field: "vat".to_string(),
                    });
                }
                Ok(())
            }
            EventKind::PaymentReceived { amount, method, .. }
            | EventKind::PaymentMade { amount, method, .. }
            | EventKind::CapitalContributed { amount, method, .. }
            | EventKind::DrawingMade { amount, method, .. }
            | EventKind::LoanReceived { amount, method, .. }
            | EventKind::LoanRepaid { amount, method, .. } => {
                validate_amount("amount", *amount)?;
                validate_settling_method(*method)
            }
            EventKind::ExpensePosted {
                category,
                supplier,
                amount,
                ..
            }
            | EventKind::ExpenseApproved {
                category,
                supplier,
                amount,
                ..
            } => {
                validate_name("category", category)?;
                validate_name("supplier", supplier)?;
                validate_amount("amount", *amount)
            }
            EventKind::StockTransferred {
                product_id,
                from,
                to,
                quantity,
            } => {
                validate_name("product_id", product_id.as_str())?;
                validate_quantity(*quantity)?;
                if from == to {
                    return Err(ValidationError::InvalidFormat {
                        field: "to".to_string(),
                        reason: "transfer source and destination must differ".to_string(),
                    });
                }
                Ok(())
            }
            EventKind::StockDamaged {
                product_id,
                quantity,
                unit_cost,
                ..
            } => {
                validate_name("product_id", product_id.as_str())?;
                validate_quantity(*quantity)?;
                line_total("loss total", *unit_cost, *quantity)?;
                Ok(())
            }
            EventKind::AssetAcquired {
                name,
                cost,
                depreciation_rate,
                ..
            } => {
                validate_name("name", name)?;
                validate_amount("cost", *cost)?;
                validate_rate("depreciation_rate", *depreciation_rate)
            }
            EventKind::AssetSold {
                buyer,
                price,
                method,
                ..
            } => {
                validate_name("buyer", buyer)?;
                validate_amount("price", *price)?;
                validate_settling_method(*method)
            }
            EventKind::AssetWrittenOff { .. } => Ok(()),
            EventKind::EmployeeRegistered {
                employee_id,
                name,
                gross_salary,
            } => {
                validate_name("employee_id", employee_id.as_str())?;
                validate_name("name", name)?;
                validate_amount("gross_salary", *gross_salary)
            }
            EventKind::PayrollProcessed { lines, method, .. } => {
                if lines.is_empty() {
                    return Err(ValidationError::Required {
                        field: "payroll lines".to_string(),
                    });
                }
                for line in lines {
                    validate_amount("gross_salary", line.gross_salary)?;
                }
                validate_settling_method(*method)
            }
            EventKind::VatAdjusted { rate, amount, .. } => {
                validate_rate("rate", *rate)?;
                if amount.is_negative() || amount.cents() > MAX_AMOUNT {
                    return Err(ValidationError::MustBePositive {
                        field: "amount".to_string(),
                    });
                }
                Ok(())
            }
            EventKind::EventReversed { reason, .. } => validate_name("reason", reason),
        }
    }
}

// =============================================================================
// Event & Draft
// =============================================================================

/// An event produced by a handler, waiting for the log to assign its id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventDraft {
    pub business_date: NaiveDate,
    pub shop_id: Option<ShopId>,
    pub kind: EventKind,
}

impl EventDraft {
    pub fn new(business_date: NaiveDate, shop_id: Option<ShopId>, kind: EventKind) -> Self {
        EventDraft {
            business_date,
            shop_id,
            kind,
        }
    }

    /// Stamps the draft with its id and insert time.
    pub fn into_event(self, id: EventId, recorded_at: DateTime<Utc>) -> Event {
        Event {
            id,
            business_date: self.business_date,
            recorded_at,
            shop_id: self.shop_id,
            kind: self.kind,
        }
    }
}

/// An appended, immutable business event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub business_date: NaiveDate,
    pub recorded_at: DateTime<Utc>,
    pub shop_id: Option<ShopId>,
    pub kind: EventKind,
}

impl Event {
    /// The location stock and cash move at for this event.
    pub fn location(&self) -> Location {
        Location::from_shop(self.shop_id.as_ref())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sale(quantity: i64) -> EventKind {
        EventKind::SaleRecorded {
            customer: "Mama Neema".to_string(),
            product_id: ProductId::new("mchele"),
            quantity,
            unit_price: Money::from_major(3_000),
            unit_cost: Money::from_major(2_200),
            vat_rate: Rate::from_bps(1800),
            vat: Money::from_major(540),
            method: PaymentMethod::Cash,
        }
    }

    #[test]
    fn test_validate_rejects_non_positive_quantity() {
        assert!(sale(1).validate().is_ok());
        assert!(matches!(
            sale(0).validate(),
            Err(ValidationError::MustBePositive { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_oversized_amounts() {
        let huge = EventKind::CapitalContributed {
            contributor: "Owner".to_string(),
            amount: Money::from_cents(i64::MAX - 1),
            method: PaymentMethod::Bank,
        };
        assert!(matches!(
            huge.validate(),
            Err(ValidationError::OutOfRange { .. })
        ));

        // Unit price in range, but the line total is not.
        let bulk = EventKind::SaleRecorded {
            customer: "Mama Neema".to_string(),
            product_id: ProductId::new("mchele"),
            quantity: 1_000_000,
            unit_price: Money::from_cents(MAX_AMOUNT),
            unit_cost: Money::zero(),
            vat_rate: Rate::zero(),
            vat: Money::zero(),
            method: PaymentMethod::Cash,
        };
        assert!(bulk.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_credit_capital() {
        let kind = EventKind::CapitalContributed {
            contributor: "Owner".to_string(),
            amount: Money::from_major(1_000_000),
            method: PaymentMethod::Credit,
        };
        assert!(kind.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_transfer_to_same_location() {
        let kind = EventKind::StockTransferred {
            product_id: ProductId::new("mchele"),
            from: Location::Main,
            to: Location::Main,
            quantity: 5,
        };
        assert!(kind.validate().is_err());
    }

    #[test]
    fn test_references() {
        let payment = EventKind::PaymentReceived {
            receivable: EventId::new(4),
            amount: Money::from_major(100),
            method: PaymentMethod::Bank,
        };
        assert_eq!(payment.references(), vec![Reference::Event(EventId::new(4))]);
        assert_eq!(
            sale(1).references(),
            vec![Reference::Product(ProductId::new("mchele"))]
        );
    }

    #[test]
    fn test_moves_cash() {
        assert!(sale(1).moves_cash());
        let transfer = EventKind::StockTransferred {
            product_id: ProductId::new("mchele"),
            from: Location::Main,
            to: Location::Shop(ShopId::new("kariakoo")),
            quantity: 5,
        };
        assert!(!transfer.moves_cash());
    }

    #[test]
    fn test_serde_tagged_payload() {
        let json = serde_json::to_value(sale(2)).unwrap();
        assert_eq!(json["type"], "sale_recorded");
        let back: EventKind = serde_json::from_value(json).unwrap();
        assert_eq!(back, sale(2));
    }
}
