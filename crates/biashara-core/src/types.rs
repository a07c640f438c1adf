//! # Domain Types
//!
//! Identifiers, enums and small value types shared by the event log, the
//! projector and the command handlers.
//!
//! ## Type Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  Identifiers    │   │  PaymentMethod  │   │    Location     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  ShopId         │   │  Cash   ─┐      │   │  Main (HQ)      │       │
//! │  │  ProductId      │   │  Bank   ─┼► cash│   │  Shop(ShopId)   │       │
//! │  │  EmployeeId     │   │  Mobile ─┘ acct │   └─────────────────┘       │
//! │  │  PayrollPeriod  │   │  Credit ──► obligation                        │
//! │  └─────────────────┘   └─────────────────┘                              │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Rate       │   │ObligationStatus │   │   AssetStatus   │       │
//! │  │  bps (u32)      │   │  Open           │   │  Active         │       │
//! │  │  1800 = 18%     │   │  Settled        │   │  Sold           │       │
//! │  └─────────────────┘   │  Reversed       │   │  WrittenOff     │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::ValidationError;

// =============================================================================
// Rate
// =============================================================================

/// A rate in basis points (1 bps = 0.01%).
///
/// Used for VAT, depreciation and statutory deductions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Rate(u32);

impl Rate {
    /// 100%.
    pub const FULL: Rate = Rate(10_000);

    /// Creates a rate from basis points.
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Rate(bps)
    }

    /// Creates a rate from a percentage (for convenience at the UI boundary).
    pub fn from_percentage(pct: f64) -> Self {
        Rate((pct * 100.0).round() as u32)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero rate.
    #[inline]
    pub const fn zero() -> Self {
        Rate(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for Rate {
    fn default() -> Self {
        Rate::zero()
    }
}

// =============================================================================
// Identifiers
// =============================================================================

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[ts(export)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                $name(id.into())
            }

            /// Mints a fresh UUID v4 identifier.
            pub fn generate() -> Self {
                $name(uuid::Uuid::new_v4().to_string())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name(s.to_string())
            }
        }
    };
}

string_id!(
    /// A branch/shop of the business. Events without a shop belong to headquarters.
    ShopId
);
string_id!(
    /// A catalogue product.
    ProductId
);
string_id!(
    /// A registered employee.
    EmployeeId
);

/// A payroll period in `YYYY-MM` form.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PayrollPeriod {
    year: i32,
    month: u32,
}

impl PayrollPeriod {
    pub fn new(year: i32, month: u32) -> Result<Self, ValidationError> {
        if !(1..=12).contains(&month) {
            return Err(ValidationError::InvalidFormat {
                field: "period".to_string(),
                reason: format!("month {} is not between 1 and 12", month),
            });
        }
        Ok(PayrollPeriod { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }
}

impl fmt::Display for PayrollPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl std::str::FromStr for PayrollPeriod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidFormat {
            field: "period".to_string(),
            reason: format!("'{}' is not in YYYY-MM form", s),
        };
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        let year: i32 = year.parse().map_err(|_| invalid())?;
        let month: u32 = month.parse().map_err(|_| invalid())?;
        PayrollPeriod::new(year, month)
    }
}

impl TryFrom<String> for PayrollPeriod {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PayrollPeriod> for String {
    fn from(period: PayrollPeriod) -> Self {
        period.to_string()
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How a business event settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash (till/safe).
    Cash,
    /// Bank transfer or cheque.
    Bank,
    /// Mobile money (M-Pesa, Tigo Pesa, Airtel Money).
    Mobile,
    /// Nothing moves now; a receivable or payable is opened.
    Credit,
}

impl PaymentMethod {
    /// The cash account this method moves, or `None` for credit.
    pub fn cash_account(&self) -> Option<CashAccount> {
        match self {
            PaymentMethod::Cash => Some(CashAccount::Cash),
            PaymentMethod::Bank => Some(CashAccount::Bank),
            PaymentMethod::Mobile => Some(CashAccount::Mobile),
            PaymentMethod::Credit => None,
        }
    }
}

/// One of the three liquid balances tracked per shop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CashAccount {
    Cash,
    Bank,
    Mobile,
}

impl CashAccount {
    pub fn as_str(&self) -> &'static str {
        match self {
            CashAccount::Cash => "cash",
            CashAccount::Bank => "bank",
            CashAccount::Mobile => "mobile",
        }
    }
}

// =============================================================================
// Location
// =============================================================================

/// Where stock (and cash) lives: headquarters main store or a shop.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    Main,
    Shop(ShopId),
}

impl Location {
    /// Maps the nullable `shop_id` of an event onto a location.
    pub fn from_shop(shop: Option<&ShopId>) -> Self {
        match shop {
            Some(id) => Location::Shop(id.clone()),
            None => Location::Main,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Main => f.write_str("main store"),
            Location::Shop(id) => write!(f, "shop {}", id),
        }
    }
}

// =============================================================================
// Statuses
// =============================================================================

/// Receivable/payable lifecycle: `Open → Settled` or `Open → Reversed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ObligationStatus {
    Open,
    Settled,
    Reversed,
}

/// Which side of the books an obligation sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ObligationKind {
    Receivable,
    Payable,
}

impl fmt::Display for ObligationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObligationKind::Receivable => f.write_str("receivable"),
            ObligationKind::Payable => f.write_str("payable"),
        }
    }
}

/// Asset register lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum AssetStatus {
    Active,
    Sold,
    WrittenOff,
}

impl fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetStatus::Active => f.write_str("active"),
            AssetStatus::Sold => f.write_str("sold"),
            AssetStatus::WrittenOff => f.write_str("written off"),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
