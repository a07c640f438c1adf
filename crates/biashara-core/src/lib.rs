//! # biashara-core: Event-Sourced Ledger Logic
//!
//! The pure heart of Biashara: the event log, the balance projector, the
//! command handlers, the reversal handler and the reports. Zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Biashara Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               Presentation (forms, tables, dialogs)             │   │
//! │  │        issues CommandEnvelopes, renders LedgerViews/reports     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │          biashara-ledger (TenantLedger, config, AI flows)        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ biashara-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐  ┌────────────┐  ┌──────────┐  ┌────────────┐   │   │
//! │  │   │  event   │  │ projection │  │ command  │  │  reversal  │   │   │
//! │  │   │   log    │─►│   delta    │◄─│ handlers │  │  handler   │   │   │
//! │  │   └──────────┘  │   views    │  └──────────┘  └────────────┘   │   │
//! │  │                 └────────────┘        report, payroll,          │   │
//! │  │                                       depreciation              │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            biashara-db (SQLite append-only event store)         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`event`] / [`log`] - Immutable events and the append-only log
//! - [`projection`] / [`delta`] / [`views`] - The fold and its read models
//! - [`command`] / [`reversal`] - Handlers that turn requests into events
//! - [`report`] - P&L, balance sheet, VAT summary
//! - [`payroll`] / [`depreciation`] - Pure derived calculations
//! - [`money`] / [`types`] / [`error`] / [`validation`] - Building blocks
//!
//! ## Design Principles
//!
//! 1. **Events are facts**: never edited, never deleted; corrections are reversals
//! 2. **Balances are derived**: every number on screen is a fold of the log
//! 3. **Integer Money**: all amounts are cents (i64), rates are basis points
//! 4. **Explicit Errors**: every rejection is a typed `CoreError`
//!
//! ## Example Usage
//!
//! ```rust
//! use biashara_core::{handle, Command, CommandEnvelope, EventLog, ProjectedState};
//! use biashara_core::{Money, PaymentMethod};
//! use chrono::NaiveDate;
//!
//! let mut log = EventLog::new();
//! let mut state = ProjectedState::new();
//!
//! let envelope = CommandEnvelope::new(
//!     NaiveDate::from_ymd_opt(2026, 1, 2).unwrap(),
//!     Command::ContributeCapital {
//!         contributor: "Owner".to_string(),
//!         amount: Money::from_major(1_000_000),
//!         method: PaymentMethod::Bank,
//!     },
//! );
//!
//! let drafts = handle(&envelope, &state).unwrap();
//! for id in log.append_all(drafts).unwrap() {
//!     state.apply(log.get(id).unwrap()).unwrap();
//! }
//! assert_eq!(state.views().headquarters.bank, Money::from_major(1_000_000));
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod command;
pub mod delta;
pub mod depreciation;
pub mod error;
pub mod event;
pub mod log;
pub mod money;
pub mod payroll;
pub mod projection;
pub mod report;
pub mod reversal;
pub mod types;
pub mod validation;
pub mod views;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use command::{handle, Command, CommandEnvelope};
pub use error::{CoreError, CoreResult, ValidationError};
pub use event::{Event, EventDraft, EventId, EventKind};
pub use log::EventLog;
pub use money::Money;
pub use projection::{project, ProjectedState};
pub use report::{BalanceSheet, FinancialReport, ProfitAndLoss, VatSummary};
pub use reversal::reverse;
pub use types::*;
pub use views::LedgerViews;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Tenant used by the operator tools when none is configured.
pub const DEFAULT_TENANT_ID: &str = "00000000-0000-0000-0000-000000000001";

/// Longest accepted free-text name (customer, supplier, reason...).
pub const MAX_NAME_LENGTH: usize = 200;

/// Largest quantity a single stock movement may carry.
///
/// ## Business Reason
/// Catches keying errors (an extra zero or two) before they become stock.
pub const MAX_QUANTITY: i64 = 1_000_000;

/// Largest single amount, in cents, an event may carry (TSh 1 trillion).
/// Line totals (unit price × quantity) are held to the same ceiling.
pub const MAX_AMOUNT: i64 = 100_000_000_000_000;

/// Largest magnitude, in cents, any running balance may reach. Sums of a
/// few balances in reports must still fit in an `i64`.
pub const MAX_BALANCE: i64 = 10_000_000_000_000_000;
