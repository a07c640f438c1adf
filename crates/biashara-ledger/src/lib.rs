//! # biashara-ledger: Tenant Ledger Service
//!
//! The tenant-scoped entry point of Biashara: one [`TenantLedger`] per tenant
//! session, writing through an [`EventStore`] and serving snapshots to the
//! presentation layer.
//!
//! ## Architecture Overview
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Ledger Service Architecture                      │
//! │                                                                         │
//! │   Presentation layer                                                    │
//! │     │  CommandEnvelope                      ▲ ProjectedState / report   │
//! │     ▼                                       │                           │
//! │  ┌──────────────────────────────────────────┴───────────────────────┐  │
//! │  │                    TenantLedger (tenant.rs)                       │  │
//! │  │   RwLock<log + projection>   single writer, many readers          │  │
//! │  └───────────┬──────────────────────────────────────┬───────────────┘  │
//! │              │ handle / apply                       │ append / list     │
//! │              ▼                                      ▼                   │
//! │     ┌─────────────────┐                 ┌───────────────────────────┐  │
//! │     │  biashara-core  │                 │  dyn EventStore (store.rs)│  │
//! │     │  (pure)         │                 │  SQLite │ in-memory       │  │
//! │     └─────────────────┘                 └───────────────────────────┘  │
//! │                                                                         │
//! │  Side modules:                                                          │
//! │  • config.rs - ledger.toml + BIASHARA_* environment                    │
//! │  • ai.rs     - typed AI text-flow contracts over dyn TextCompletion     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`tenant`] - `TenantLedger`, the write path and snapshots
//! - [`store`] - `EventStore` trait, SQLite and in-memory implementations
//! - [`config`] - `LedgerConfig` loading, validation and saving
//! - [`ai`] - Translation, report generation, discrepancy and root-cause flows
//! - [`error`] - `LedgerError`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use biashara_ledger::{LedgerConfig, TenantLedger};
//!
//! let config = LedgerConfig::load(None)?;
//! let ledger = TenantLedger::open_from_config(&config).await?;
//!
//! let ids = ledger.execute(envelope).await?;
//! let report = ledger.report(today).await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod ai;
pub mod config;
pub mod error;
pub mod store;
pub mod tenant;

// =============================================================================
// Re-exports
// =============================================================================

pub use ai::{
    run_flow, AiFlow, DiscrepancyExplanation, ReportGeneration, RootCauseAnalysis, TextCompletion,
    Translation,
};
pub use config::LedgerConfig;
pub use error::{LedgerError, LedgerResult};
pub use store::{EventStore, InMemoryEventStore};
pub use tenant::TenantLedger;
