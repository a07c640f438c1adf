//! # biashara-db: SQLite Event Store for Biashara
//!
//! This crate persists each tenant's ledger event log.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Biashara Data Flow                               │
//! │                                                                         │
//! │  TenantLedger::execute (biashara-ledger)                               │
//! │       │  stamped events                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   biashara-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │  (event.rs)    │    │  (embedded)  │  │   │
//! │  │   │               │    │                │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ EventRepository│    │ 001_ledger_  │  │   │
//! │  │   │ WAL, FKs      │    │ append / list  │    │  events.sql  │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │      SQLite Database: ledger_events (append-only triggers)      │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - The ledger event repository
//!
//! ## Usage
//!
//! ```rust,ignore
//! use biashara_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/biashara.db")).await?;
//!
//! let events = log.stamp(drafts, Utc::now())?;
//! db.events().append_events(tenant_id, &events).await?;
//! let history = db.events().list_events(tenant_id, None).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig, TenantTail};

pub use repository::event::EventRepository;
