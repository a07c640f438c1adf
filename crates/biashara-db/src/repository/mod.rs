//! # Repository Module
//!
//! Database repository implementations for the Biashara event store.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  TenantLedger (biashara-ledger)                                        │
//! │       │                                                                 │
//! │       │  db.events().append_events(tenant, &events)                    │
//! │       ▼                                                                 │
//! │  EventRepository                                                       │
//! │  ├── append_events(&self, tenant, events)   one transaction            │
//! │  ├── list_events(&self, tenant, after)      ordered by sequence        │
//! │  ├── get_event(&self, tenant, id)                                      │
//! │  └── last_sequence(&self, tenant)                                      │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database (ledger_events, append-only)                          │
//! │                                                                         │
//! │  No update or delete methods exist.                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`event::EventRepository`] - The per-tenant ledger event log

pub mod event;
