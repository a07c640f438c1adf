//! # Tenant Ledger
//!
//! The explicit state handle for one tenant session: owns the in-memory log
//! and projection, serializes writers, and lets readers take snapshots.
//!
//! ## Write Path
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  execute(envelope)                                   [write lock held]  │
//! │    │                                                                    │
//! │    ├── stale? ──► catch up from the store (events after last_id)        │
//! │    │                                                                    │
//! │    ├── handle(envelope, state) ──► drafts        (CoreError → reject)   │
//! │    ├── log.stamp(drafts)       ──► events with ids                      │
//! │    ├── trial-apply on a copy of the projection                          │
//! │    │                                                                    │
//! │    ├── store.append_events(tenant, events)                              │
//! │    │     └── Err ──► mark stale, return Persistence (retryable)         │
//! │    │                                                                    │
//! │    └── commit: log.extend(events), state = trial                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Readers hold the read lock only long enough to clone what they need, so a
//! snapshot never shows half of a command's events.
//!
//! A store error may hide a write that actually landed (lost acknowledgement).
//! The stale flag makes the next command reload those events before it is
//! validated, so retrying with the same idempotency key (a payroll period,
//! an obligation already settled) is rejected instead of duplicated.

use chrono::{NaiveDate, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use biashara_core::{
    handle, project, Command, CommandEnvelope, CoreError, Event, EventId, EventLog,
    FinancialReport, LedgerViews, ProjectedState,
};
use biashara_db::Database;

use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::store::EventStore;

#[derive(Debug, Default)]
struct Inner {
    log: EventLog,
    state: ProjectedState,
    /// The store may hold events this process has not seen.
    stale: bool,
}

/// One tenant's ledger session.
pub struct TenantLedger {
    tenant_id: String,
    store: Arc<dyn EventStore>,
    inner: RwLock<Inner>,
}

impl std::fmt::Debug for TenantLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TenantLedger")
            .field("tenant_id", &self.tenant_id)
            .finish_non_exhaustive()
    }
}

impl TenantLedger {
    // =========================================================================
    // Opening
    // =========================================================================

    /// Loads the tenant's history from `store` and projects it.
    ///
    /// ## Errors
    /// * `Persistence` - the store could not be read
    /// * `Core(CorruptLog)` - the stored history does not replay
    pub async fn open(tenant_id: impl Into<String>, store: Arc<dyn EventStore>) -> LedgerResult<Self> {
        let tenant_id = tenant_id.into();
        if tenant_id.trim().is_empty() {
            return Err(LedgerError::Config("tenant_id must not be empty".into()));
        }

        let events = store.list_events(&tenant_id, None).await?;
        let log = EventLog::from_events(events)?;
        let state = project(&log)?;

        info!(
            tenant_id = %tenant_id,
            events = log.len(),
            "Opened tenant ledger"
        );

        Ok(TenantLedger {
            tenant_id,
            store,
            inner: RwLock::new(Inner {
                log,
                state,
                stale: false,
            }),
        })
    }

    /// Opens the configured tenant on the configured SQLite database,
    /// verifying the projection when `verify_on_open` is set.
    pub async fn open_from_config(config: &LedgerConfig) -> LedgerResult<Self> {
        let db = Database::new(config.db_config()).await?;
        let ledger = Self::open(config.tenant_id(), Arc::new(db.events())).await?;

        if config.ledger.verify_on_open {
            ledger.verify().await?;
        }
        Ok(ledger)
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    // =========================================================================
    // Writing
    // =========================================================================

    /// Runs one command: validate, persist, then make visible.
    ///
    /// ## Returns
    /// Ids of the appended events (two for `AdjustVat`, one otherwise).
    pub async fn execute(&self, envelope: CommandEnvelope) -> LedgerResult<Vec<EventId>> {
        let mut inner = self.inner.write().await;

        if inner.stale {
            self.catch_up(&mut inner).await?;
        }

        let command = envelope.command.name();
        let drafts = match handle(&envelope, &inner.state) {
            Ok(drafts) => drafts,
            Err(err) => {
                warn!(
                    tenant_id = %self.tenant_id,
                    command,
                    error = %err,
                    "Command rejected"
                );
                return Err(err.into());
            }
        };

        let events = inner.log.stamp(drafts, Utc::now())?;
        let mut trial = inner.state.clone();
        for event in &events {
            trial.apply(event)?;
        }

        if let Err(err) = self.store.append_events(&self.tenant_id, &events).await {
            inner.stale = true;
            warn!(
                tenant_id = %self.tenant_id,
                command,
                error = %err,
                "Append failed; ledger marked stale"
            );
            return Err(err.into());
        }

        let ids: Vec<EventId> = events.iter().map(|e| e.id).collect();
        inner.log.extend(events)?;
        inner.state = trial;

        info!(
            tenant_id = %self.tenant_id,
            command,
            first = %ids[0],
            count = ids.len(),
            "Command applied"
        );
        Ok(ids)
    }

    /// Reverses an earlier event with a compensating `EventReversed`.
    pub async fn reverse(
        &self,
        business_date: NaiveDate,
        event_id: EventId,
        reason: impl Into<String>,
    ) -> LedgerResult<EventId> {
        let ids = self
            .execute(CommandEnvelope::new(
                business_date,
                Command::ReverseEvent {
                    event_id,
                    reason: reason.into(),
                },
            ))
            .await?;
        info!(tenant_id = %self.tenant_id, target = %event_id, reversal = %ids[0], "Event reversed");
        Ok(ids[0])
    }

    /// Pulls events the store has but this session has not applied.
    async fn catch_up(&self, inner: &mut Inner) -> LedgerResult<()> {
        let missing = self
            .store
            .list_events(&self.tenant_id, inner.log.last_id())
            .await?;

        let mut trial = inner.state.clone();
        for event in &missing {
            trial.apply(event)?;
        }

        debug!(
            tenant_id = %self.tenant_id,
            recovered = missing.len(),
            "Caught up with store"
        );
        inner.log.extend(missing)?;
        inner.state = trial;
        inner.stale = false;
        Ok(())
    }

    // =========================================================================
    // Reading
    // =========================================================================

    /// A consistent copy of the projection.
    pub async fn snapshot(&self) -> ProjectedState {
        self.inner.read().await.state.clone()
    }

    /// A consistent copy of the user-facing views.
    pub async fn views(&self) -> LedgerViews {
        self.inner.read().await.state.views().clone()
    }

    /// Events after `after` (all when `None`), in log order.
    pub async fn events(&self, after: Option<EventId>) -> Vec<Event> {
        self.inner.read().await.log.events_after(after).to_vec()
    }

    pub async fn last_event_id(&self) -> Option<EventId> {
        self.inner.read().await.log.last_id()
    }

    /// Profit & loss, balance sheet and VAT summary as of a date.
    pub async fn report(&self, as_of: NaiveDate) -> FinancialReport {
        FinancialReport::from_views(self.inner.read().await.state.views(), as_of)
    }

    // =========================================================================
    // Integrity
    // =========================================================================

    /// Replays the stored history and checks it matches the live projection.
    ///
    /// ## Errors
    /// * `Core(CorruptLog)` - the store and the session disagree
    pub async fn verify(&self) -> LedgerResult<()> {
        let inner = self.inner.read().await;
        let stored = self.store.list_events(&self.tenant_id, None).await?;

        if stored.len() != inner.log.len() {
            warn!(
                tenant_id = %self.tenant_id,
                stored = stored.len(),
                in_memory = inner.log.len(),
                "Event count drift"
            );
            return Err(CoreError::CorruptLog(format!(
                "store holds {} events but the session has {}",
                stored.len(),
                inner.log.len()
            ))
            .into());
        }

        let replayed = project(&stored)?;
        if replayed != inner.state {
            warn!(tenant_id = %self.tenant_id, "Projection drift");
            return Err(CoreError::CorruptLog(
                "replaying the stored log gives a different projection".to_string(),
            )
            .into());
        }

        info!(tenant_id = %self.tenant_id, events = stored.len(), "Projection verified");
        Ok(())
    }

    /// Discards the session state and reloads everything from the store.
    pub async fn reload(&self) -> LedgerResult<()> {
        let mut inner = self.inner.write().await;
        let events = self.store.list_events(&self.tenant_id, None).await?;
        let log = EventLog::from_events(events)?;
        let state = project(&log)?;

        info!(tenant_id = %self.tenant_id, events = log.len(), "Reloaded tenant ledger");
        *inner = Inner {
            log,
            state,
            stale: false,
        };
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
