//! # Event Store Seam
//!
//! The persistence collaborator the [`TenantLedger`](crate::TenantLedger)
//! writes through.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         dyn EventStore                                  │
//! │                                                                         │
//! │   append_events(tenant, &[Event])      all-or-nothing, in sequence     │
//! │   list_events(tenant, after?)          ordered by EventId              │
//! │                                                                         │
//! │        ┌──────────────────────┐        ┌──────────────────────────┐    │
//! │        │  EventRepository     │        │  InMemoryEventStore      │    │
//! │        │  (biashara-db)       │        │  tests, ephemeral        │    │
//! │        │  SQLite transaction  │        │  sessions; can inject    │    │
//! │        │                      │        │  failures                │    │
//! │        └──────────────────────┘        └──────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use biashara_core::{Event, EventId};
use biashara_db::{DbError, DbResult, EventRepository};

/// Append-only, per-tenant event persistence.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Persists a contiguous batch continuing the tenant's sequence.
    /// Either every event is stored or none is.
    async fn append_events(&self, tenant_id: &str, events: &[Event]) -> DbResult<()>;

    /// Returns the tenant's events with ids greater than `after`, in order.
    async fn list_events(&self, tenant_id: &str, after: Option<EventId>) -> DbResult<Vec<Event>>;
}

#[async_trait]
impl EventStore for EventRepository {
    async fn append_events(&self, tenant_id: &str, events: &[Event]) -> DbResult<()> {
        EventRepository::append_events(self, tenant_id, events).await
    }

    async fn list_events(&self, tenant_id: &str, after: Option<EventId>) -> DbResult<Vec<Event>> {
        EventRepository::list_events(self, tenant_id, after).await
    }
}

#[async_trait]
impl<S: EventStore + ?Sized> EventStore for Arc<S> {
    async fn append_events(&self, tenant_id: &str, events: &[Event]) -> DbResult<()> {
        (**self).append_events(tenant_id, events).await
    }

    async fn list_events(&self, tenant_id: &str, after: Option<EventId>) -> DbResult<Vec<Event>> {
        (**self).list_events(tenant_id, after).await
    }
}

// =============================================================================
// In-Memory Store
// =============================================================================

/// How the next appends should fail.
#[derive(Debug, Default)]
struct Faults {
    /// Reject without storing.
    reject: usize,
    /// Store, then report failure (a lost acknowledgement).
    lose_ack: usize,
}

#[derive(Debug, Default)]
struct MemoryInner {
    tenants: HashMap<String, Vec<Event>>,
    faults: Faults,
}

/// Event store held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryEventStore {
    inner: Mutex<MemoryInner>,
}

impl InMemoryEventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes the next `count` appends fail before anything is stored.
    pub async fn fail_next_appends(&self, count: usize) {
        self.inner.lock().await.faults.reject = count;
    }

    /// Makes the next `count` appends store their events but still
    /// return an error.
    pub async fn lose_next_acks(&self, count: usize) {
        self.inner.lock().await.faults.lose_ack = count;
    }

    /// Number of events stored for a tenant.
    pub async fn len(&self, tenant_id: &str) -> usize {
        self.inner
            .lock()
            .await
            .tenants
            .get(tenant_id)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append_events(&self, tenant_id: &str, events: &[Event]) -> DbResult<()> {
        let mut inner = self.inner.lock().await;

        if inner.faults.reject > 0 {
            inner.faults.reject -= 1;
            return Err(DbError::Busy("injected append failure".into()));
        }

        let stored = inner.tenants.entry(tenant_id.to_string()).or_default();
        let mut expected = stored.len() as u64 + 1;
        for event in events {
            if event.id.value() != expected {
                return Err(DbError::SequenceConflict {
                    tenant: tenant_id.to_string(),
                    expected,
                    actual: event.id.value(),
                });
            }
            expected += 1;
        }
        stored.extend_from_slice(events);

        if inner.faults.lose_ack > 0 {
            inner.faults.lose_ack -= 1;
            return Err(DbError::ConnectionFailed("injected lost acknowledgement".into()));
        }
        Ok(())
    }

    async fn list_events(&self, tenant_id: &str, after: Option<EventId>) -> DbResult<Vec<Event>> {
        let inner = self.inner.lock().await;
        let events = inner
            .tenants
            .get(tenant_id)
            .map(|events| {
                events
                    .iter()
                    .filter(|e| after.map_or(true, |after| e.id > after))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(events)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use biashara_core::{EventDraft, EventKind, EventLog, Money, PaymentMethod};
    use biashara_db::{Database, DbConfig};
    use chrono::{NaiveDate, Utc};

    fn events(count: usize) -> Vec<Event> {
        let day = NaiveDate::from_ymd_opt(2026, 4, 1).unwrap();
        let drafts = (0..count)
            .map(|i| {
                EventDraft::new(
                    day,
                    None,
                    EventKind::CapitalContributed {
                        contributor: format!("Partner {}", i + 1),
                        amount: Money::from_major(100_000),
                        method: PaymentMethod::Cash,
                    },
                )
            })
            .collect();
        EventLog::new().stamp(drafts, Utc::now()).unwrap()
    }

    async fn exercise(store: &dyn EventStore) {
        let batch = events(3);
        store.append_events("t-1", &batch).await.unwrap();
        assert!(matches!(
            store.append_events("t-1", &batch[..1]).await,
            Err(DbError::SequenceConflict { expected: 4, .. })
        ));

        let all = store.list_events("t-1", None).await.unwrap();
        assert_eq!(all.len(), 3);
        let tail = store.list_events("t-1", Some(EventId::new(2))).await.unwrap();
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].id, EventId::new(3));
        assert!(store.list_events("t-2", None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_memory_store_contract() {
        exercise(&InMemoryEventStore::new()).await;
    }

    #[tokio::test]
    async fn test_sqlite_store_contract() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        exercise(&db.events()).await;
    }

    #[tokio::test]
    async fn test_injected_faults() {
        let store = InMemoryEventStore::new();
        let batch = events(2);

        store.fail_next_appends(1).await;
        assert!(store.append_events("t-1", &batch).await.is_err());
        assert_eq!(store.len("t-1").await, 0);

        store.lose_next_acks(1).await;
        assert!(store.append_events("t-1", &batch).await.is_err());
        assert_eq!(store.len("t-1").await, 2);

        let shared: Arc<InMemoryEventStore> = Arc::new(store);
        assert_eq!(shared.list_events("t-1", None).await.unwrap().len(), 2);
    }
}
