//! # Ledger Event Repository
//!
//! Append-only storage of per-tenant business events.
//!
//! ## Row Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ledger_events                                                          │
//! │                                                                         │
//! │  tenant_id │ sequence │ event_type     │ shop_id │ business_date │ ...  │
//! │  ──────────┼──────────┼────────────────┼─────────┼───────────────┼──    │
//! │  t-1       │    1     │ product_listed │ NULL    │ 2026-04-01    │      │
//! │  t-1       │    2     │ stock_received │ NULL    │ 2026-04-01    │      │
//! │  t-1       │    3     │ sale_recorded  │ kkoo    │ 2026-04-02    │      │
//! │  t-2       │    1     │ capital_contr… │ NULL    │ 2026-04-01    │      │
//! │                                                                         │
//! │  payload = serde_json of EventKind (tagged by "type")                  │
//! │  PRIMARY KEY (tenant_id, sequence); UPDATE/DELETE abort via triggers    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Append Protocol
//! A batch is written in ONE transaction. Inside it the stored tail is read
//! and the batch must start exactly one past it; otherwise the whole batch
//! is rejected with [`DbError::SequenceConflict`] and nothing is written.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use biashara_core::{Event, EventId, EventKind, ShopId};

/// Raw `ledger_events` row.
#[derive(Debug, FromRow)]
struct EventRow {
    tenant_id: String,
    sequence: i64,
    event_type: String,
    shop_id: Option<String>,
    business_date: NaiveDate,
    recorded_at: DateTime<Utc>,
    payload: String,
}

impl EventRow {
    fn corrupt(&self, message: impl Into<String>) -> DbError {
        DbError::CorruptRow {
            tenant: self.tenant_id.clone(),
            sequence: self.sequence,
            message: message.into(),
        }
    }

    fn into_event(self) -> DbResult<Event> {
        let sequence = u64::try_from(self.sequence)
            .map_err(|_| self.corrupt("negative sequence"))?;
        let kind: EventKind = serde_json::from_str(&self.payload)
            .map_err(|e| self.corrupt(format!("payload does not parse: {}", e)))?;
        if kind.name() != self.event_type {
            return Err(self.corrupt(format!(
                "event_type {} does not match payload {}",
                self.event_type,
                kind.name()
            )));
        }

        Ok(Event {
            id: EventId::new(sequence),
            business_date: self.business_date,
            recorded_at: self.recorded_at,
            shop_id: self.shop_id.map(ShopId::new),
            kind,
        })
    }
}

/// Repository for the append-only ledger event log.
#[derive(Debug, Clone)]
pub struct EventRepository {
    pool: SqlitePool,
}

impl EventRepository {
    /// Creates a new EventRepository.
    pub fn new(pool: SqlitePool) -> Self {
        EventRepository { pool }
    }

    /// Appends a batch of events for one tenant, all-or-nothing.
    ///
    /// ## Arguments
    /// * `tenant_id` - Tenant the events belong to
    /// * `events` - Events with ids already assigned, contiguous and
    ///   continuing the tenant's stored sequence
    ///
    /// ## Errors
    /// * `SequenceConflict` - batch does not continue the stored sequence
    /// * `Serialization` - a payload could not be encoded
    pub async fn append_events(&self, tenant_id: &str, events: &[Event]) -> DbResult<()> {
        let Some(first) = events.first() else {
            return Ok(());
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(DbError::transaction)?;

        let stored: Option<i64> =
            sqlx::query_scalar("SELECT MAX(sequence) FROM ledger_events WHERE tenant_id = ?")
                .bind(tenant_id)
                .fetch_one(&mut *tx)
                .await?;
        let expected = stored.unwrap_or(0) as u64 + 1;

        let mut next = expected;
        for event in events {
            if event.id.value() != next {
                warn!(
                    tenant_id = %tenant_id,
                    expected = next,
                    actual = event.id.value(),
                    "Rejected out-of-sequence append"
                );
                return Err(DbError::SequenceConflict {
                    tenant: tenant_id.to_string(),
                    expected: next,
                    actual: event.id.value(),
                });
            }

            let payload = serde_json::to_string(&event.kind)?;
            sqlx::query(
                r#"
                INSERT INTO ledger_events
                    (tenant_id, sequence, event_type, shop_id, business_date, recorded_at, payload)
                VALUES (?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(tenant_id)
            .bind(event.id.value() as i64)
            .bind(event.kind.name())
            .bind(event.shop_id.as_ref().map(|s| s.as_str()))
            .bind(event.business_date)
            .bind(event.recorded_at)
            .bind(&payload)
            .execute(&mut *tx)
            .await?;

            next += 1;
        }

        tx.commit()
            .await
            .map_err(DbError::transaction)?;

        info!(
            tenant_id = %tenant_id,
            first = %first.id,
            count = events.len(),
            "Appended ledger events"
        );
        Ok(())
    }

    /// Lists a tenant's events in sequence order.
    ///
    /// ## Arguments
    /// * `after` - Only events with a larger id; `None` reads from the start
    pub async fn list_events(&self, tenant_id: &str, after: Option<EventId>) -> DbResult<Vec<Event>> {
        let after = after.map(|id| id.value() as i64).unwrap_or(0);

        let rows: Vec<EventRow> = sqlx::query_as(
            r#"
            SELECT tenant_id, sequence, event_type, shop_id, business_date, recorded_at, payload
            FROM ledger_events
            WHERE tenant_id = ? AND sequence > ?
            ORDER BY sequence ASC
            "#,
        )
        .bind(tenant_id)
        .bind(after)
        .fetch_all(&self.pool)
        .await?;

        debug!(tenant_id = %tenant_id, count = rows.len(), "Loaded ledger events");

        rows.into_iter().map(EventRow::into_event).collect()
    }

    /// Fetches a single event by id.
    pub async fn get_event(&self, tenant_id: &str, id: EventId) -> DbResult<Event> {
        let row: Option<EventRow> = sqlx::query_as(
            r#"
            SELECT tenant_id, sequence, event_type, shop_id, business_date, recorded_at, payload
            FROM ledger_events
            WHERE tenant_id = ? AND sequence = ?
            "#,
        )
        .bind(tenant_id)
        .bind(id.value() as i64)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| DbError::not_found("Event", id.to_string()))?
            .into_event()
    }

    /// Returns the id of the tenant's newest stored event.
    pub async fn last_sequence(&self, tenant_id: &str) -> DbResult<Option<EventId>> {
        let last: Option<i64> =
            sqlx::query_scalar("SELECT MAX(sequence) FROM ledger_events WHERE tenant_id = ?")
                .bind(tenant_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(last.map(|seq| EventId::new(seq as u64)))
    }

    /// Counts a tenant's events of one type (e.g. `"sale_recorded"`).
    pub async fn count_by_type(&self, tenant_id: &str, event_type: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM ledger_events WHERE tenant_id = ? AND event_type = ?",
        )
        .bind(tenant_id)
        .bind(event_type)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Lists every tenant that has at least one event.
    pub async fn tenants(&self) -> DbResult<Vec<String>> {
        let tenants: Vec<String> =
            sqlx::query_scalar("SELECT DISTINCT tenant_id FROM ledger_events ORDER BY tenant_id")
                .fetch_all(&self.pool)
                .await?;

        Ok(tenants)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use biashara_core::{EventDraft, EventLog, Money, PaymentMethod, ProductId, Rate};

    const TENANT: &str = "tenant-a";

    async fn repo() -> EventRepository {
        Database::new(DbConfig::in_memory()).await.unwrap().events()
    }

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 4, 1).unwrap()
    }

    fn drafts() -> Vec<EventDraft> {
        vec![
            EventDraft::new(
                day(),
                None,
                EventKind::CapitalContributed {
                    contributor: "Owner".to_string(),
                    amount: Money::from_major(1_000_000),
                    method: PaymentMethod::Bank,
                },
            ),
            EventDraft::new(
                day(),
                Some(ShopId::new("kariakoo")),
                EventKind::ProductListed {
                    product_id: ProductId::new("mchele"),
                    name: "Mchele 1kg".to_string(),
                    selling_price: Money::from_major(3_000),
                    cost_price: Money::from_major(2_200),
                    vat_rate: Rate::from_bps(1800),
                },
            ),
        ]
    }

    fn stamped(log: &EventLog) -> Vec<Event> {
        log.stamp(drafts(), Utc::now()).unwrap()
    }

    #[tokio::test]
    async fn test_append_and_list_round_trip() {
        let repo = repo().await;
        let events = stamped(&EventLog::new());

        repo.append_events(TENANT, &events).await.unwrap();

        let loaded = repo.list_events(TENANT, None).await.unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].kind, events[0].kind);
        assert_eq!(loaded[1].shop_id, Some(ShopId::new("kariakoo")));
        assert_eq!(loaded[1].business_date, day());
        assert_eq!(repo.last_sequence(TENANT).await.unwrap(), Some(EventId::new(2)));
    }

    #[tokio::test]
    async fn test_list_after_and_get() {
        let repo = repo().await;
        repo.append_events(TENANT, &stamped(&EventLog::new()))
            .await
            .unwrap();

        let tail = repo.list_events(TENANT, Some(EventId::new(1))).await.unwrap();
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].id, EventId::new(2));

        let first = repo.get_event(TENANT, EventId::new(1)).await.unwrap();
        assert_eq!(first.kind.name(), "capital_contributed");
        assert!(matches!(
            repo.get_event(TENANT, EventId::new(9)).await,
            Err(DbError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_tenants_are_isolated() {
        let repo = repo().await;
        let events = stamped(&EventLog::new());
        repo.append_events(TENANT, &events).await.unwrap();
        repo.append_events("tenant-b", &events[..1]).await.unwrap();

        assert_eq!(repo.list_events(TENANT, None).await.unwrap().len(), 2);
        assert_eq!(repo.list_events("tenant-b", None).await.unwrap().len(), 1);
        assert_eq!(repo.last_sequence("tenant-c").await.unwrap(), None);
        assert_eq!(
            repo.tenants().await.unwrap(),
            vec![TENANT.to_string(), "tenant-b".to_string()]
        );
        assert_eq!(
            repo.count_by_type(TENANT, "product_listed").await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_out_of_sequence_batch_writes_nothing() {
        let repo = repo().await;
        let events = stamped(&EventLog::new());
        repo.append_events(TENANT, &events).await.unwrap();

        // Same ids again: the store already holds 1 and 2.
        let result = repo.append_events(TENANT, &events).await;
        assert!(matches!(
            result,
            Err(DbError::SequenceConflict { expected: 3, actual: 1, .. })
        ));

        // A gap in the middle of a batch rolls back the whole batch.
        let mut log = EventLog::new();
        log.extend(events).unwrap();
        let mut batch = stamped(&log);
        batch[1].id = EventId::new(7);
        assert!(repo.append_events(TENANT, &batch).await.is_err());
        assert_eq!(repo.last_sequence(TENANT).await.unwrap(), Some(EventId::new(2)));
    }

    #[tokio::test]
    async fn test_rows_cannot_be_updated_or_deleted() {
        let repo = repo().await;
        repo.append_events(TENANT, &stamped(&EventLog::new()))
            .await
            .unwrap();

        let update = sqlx::query("UPDATE ledger_events SET event_type = 'x' WHERE sequence = 1")
            .execute(&repo.pool)
            .await
            .map_err(DbError::from);
        assert!(matches!(update, Err(DbError::AppendOnly(_))));

        let delete = sqlx::query("DELETE FROM ledger_events WHERE tenant_id = ?")
            .bind(TENANT)
            .execute(&repo.pool)
            .await
            .map_err(DbError::from);
        assert!(matches!(delete, Err(DbError::AppendOnly(_))));

        assert_eq!(repo.list_events(TENANT, None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_mismatched_event_type_is_corrupt() {
        let repo = repo().await;
        sqlx::query(
            r#"
            INSERT INTO ledger_events
                (tenant_id, sequence, event_type, shop_id, business_date, recorded_at, payload)
            VALUES (?, 1, 'drawing_made', NULL, '2026-04-01', '2026-04-01T08:00:00Z', ?)
            "#,
        )
        .bind(TENANT)
        .bind(r#"{"type":"capital_contributed","contributor":"Owner","amount":100,"method":"bank"}"#)
        .execute(&repo.pool)
        .await
        .unwrap();

        assert!(matches!(
            repo.list_events(TENANT, None).await,
            Err(DbError::CorruptRow { sequence: 1, .. })
        ));
    }

    #[tokio::test]
    async fn test_empty_batch_is_a_no_op() {
        let repo = repo().await;
        repo.append_events(TENANT, &[]).await.unwrap();
        assert_eq!(repo.last_sequence(TENANT).await.unwrap(), None);
    }
}
