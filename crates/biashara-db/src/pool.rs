//! # Event Store Database
//!
//! Opens the SQLite file that holds every tenant's ledger log and checks
//! that it is fit to be one.
//!
//! ## Open Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database::new(config)                              │
//! │                                                                         │
//! │  DbConfig { path, max_connections, busy_timeout }                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  connect options                                                       │
//! │    file      → WAL, synchronous FULL, busy_timeout, create if missing  │
//! │    :memory:  → one pinned connection (the data dies with it)           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  migrations ─► ledger_events + append-only triggers                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  verify_append_only() ── trigger missing? ──► MigrationFailed          │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database { pool } ─► events() ─► EventRepository                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Appends are the only writes this file ever sees, and each one is a short
//! transaction per tenant. Readers replaying a log run beside the writer under
//! WAL; a second writer waits up to `busy_timeout` and then surfaces
//! [`DbError::Busy`].

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::event::EventRepository;

const MEMORY_PATH: &str = ":memory:";

/// Triggers that make `ledger_events` reject UPDATE and DELETE.
const APPEND_ONLY_TRIGGERS: [&str; 2] = ["ledger_events_no_update", "ledger_events_no_delete"];

// =============================================================================
// Configuration
// =============================================================================

/// Where the event store lives and how many connections may share it.
///
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/biashara/ledger.db").max_connections(4);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite file, or `:memory:`.
    pub database_path: PathBuf,

    /// Pool size. Default: 5 (one appender plus readers).
    pub max_connections: u32,

    /// How long a writer waits on a locked file before giving up with
    /// [`DbError::Busy`]. Default: 5 seconds.
    pub busy_timeout: Duration,
}

impl DbConfig {
    /// File-backed store; the file is created on first open.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            busy_timeout: Duration::from_secs(5),
        }
    }

    /// Throwaway store for tests and demos.
    pub fn in_memory() -> Self {
        DbConfig::new(MEMORY_PATH)
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path == Path::new(MEMORY_PATH)
    }

    /// Connections the pool will actually open. An in-memory database exists
    /// only inside its one connection.
    pub fn pool_size(&self) -> u32 {
        if self.is_in_memory() {
            1
        } else {
            self.max_connections.max(1)
        }
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = if self.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&self.database_path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                // An acknowledged append must survive power loss.
                .synchronous(SqliteSynchronous::Full)
        };

        Ok(options
            .busy_timeout(self.busy_timeout)
            .foreign_keys(true))
    }
}

// =============================================================================
// Tenant Tails
// =============================================================================

/// Where one tenant's log currently ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantTail {
    pub tenant_id: String,
    pub last_sequence: u64,
    pub event_count: u64,
}

impl TenantTail {
    /// Sequences start at 1 and never skip, so a healthy log has exactly
    /// `last_sequence` rows.
    pub fn is_gapless(&self) -> bool {
        self.event_count == self.last_sequence
    }
}

// =============================================================================
// Database
// =============================================================================

/// Handle to the event store. Clones share one pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens (or creates) the store, migrates it and checks the append-only
    /// guard is in place.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            in_memory = config.is_in_memory(),
            "Opening event store"
        );

        let mut options = SqlitePoolOptions::new()
            .max_connections(config.pool_size())
            .acquire_timeout(config.busy_timeout);
        if config.is_in_memory() {
            options = options
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }

        let pool = options
            .connect_with(config.connect_options()?)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!(connections = config.pool_size(), "Event store pool created");

        let db = Database { pool };
        migrations::run_migrations(&db.pool).await?;
        db.verify_append_only().await?;

        Ok(db)
    }

    /// Fails unless both append-only triggers exist on `ledger_events`.
    pub async fn verify_append_only(&self) -> DbResult<()> {
        let present: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master \
             WHERE type = 'trigger' AND tbl_name = 'ledger_events'",
        )
        .fetch_all(&self.pool)
        .await?;

        for trigger in APPEND_ONLY_TRIGGERS {
            if !present.iter().any(|name| name == trigger) {
                warn!(trigger, "Append-only guard missing");
                return Err(DbError::MigrationFailed(format!(
                    "ledger_events is missing trigger {}",
                    trigger
                )));
            }
        }
        Ok(())
    }

    /// Every tenant's log end, ordered by tenant id.
    pub async fn tails(&self) -> DbResult<Vec<TenantTail>> {
        let rows: Vec<(String, i64, i64)> = sqlx::query_as(
            "SELECT tenant_id, MAX(sequence), COUNT(*) FROM ledger_events \
             GROUP BY tenant_id ORDER BY tenant_id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(tenant_id, last, count)| TenantTail {
                tenant_id,
                last_sequence: last.max(0) as u64,
                event_count: count.max(0) as u64,
            })
            .collect())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// The ledger event repository over this pool.
    pub fn events(&self) -> EventRepository {
        EventRepository::new(self.pool.clone())
    }

    /// Closes the pool; later queries fail with `ConnectionFailed`.
    pub async fn close(&self) {
        info!("Closing event store");
        self.pool.close().await;
    }

    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use biashara_core::{EventDraft, EventKind, EventLog, Money, PaymentMethod};
    use chrono::{NaiveDate, Utc};

    async fn memory() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn contributions(log: &EventLog, count: usize) -> Vec<biashara_core::Event> {
        let day = NaiveDate::from_ymd_opt(2026, 5, 4).unwrap();
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
        log.stamp(drafts, Utc::now()).unwrap()
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/tmp/biashara-test.db")
            .max_connections(8)
            .busy_timeout(Duration::from_millis(250));

        assert!(!config.is_in_memory());
        assert_eq!(config.pool_size(), 8);
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
        assert_eq!(DbConfig::new("x.db").max_connections(0).pool_size(), 1);
    }

    #[test]
    fn test_in_memory_is_pinned_to_one_connection() {
        let config = DbConfig::in_memory().max_connections(6);
        assert!(config.is_in_memory());
        assert_eq!(config.pool_size(), 1);
    }

    #[tokio::test]
    async fn test_open_installs_append_only_guard() {
        let db = memory().await;
        assert!(db.health_check().await);
        db.verify_append_only().await.unwrap();
        assert!(db.tails().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_trigger_is_detected() {
        let db = memory().await;
        sqlx::query("DROP TRIGGER ledger_events_no_delete")
            .execute(db.pool())
            .await
            .unwrap();

        match db.verify_append_only().await {
            Err(DbError::MigrationFailed(msg)) => assert!(msg.contains("ledger_events_no_delete")),
            other => panic!("expected MigrationFailed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_tails_track_each_tenant() {
        let db = memory().await;
        let repo = db.events();
        repo.append_events("duka-a", &contributions(&EventLog::new(), 3))
            .await
            .unwrap();
        repo.append_events("duka-b", &contributions(&EventLog::new(), 1))
            .await
            .unwrap();

        let tails = db.tails().await.unwrap();
        assert_eq!(
            tails,
            vec![
                TenantTail {
                    tenant_id: "duka-a".into(),
                    last_sequence: 3,
                    event_count: 3,
                },
                TenantTail {
                    tenant_id: "duka-b".into(),
                    last_sequence: 1,
                    event_count: 1,
                },
            ]
        );
        assert!(tails.iter().all(TenantTail::is_gapless));
    }

    #[tokio::test]
    async fn test_closed_store_is_unhealthy() {
        let db = memory().await;
        db.close().await;
        assert!(!db.health_check().await);
        assert!(matches!(
            db.tails().await,
            Err(DbError::ConnectionFailed(_))
        ));
    }
}
