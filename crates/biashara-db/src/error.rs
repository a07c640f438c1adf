//! # Database Error Types
//!
//! Error types for event store operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)          serde_json::Error                 │
//! │       │                                    │                            │
//! │       ▼                                    ▼                            │
//! │  DbError (this module) ← Adds context and categorization               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  LedgerError::Persistence (biashara-ledger)                            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  is_transient()?  yes → "could not save, try again"                    │
//! │                   no  → operator attention (corrupt row, migration)    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

/// Database operation errors.
///
/// These errors wrap sqlx errors and provide additional context
/// for debugging and user feedback.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Two writers appending the same `(tenant_id, sequence)`
    /// - Any other UNIQUE/PRIMARY KEY violation
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// The batch does not continue the tenant's stored sequence.
    ///
    /// ## When This Occurs
    /// - Another process appended for the same tenant
    /// - The in-memory log is behind the store
    #[error("Sequence conflict for tenant {tenant}: expected {expected}, got {actual}")]
    SequenceConflict {
        tenant: String,
        expected: u64,
        actual: u64,
    },

    /// An UPDATE or DELETE hit the append-only triggers.
    #[error("Ledger events are append-only: {0}")]
    AppendOnly(String),

    /// A stored row could not be turned back into an event.
    #[error("Corrupt row for tenant {tenant} at sequence {sequence}: {message}")]
    CorruptRow {
        tenant: String,
        sequence: i64,
        message: String,
    },

    /// Event payload (de)serialization failed.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file doesn't exist and can't be created
    /// - File permissions issue
    /// - Disk full
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// SQLite reported the database busy or locked by another writer.
    #[error("Database busy: {0}")]
    Busy(String),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Begin/commit failures. Lock contention stays `Busy`.
    pub(crate) fn transaction(err: sqlx::Error) -> Self {
        match DbError::from(err) {
            busy @ DbError::Busy(_) => busy,
            other => DbError::TransactionFailed(other.to_string()),
        }
    }

    /// Whether the same operation may succeed if simply tried again.
    ///
    /// ```text
    /// ConnectionFailed, PoolExhausted, Busy   → contention or a lost link
    /// SequenceConflict                        → reload the tail, then retry
    /// everything else                         → retrying cannot help
    /// ```
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            DbError::ConnectionFailed(_)
                | DbError::PoolExhausted
                | DbError::Busy(_)
                | DbError::SequenceConflict { .. }
        )
    }
}

/// SQLITE_BUSY (5) and SQLITE_LOCKED (6), including extended codes.
fn is_busy_code(code: &str) -> bool {
    code.parse::<i32>()
        .map(|code| matches!(code & 0xff, 5 | 6))
        .unwrap_or(false)
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Busy for lock codes, else analyze message
///                               for constraint/trigger type
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                if db_err.code().is_some_and(|code| is_busy_code(&code))
                    || msg.contains("database is locked")
                {
                    return DbError::Busy(msg.to_string());
                }

                // SQLite reports PRIMARY KEY violations as UNIQUE failures:
                // "UNIQUE constraint failed: ledger_events.tenant_id, ledger_events.sequence"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation {
                        field,
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("append-only") {
                    DbError::AppendOnly(msg.to_string())
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<serde_json::Error> for DbError {
    fn from(err: serde_json::Error) -> Self {
        DbError::Serialization(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors() {
        assert!(DbError::PoolExhausted.is_transient());
        assert!(DbError::Busy("database is locked".into()).is_transient());
        assert!(DbError::ConnectionFailed("Pool is closed".into()).is_transient());
        assert!(DbError::SequenceConflict {
            tenant: "t-1".into(),
            expected: 4,
            actual: 2,
        }
        .is_transient());

        assert!(!DbError::Serialization("bad payload".into()).is_transient());
        assert!(!DbError::AppendOnly("ledger_events is append-only".into()).is_transient());
        assert!(!DbError::MigrationFailed("checksum".into()).is_transient());
        assert!(!DbError::CorruptRow {
            tenant: "t-1".into(),
            sequence: 3,
            message: "unknown event type".into(),
        }
        .is_transient());
    }

    #[test]
    fn test_busy_codes() {
        assert!(is_busy_code("5"));
        assert!(is_busy_code("517")); // SQLITE_BUSY_SNAPSHOT
        assert!(is_busy_code("6"));
        assert!(!is_busy_code("19")); // SQLITE_CONSTRAINT
        assert!(!is_busy_code("1811"));
        assert!(!is_busy_code("not-a-code"));
    }

    #[test]
    fn test_pool_errors_map_to_categories() {
        assert!(matches!(
            DbError::from(sqlx::Error::PoolTimedOut),
            DbError::PoolExhausted
        ));
        assert!(matches!(
            DbError::transaction(sqlx::Error::PoolClosed),
            DbError::TransactionFailed(_)
        ));
    }
}
