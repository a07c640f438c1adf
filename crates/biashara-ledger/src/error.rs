//! # Ledger Service Error Types
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Ledger Error Categories                             │
//! │                                                                         │
//! │  ┌─────────────────┐  ┌─────────────────┐  ┌─────────────────────────┐ │
//! │  │      Core       │  │   Persistence   │  │     Configuration       │ │
//! │  │                 │  │   (retryable)   │  │                         │ │
//! │  │  Validation     │  │                 │  │  unreadable ledger.toml │ │
//! │  │  Overpayment    │  │  DbError from   │  │  invalid values         │ │
//! │  │  NotFound ...   │  │  the EventStore │  │  save failures          │ │
//! │  └─────────────────┘  └─────────────────┘  └─────────────────────────┘ │
//! │                                                                         │
//! │  ┌─────────────────┐                                                    │
//! │  │       AI        │  completion service failed or returned output      │
//! │  │                 │  that does not match the flow's schema             │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A `Core` error means the command was rejected and nothing was written.
//! A `Persistence` error means nothing became visible; the same command may
//! be retried.

use thiserror::Error;

use biashara_core::{CoreError, ValidationError};
use biashara_db::DbError;

/// Result type alias for ledger service operations.
pub type LedgerResult<T> = Result<T, LedgerError>;

/// Ledger service error.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The command was rejected by the core.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The event store could not persist or load events.
    #[error("Persistence failed: {0}")]
    Persistence(#[from] DbError),

    /// Configuration could not be loaded, validated or saved.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An AI text flow failed.
    #[error("AI flow {flow} failed: {message}")]
    Ai { flow: String, message: String },
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<ValidationError> for LedgerError {
    fn from(err: ValidationError) -> Self {
        LedgerError::Core(err.into())
    }
}

impl From<std::io::Error> for LedgerError {
    fn from(err: std::io::Error) -> Self {
        LedgerError::Config(err.to_string())
    }
}

impl From<toml::de::Error> for LedgerError {
    fn from(err: toml::de::Error) -> Self {
        LedgerError::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for LedgerError {
    fn from(err: toml::ser::Error) -> Self {
        LedgerError::Config(err.to_string())
    }
}

// =============================================================================
// Error Categorization (for retry logic)
// =============================================================================

impl LedgerError {
    pub fn ai(flow: impl Into<String>, message: impl Into<String>) -> Self {
        LedgerError::Ai {
            flow: flow.into(),
            message: message.into(),
        }
    }

    /// Returns true if the operation can be retried unchanged.
    ///
    /// Only transient persistence failures qualify (lock contention, a lost
    /// connection, an exhausted pool, a stale sequence). A rejected command
    /// or a corrupt log fails again with the same input.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LedgerError::Persistence(e) if e.is_transient())
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(self, LedgerError::Config(_))
    }

    /// The core rejection, if this is one.
    pub fn as_core(&self) -> Option<&CoreError> {
        match self {
            LedgerError::Core(err) => Some(err),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use biashara_core::EventId;

    #[test]
    fn test_only_transient_persistence_is_retryable() {
        assert!(LedgerError::from(DbError::PoolExhausted).is_retryable());
        assert!(LedgerError::from(DbError::ConnectionFailed("disk".into())).is_retryable());
        assert!(LedgerError::from(DbError::Busy("database is locked".into())).is_retryable());

        assert!(!LedgerError::from(DbError::Serialization("bad json".into())).is_retryable());
        assert!(!LedgerError::from(DbError::AppendOnly("no updates".into())).is_retryable());
        assert!(!LedgerError::from(DbError::CorruptRow {
            tenant: "t-1".into(),
            sequence: 7,
            message: "unknown event type".into(),
        })
        .is_retryable());

        assert!(!LedgerError::from(CoreError::AlreadyReversed(EventId::new(3))).is_retryable());
        assert!(!LedgerError::Config("bad".into()).is_retryable());
        assert!(!LedgerError::ai("translation", "timeout").is_retryable());
    }

    #[test]
    fn test_validation_lifts_into_core() {
        let err = LedgerError::from(ValidationError::Required {
            field: "customer".to_string(),
        });
        assert!(matches!(
            err.as_core(),
            Some(CoreError::Validation(ValidationError::Required { .. }))
        ));
    }

    #[test]
    fn test_error_display() {
        let err = LedgerError::ai("report_generation", "empty summary");
        assert_eq!(
            err.to_string(),
            "AI flow report_generation failed: empty summary"
        );
        assert!(LedgerError::Config("x".into()).is_config_error());
    }
}
