//! # Database Error Types
//!
//! Error types for persistence operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                      Error Propagation                              │
//! │                                                                     │
//! │  SQLite Error (sqlx::Error)                                         │
//! │       │                                                             │
//! │       ▼                                                             │
//! │  DbError (this module) ← constraint detection + context             │
//! │       ▲                                                             │
//! │       │                                                             │
//! │  CoreError (domain rule violations, carried through unchanged       │
//! │  so transports keep the machine-readable code)                      │
//! │                                                                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Raising either side aborts the enclosing transaction; the numbering
//! collision is the only failure the engine retries on its own.

use quoteflow_core::error::{CoreError, ErrorKind, ValidationError};
use thiserror::Error;

/// Persistence-layer errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// A domain rule violation surfaced from quoteflow-core.
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Duplicate document number (racing counter resets)
    /// - Duplicate version number per quote
    /// - Duplicate live line position per version
    #[error("Duplicate {field}")]
    UniqueViolation { field: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// Database connection failed.
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Machine-readable code surfaced to callers. Domain errors keep
    /// their own codes; persistence failures collapse into the
    /// conflict/internal kinds of the taxonomy.
    pub fn code(&self) -> &'static str {
        match self {
            DbError::Domain(err) => err.code(),
            DbError::UniqueViolation { .. } | DbError::ForeignKeyViolation { .. } => "conflict",
            _ => "internal",
        }
    }

    /// Taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::Domain(err) => err.kind(),
            DbError::UniqueViolation { .. } | DbError::ForeignKeyViolation { .. } => {
                ErrorKind::Conflict
            }
            _ => ErrorKind::Internal,
        }
    }

    /// True when this is a unique violation on the given column path,
    /// e.g. `quotes.number`. Used by the numbering retry.
    pub(crate) fn is_unique_violation_on(&self, column: &str) -> bool {
        matches!(self, DbError::UniqueViolation { field } if field.contains(column))
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Domain(CoreError::Validation(err))
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::Database      → analyze message for constraint type
/// sqlx::Error::PoolTimedOut  → DbError::PoolExhausted
/// Other                      → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => {
                DbError::Internal("query returned no row where one was expected".to_string())
            }

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite constraint messages:
                // "UNIQUE constraint failed: <table>.<column>"
                // "FOREIGN KEY constraint failed"
                if msg.contains("UNIQUE constraint failed") {
                    let field = msg
                        .split("UNIQUE constraint failed: ")
                        .nth(1)
                        .unwrap_or("unknown")
                        .to_string();
                    DbError::UniqueViolation { field }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
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

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_errors_keep_their_codes() {
        let err: DbError = CoreError::AlreadyAccepted("q1".to_string()).into();
        assert_eq!(err.code(), "already_accepted");
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[test]
    fn test_unique_violation_matching() {
        let err = DbError::UniqueViolation {
            field: "quotes.number".to_string(),
        };
        assert!(err.is_unique_violation_on("quotes.number"));
        assert!(!err.is_unique_violation_on("public_links.token"));
        assert_eq!(err.code(), "conflict");
    }
}
