//! # Error Types
//!
//! Domain-specific error types for quoteflow-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          Error Types                                │
//! │                                                                     │
//! │  quoteflow-core errors (this file)                                  │
//! │  ├── CoreError        - Domain rule violations                      │
//! │  └── ValidationError  - Input validation failures                   │
//! │                                                                     │
//! │  quoteflow-db errors (separate crate)                               │
//! │  └── DbError          - Persistence failures, wraps CoreError       │
//! │                                                                     │
//! │  Flow: ValidationError → CoreError → DbError → transport layer      │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Every error carries a machine-readable code via [`CoreError::code`]
//! 3. Errors are enum variants, never String
//! 4. Security-sensitive errors (PIN flows) expose only remediation
//!    metadata — remaining attempts or unlock time, never hash material

use chrono::{DateTime, Utc};
use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Domain errors of the quote lifecycle engine.
///
/// Each variant maps onto one taxonomy kind: not_found, conflict,
/// forbidden, validation or internal. Raising one of these aborts the
/// enclosing transaction; no partial writes survive.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Quote absent or soft-deleted.
    #[error("Quote not found: {0}")]
    QuoteNotFound(String),

    /// Version absent or soft-deleted.
    #[error("Version not found: {0}")]
    VersionNotFound(String),

    /// Line absent or soft-deleted.
    #[error("Line not found: {0}")]
    LineNotFound(String),

    /// No live public link resolves to the given token or quote.
    #[error("Public link not found")]
    LinkNotFound,

    /// PDF job absent.
    #[error("PDF job not found: {0}")]
    PdfJobNotFound(String),

    /// The quote is already accepted; accepting again is refused and
    /// state is left unchanged.
    #[error("Quote {0} is already accepted")]
    AlreadyAccepted(String),

    /// Undo is only valid when the status is exactly `accepted`.
    #[error("Quote {quote_id} is {status}, acceptance cannot be undone")]
    AcceptanceUndoForbidden { quote_id: String, status: String },

    /// A quote may carry at most [`crate::MAX_LIVE_VERSIONS`] live versions.
    #[error("Quote {quote_id} already has {count} live versions")]
    VersionLimitReached { quote_id: String, count: i64 },

    /// Accepted quotes cannot gain new versions.
    #[error("Quote {0} is accepted, new versions are forbidden")]
    VersionCreationForbidden(String),

    /// The target version is locked (its quote was accepted).
    #[error("Version {0} is locked")]
    VersionLocked(String),

    /// Document number collision survived the bounded retry.
    #[error("Quote number collision on '{number}'")]
    NumberConflict { number: String },

    /// The quote has no current version to render.
    #[error("Quote {0} has no current version")]
    NoCurrentVersionForPdf(String),

    /// The link has a PIN and it has not been cleared for this caller.
    #[error("PIN verification required")]
    PinRequired,

    /// Wrong PIN, below the lockout threshold.
    #[error("Invalid PIN, {remaining_attempts} attempts remaining")]
    PinInvalid { remaining_attempts: i64 },

    /// Too many failures; the link is locked until `unlock_at`.
    #[error("PIN entry locked until {unlock_at}")]
    PinLocked { unlock_at: DateTime<Utc> },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// A persistence write returned no row where one was expected.
    /// Treated as a bug, not a recoverable condition.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Machine-readable error code surfaced to callers.
    pub fn code(&self) -> &'static str {
        match self {
            CoreError::QuoteNotFound(_) => "quote_not_found",
            CoreError::VersionNotFound(_) => "version_not_found",
            CoreError::LineNotFound(_) => "line_not_found",
            CoreError::LinkNotFound => "link_not_found",
            CoreError::PdfJobNotFound(_) => "pdf_job_not_found",
            CoreError::AlreadyAccepted(_) => "already_accepted",
            CoreError::AcceptanceUndoForbidden { .. } => "acceptance_undo_forbidden",
            CoreError::VersionLimitReached { .. } => "version_limit_reached",
            CoreError::VersionCreationForbidden(_) => "version_creation_forbidden",
            CoreError::VersionLocked(_) => "version_locked",
            CoreError::NumberConflict { .. } => "number_conflict",
            CoreError::NoCurrentVersionForPdf(_) => "no_current_version_for_pdf",
            CoreError::PinRequired => "pin_required",
            CoreError::PinInvalid { .. } => "pin_invalid",
            CoreError::PinLocked { .. } => "pin_locked",
            CoreError::Validation(_) => "validation",
            CoreError::Internal(_) => "internal",
        }
    }

    /// Taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::QuoteNotFound(_)
            | CoreError::VersionNotFound(_)
            | CoreError::LineNotFound(_)
            | CoreError::LinkNotFound
            | CoreError::PdfJobNotFound(_) => ErrorKind::NotFound,
            CoreError::AlreadyAccepted(_)
            | CoreError::AcceptanceUndoForbidden { .. }
            | CoreError::VersionLimitReached { .. }
            | CoreError::VersionCreationForbidden(_)
            | CoreError::VersionLocked(_)
            | CoreError::NumberConflict { .. }
            | CoreError::NoCurrentVersionForPdf(_) => ErrorKind::Conflict,
            CoreError::PinRequired | CoreError::PinInvalid { .. } | CoreError::PinLocked { .. } => {
                ErrorKind::Forbidden
            }
            CoreError::Validation(_) => ErrorKind::Validation,
            CoreError::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Coarse error taxonomy, one kind per transport-level outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Forbidden,
    Validation,
    Internal,
}

// =============================================================================
// Validation Error
// =============================================================================

/// Domain-level input validation errors.
///
/// The transport layer rejects malformed shapes before they get here;
/// these cover the checks the engine still owns.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, malformed decimal).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// An update patch with no fields set.
    #[error("update patch is empty")]
    EmptyPatch,
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
