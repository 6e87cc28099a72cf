//! # quoteflow-core: Pure Business Logic for the Quote Lifecycle Engine
//!
//! This crate is the **heart** of Quoteflow. It contains the rules that make
//! a quotation document correct, as pure functions with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       Quoteflow Architecture                        │
//! │                                                                     │
//! │  ┌───────────────────────────────────────────────────────────────┐  │
//! │  │          Transport layer (HTTP/CLI, out of scope)             │  │
//! │  └──────────────────────────────┬────────────────────────────────┘  │
//! │                                 │                                   │
//! │  ┌──────────────────────────────▼────────────────────────────────┐  │
//! │  │              quoteflow-db (lifecycle engine)                  │  │
//! │  │   One transaction per operation, repositories, numbering      │  │
//! │  └──────────────────────────────┬────────────────────────────────┘  │
//! │                                 │                                   │
//! │  ┌──────────────────────────────▼────────────────────────────────┐  │
//! │  │             ★ quoteflow-core (THIS CRATE) ★                   │  │
//! │  │                                                               │  │
//! │  │  ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐ ┌─────────┐  │  │
//! │  │  │  types  │ │ totals  │ │  diff   │ │   pin   │ │validate │  │  │
//! │  │  │ Quote   │ │ rounding│ │ meta +  │ │ argon2  │ │ domain  │  │  │
//! │  │  │ Version │ │ cents   │ │ lines   │ │ hashing │ │ checks  │  │  │
//! │  │  └─────────┘ └─────────┘ └─────────┘ └─────────┘ └─────────┘  │  │
//! │  │                                                               │  │
//! │  │   NO I/O • NO DATABASE • NO NETWORK                           │  │
//! │  └───────────────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Quote, QuoteVersion, QuoteLine, ...)
//! - [`totals`] - Monetary totals in integer cents (no floating point!)
//! - [`diff`] - Structural delta between two quote versions
//! - [`pin`] - Salted PIN hashing for public links
//! - [`error`] - Domain error taxonomy with machine-readable codes
//! - [`validation`] - Domain-level input checks
//!
//! ## Design Principles
//!
//! 1. **Integer Money**: every monetary value is cents (i64); fractions
//!    exist only for quantities and percentages, as exact decimals
//! 2. **Explicit Errors**: all errors are typed, never strings or panics
//! 3. **Derived state stays derived**: cached totals are always a function
//!    of line fields, never trusted from a caller

// =============================================================================
// Module Declarations
// =============================================================================

pub mod diff;
pub mod error;
pub mod pin;
pub mod totals;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use diff::{LineChange, LineChangeKind, MetaChange, VersionDiff};
pub use error::{CoreError, CoreResult, ValidationError};
pub use totals::{LineTotals, VersionTotals};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum number of live (non-deleted) versions a quote may carry.
///
/// ## Business Reason
/// Keeps the revision history reviewable by a customer; beyond this,
/// version creation fails with `version_limit_reached`.
pub const MAX_LIVE_VERSIONS: i64 = 5;

/// Consecutive PIN failures that trigger a lockout on a public link.
pub const PIN_MAX_ATTEMPTS: i64 = 5;

/// Duration of the PIN lockout window, in minutes.
pub const PIN_LOCKOUT_MINUTES: i64 = 15;

/// Width the yearly sequence is zero-padded to in document numbers.
/// Sequences beyond 999 simply grow wider; the width is a floor, not a cap.
pub const NUMBER_SEQ_PAD: usize = 3;
