//! # quoteflow-db: Persistence Layer for the Quote Lifecycle Engine
//!
//! SQLite storage behind the quote engine, built on sqlx. The pure
//! business rules (totals, PIN hashing, diffing, validation) live in
//! `quoteflow-core`; this crate owns every read and write.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Quoteflow Data Flow                              │
//! │                                                                         │
//! │  Caller (admin API / public gateway / PDF renderer)                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   quoteflow-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (quote.rs...) │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │    │ QuoteRepo     │    │ 001_init.sql │  │   │
//! │  │   │ WAL, FK on    │◄───│ VersionRepo   │    │              │  │   │
//! │  │   │               │    │ LinkRepo ...  │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   numbering.rs: per-year document number counters               │   │
//! │  │   rows.rs:      FromRow structs → quoteflow-core domain types   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database (WAL)                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Concurrency Model
//!
//! One transaction per repository operation, no in-process locking.
//! Invariants that span rows are guarded by the schema itself:
//!
//! - document numbers: `UNIQUE (number)` plus an atomic counter upsert
//! - version numbers: `UNIQUE (quote_id, version_number)`
//! - line positions: partial `UNIQUE (version_id, position)` over live rows
//!
//! A lost race surfaces as a typed conflict error, never as corrupted
//! state.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use quoteflow_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("path/to/quotes.db")).await?;
//!
//! let quote = db.quotes().create(new_quote, &branding).await?;
//! let link = db.links().enable(&quote.id, Some("4711")).await?;
//! let view = db.links().submit_pin(&link.token, "4711").await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod numbering;
pub mod pool;
pub mod repository;

mod rows;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::acceptance::AcceptanceRepository;
pub use repository::activity::{ActivityRepository, ACTOR_ADMIN, ACTOR_PUBLIC};
pub use repository::line::LineRepository;
pub use repository::link::LinkRepository;
pub use repository::pdf::PdfJobRepository;
pub use repository::quote::QuoteRepository;
pub use repository::version::VersionRepository;

// =============================================================================
// Test Fixtures
// =============================================================================
