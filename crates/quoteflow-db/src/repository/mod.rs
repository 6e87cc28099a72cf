//! # Repository Module
//!
//! Database repository implementations for the quote lifecycle engine.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  Caller (admin API, public gateway, renderer)                           │
//! │       │                                                                 │
//! │       │  db.quotes().create(new_quote, &branding)                       │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  QuoteRepository                                                        │
//! │  ├── create(&self, new, branding)                                       │
//! │  ├── update(&self, id, patch)                                           │
//! │  ├── list(&self, filter)                                                │
//! │  └── soft_delete(&self, id)                                             │
//! │       │                                                                 │
//! │       │  SQL, one transaction per operation                             │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • Clean separation of concerns                                        │
//! │  • Easy to test (in-memory database per test)                          │
//! │  • SQL is isolated in one place                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`quote::QuoteRepository`] - Quote documents: create, patch, list,
//!   soft delete
//! - [`version::VersionRepository`] - Pricing revisions: create, publish,
//!   diff
//! - [`line::LineRepository`] - Line items with transactional totals
//! - [`acceptance::AcceptanceRepository`] - Online/paper acceptance, undo
//! - [`link::LinkRepository`] - Public tokens and the PIN gate
//! - [`activity::ActivityRepository`] - Read side of the audit trail
//! - [`pdf::PdfJobRepository`] - Render job records

pub mod acceptance;
pub mod activity;
pub mod line;
pub mod link;
pub mod pdf;
pub mod quote;
pub mod version;
