//! # Domain Types
//!
//! Core domain types of the quote lifecycle engine.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                          Domain Types                               │
//! │                                                                     │
//! │  ┌───────────────┐    ┌────────────────┐    ┌──────────────────┐    │
//! │  │    Quote      │1..n│  QuoteVersion  │1..n│    QuoteLine     │    │
//! │  │ ───────────── │───►│ ────────────── │───►│ ──────────────── │    │
//! │  │ id (UUID)     │    │ version_number │    │ position (dense) │    │
//! │  │ number        │    │ status         │    │ quantity (dec)   │    │
//! │  │ status        │    │ is_locked      │    │ unit_price_cents │    │
//! │  │ current ptr   │    │ cached totals  │    │ computed totals  │    │
//! │  └───────────────┘    └────────────────┘    └──────────────────┘    │
//! │                                                                     │
//! │  ┌───────────────┐    ┌────────────────┐    ┌──────────────────┐    │
//! │  │  PublicLink   │    │    Activity    │    │      PdfJob      │    │
//! │  │ token + PIN   │    │  append-only   │    │ externally driven│    │
//! │  └───────────────┘    └────────────────┘    └──────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for relations
//! - Business ID where it exists: the quote `number` is the human-facing,
//!   immutable, globally unique document identifier

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Status Enums
// =============================================================================

/// The status of a quote document.
///
/// State machine: `draft → sent → accepted | declined`; `accepted → sent`
/// only via "undo acceptance". `viewed` and `expired` are informational
/// states reachable through explicit updates; nothing expires automatically
/// in this engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum QuoteStatus {
    Draft,
    Sent,
    Viewed,
    Accepted,
    Declined,
    Expired,
}

impl QuoteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuoteStatus::Draft => "draft",
            QuoteStatus::Sent => "sent",
            QuoteStatus::Viewed => "viewed",
            QuoteStatus::Accepted => "accepted",
            QuoteStatus::Declined => "declined",
            QuoteStatus::Expired => "expired",
        }
    }
}

impl Default for QuoteStatus {
    fn default() -> Self {
        QuoteStatus::Draft
    }
}

/// The status of a quote version.
///
/// At most one non-deleted version per quote is `Current`; publishing a
/// version atomically demotes the previous current one to `Archived`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum VersionStatus {
    Draft,
    Current,
    Archived,
}

impl VersionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VersionStatus::Draft => "draft",
            VersionStatus::Current => "current",
            VersionStatus::Archived => "archived",
        }
    }
}

/// What a line represents. Text lines carry no pricing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum LineKind {
    Product,
    Service,
    Text,
}

/// How a quote was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum AcceptanceMode {
    Online,
    Paper,
}

impl AcceptanceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AcceptanceMode::Online => "online",
            AcceptanceMode::Paper => "paper",
        }
    }
}

/// Currency of a quote. The engine only does domain checks here; full
/// input validation belongs to the transport layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Eur,
    Usd,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Eur => "EUR",
            Currency::Usd => "USD",
        }
    }
}

impl Default for Currency {
    fn default() -> Self {
        Currency::Eur
    }
}

/// PDF render job status. The engine only manages these transitions; an
/// external renderer drives `processing → ready | failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "snake_case")]
pub enum PdfJobStatus {
    Pending,
    Processing,
    Ready,
    Failed,
}

/// Type of an audit trail record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Created,
    Updated,
    StatusChanged,
    Send,
    Accept,
    Decline,
    Deleted,
    Restored,
    VersionCreated,
    VersionPublished,
    VersionRejected,
    LinkEnabled,
    LinkRotated,
    LinkDisabled,
    PinVerified,
    PinFailed,
    PinLocked,
    PdfRequested,
}

// =============================================================================
// Quote
// =============================================================================

/// A quotation document.
///
/// The `number` is assigned once by the numbering service and is immutable
/// and globally unique. `current_version_id` points at the single version
/// with status `current` (transiently `None` during creation).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Quote {
    pub id: String,
    /// Human document number, e.g. `Q-2024-001`. Immutable once assigned.
    pub number: String,
    pub customer_name: String,
    pub title: String,
    pub summary: Option<String>,
    pub currency: Currency,
    pub status: QuoteStatus,
    pub valid_until: Option<NaiveDate>,
    /// Deposit percentage (0-100) requested up front, if any.
    pub deposit_pct: Option<Decimal>,
    pub current_version_id: Option<String>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub accepted_by_name: Option<String>,
    pub acceptance_mode: Option<AcceptanceMode>,
    /// Soft-delete marker. Deleted quotes stay addressable but are
    /// excluded from default listings.
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Quote Version
// =============================================================================

/// A revision of a quote's content.
///
/// Version numbers are append-only per quote: never reused, never
/// decreasing. `is_locked` is set once the owning quote is accepted and is
/// never cleared by the engine. The `*_cents` fields are cached derived
/// state, recomputed transactionally on every line mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteVersion {
    pub id: String,
    pub quote_id: String,
    pub version_number: i64,
    pub label: Option<String>,
    pub status: VersionStatus,
    pub is_locked: bool,
    /// Snapshot of the document metadata this revision was priced under.
    pub valid_until: Option<NaiveDate>,
    pub deposit_pct: Option<Decimal>,
    pub currency: Currency,
    pub lines_net_cents: i64,
    pub lines_tax_cents: i64,
    pub lines_gross_cents: i64,
    pub deposit_cents: i64,
    pub balance_cents: i64,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Quote Line
// =============================================================================

/// One priced item within a version.
///
/// Positions form a dense 1..N ordering among live lines of a version.
/// `net/tax/gross` are deterministic functions of `quantity`,
/// `unit_price_cents` and `tax_rate_pct` — never caller-supplied.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteLine {
    pub id: String,
    pub version_id: String,
    pub kind: LineKind,
    /// Optional catalog reference for product lines.
    pub product_id: Option<String>,
    pub label: String,
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit_price_cents: i64,
    /// Tax rate as a decimal percent (e.g. `20` = 20%).
    pub tax_rate_pct: Decimal,
    /// Stored for display; does not participate in totals.
    pub discount_pct: Option<Decimal>,
    pub position: i64,
    pub net_cents: i64,
    pub tax_cents: i64,
    pub gross_cents: i64,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Public Link
// =============================================================================

/// Token-addressed public access to one quote. At most one live link per
/// quote; rotating regenerates the token and resets the PIN failure state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicLink {
    pub id: String,
    pub quote_id: String,
    /// Opaque high-entropy token (32 random bytes, hex).
    pub token: String,
    /// Self-describing PIN hash string, if a PIN is configured.
    /// Never exposed to callers.
    #[serde(skip_serializing)]
    pub pin_hash: Option<String>,
    pub failed_attempts: i64,
    pub locked_until: Option<DateTime<Utc>>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Activity
// =============================================================================

/// Immutable audit record of a state-changing event. Append-only: never
/// updated, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: String,
    pub quote_id: String,
    pub version_id: Option<String>,
    pub activity_type: ActivityType,
    pub actor: String,
    pub metadata: Option<serde_json::Value>,
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// PDF Job
// =============================================================================

/// A render job record. The engine creates it and bookkeeps transitions;
/// rendering itself happens outside this workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfJob {
    pub id: String,
    pub quote_id: String,
    pub version_id: String,
    pub status: PdfJobStatus,
    pub file_url: Option<String>,
    pub error_code: Option<String>,
    pub error_message: Option<String>,
    pub attempts: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Branding Defaults
// =============================================================================

/// Defaults applied at quote creation. Stands in for the branding catalog,
/// which is managed outside this engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrandingDefaults {
    /// Prefix of document numbers, e.g. `Q` in `Q-2024-001`.
    pub number_prefix: String,
    /// Validity window applied when the caller does not set a date.
    pub default_validity_days: i64,
    /// Deposit percent applied when the caller does not set one.
    pub default_deposit_pct: Option<Decimal>,
}

impl Default for BrandingDefaults {
    fn default() -> Self {
        BrandingDefaults {
            number_prefix: "Q".to_string(),
            default_validity_days: 30,
            default_deposit_pct: None,
        }
    }
}

// =============================================================================
// Input DTOs
// =============================================================================

/// Input for creating a quote together with its version 1.
///
/// `valid_until` is tri-state: `None` applies the branding default,
/// `Some(None)` explicitly stores no validity date, `Some(Some(d))` uses
/// the given date.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewQuote {
    pub customer_name: String,
    pub title: String,
    pub summary: Option<String>,
    pub currency: Option<Currency>,
    pub valid_until: Option<Option<NaiveDate>>,
    pub deposit_pct: Option<Decimal>,
    pub lines: Vec<NewLine>,
}

/// Input for one line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewLine {
    pub kind: LineKind,
    pub product_id: Option<String>,
    pub label: String,
    pub description: Option<String>,
    pub quantity: Decimal,
    pub unit_price_cents: i64,
    pub tax_rate_pct: Decimal,
    pub discount_pct: Option<Decimal>,
    /// 1-based insert position; appended at the end when absent.
    pub position: Option<i64>,
}

/// Partial patch of quote metadata. `Option<Option<_>>` fields distinguish
/// "leave unchanged" (outer None) from "set to null" (inner None).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuotePatch {
    pub customer_name: Option<String>,
    pub title: Option<String>,
    pub summary: Option<Option<String>>,
    pub currency: Option<Currency>,
    pub status: Option<QuoteStatus>,
    pub valid_until: Option<Option<NaiveDate>>,
    pub deposit_pct: Option<Option<Decimal>>,
}

impl QuotePatch {
    /// True when no field is set. Empty patches are rejected.
    pub fn is_empty(&self) -> bool {
        self.customer_name.is_none()
            && self.title.is_none()
            && self.summary.is_none()
            && self.currency.is_none()
            && self.status.is_none()
            && self.valid_until.is_none()
            && self.deposit_pct.is_none()
    }
}

/// Partial patch of a line.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinePatch {
    pub label: Option<String>,
    pub description: Option<Option<String>>,
    pub quantity: Option<Decimal>,
    pub unit_price_cents: Option<i64>,
    pub tax_rate_pct: Option<Decimal>,
    pub discount_pct: Option<Option<Decimal>>,
}

impl LinePatch {
    pub fn is_empty(&self) -> bool {
        self.label.is_none()
            && self.description.is_none()
            && self.quantity.is_none()
            && self.unit_price_cents.is_none()
            && self.tax_rate_pct.is_none()
            && self.discount_pct.is_none()
    }

    /// True when the patch touches a field the totals depend on.
    /// Only then are line totals recomputed.
    pub fn affects_totals(&self) -> bool {
        self.quantity.is_some() || self.unit_price_cents.is_some() || self.tax_rate_pct.is_some()
    }
}

/// Listing filter. Soft-deleted quotes are always excluded.
#[derive(Debug, Clone, Default)]
pub struct QuoteListFilter {
    /// Match any of these statuses; empty means all.
    pub statuses: Vec<QuoteStatus>,
    /// Case-insensitive substring across number, title and customer name.
    pub search: Option<String>,
    pub created_from: Option<DateTime<Utc>>,
    pub created_to: Option<DateTime<Utc>>,
    /// 1-100, default 50.
    pub limit: Option<i64>,
    /// >= 0, default 0.
    pub offset: Option<i64>,
}

/// What a customer sees through a public link.
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuoteView {
    pub quote: Quote,
    pub version: QuoteVersion,
    pub lines: Vec<QuoteLine>,
}

// =============================================================================
// Unit Tests
// =============================================================================
