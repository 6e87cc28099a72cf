//! # Row Mapping
//!
//! `FromRow` structs mirroring the SQLite schema, converted into the
//! domain types of quoteflow-core.
//!
//! Decimal columns (quantities, percentages) are stored as TEXT - SQLite
//! has no decimal affinity and floats would reintroduce the rounding
//! problems the totals engine exists to avoid. Conversion failures on
//! read are surfaced as internal errors: they mean the store holds data
//! the engine never wrote.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use quoteflow_core::types::{
    AcceptanceMode, Activity, ActivityType, Currency, LineKind, PdfJob, PdfJobStatus, PublicLink,
    Quote, QuoteLine, QuoteStatus, QuoteVersion, VersionStatus,
};
use rust_decimal::Decimal;

use crate::error::{DbError, DbResult};

pub(crate) fn parse_decimal(field: &str, raw: &str) -> DbResult<Decimal> {
    Decimal::from_str(raw)
        .map_err(|_| DbError::Internal(format!("stored {field} is not a decimal: '{raw}'")))
}

pub(crate) fn parse_decimal_opt(field: &str, raw: Option<String>) -> DbResult<Option<Decimal>> {
    raw.map(|value| parse_decimal(field, &value)).transpose()
}

// =============================================================================
// Quote
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct QuoteRow {
    pub id: String,
    pub number: String,
    pub customer_name: String,
    pub title: String,
    pub summary: Option<String>,
    pub currency: Currency,
    pub status: QuoteStatus,
    pub valid_until: Option<NaiveDate>,
    pub deposit_pct: Option<String>,
    pub current_version_id: Option<String>,
    pub accepted_at: Option<DateTime<Utc>>,
    pub accepted_by_name: Option<String>,
    pub acceptance_mode: Option<AcceptanceMode>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<QuoteRow> for Quote {
    type Error = DbError;

    fn try_from(row: QuoteRow) -> DbResult<Quote> {
        Ok(Quote {
            deposit_pct: parse_decimal_opt("quotes.deposit_pct", row.deposit_pct)?,
            id: row.id,
            number: row.number,
            customer_name: row.customer_name,
            title: row.title,
            summary: row.summary,
            currency: row.currency,
            status: row.status,
            valid_until: row.valid_until,
            current_version_id: row.current_version_id,
            accepted_at: row.accepted_at,
            accepted_by_name: row.accepted_by_name,
            acceptance_mode: row.acceptance_mode,
            deleted_at: row.deleted_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// =============================================================================
// Quote Version
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct VersionRow {
    pub id: String,
    pub quote_id: String,
    pub version_number: i64,
    pub label: Option<String>,
    pub status: VersionStatus,
    pub is_locked: bool,
    pub valid_until: Option<NaiveDate>,
    pub deposit_pct: Option<String>,
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

impl TryFrom<VersionRow> for QuoteVersion {
    type Error = DbError;

    fn try_from(row: VersionRow) -> DbResult<QuoteVersion> {
        Ok(QuoteVersion {
            deposit_pct: parse_decimal_opt("quote_versions.deposit_pct", row.deposit_pct)?,
            id: row.id,
            quote_id: row.quote_id,
            version_number: row.version_number,
            label: row.label,
            status: row.status,
            is_locked: row.is_locked,
            valid_until: row.valid_until,
            currency: row.currency,
            lines_net_cents: row.lines_net_cents,
            lines_tax_cents: row.lines_tax_cents,
            lines_gross_cents: row.lines_gross_cents,
            deposit_cents: row.deposit_cents,
            balance_cents: row.balance_cents,
            deleted_at: row.deleted_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// =============================================================================
// Quote Line
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct LineRow {
    pub id: String,
    pub version_id: String,
    pub kind: LineKind,
    pub product_id: Option<String>,
    pub label: String,
    pub description: Option<String>,
    pub quantity: String,
    pub unit_price_cents: i64,
    pub tax_rate_pct: String,
    pub discount_pct: Option<String>,
    pub position: i64,
    pub net_cents: i64,
    pub tax_cents: i64,
    pub gross_cents: i64,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<LineRow> for QuoteLine {
    type Error = DbError;

    fn try_from(row: LineRow) -> DbResult<QuoteLine> {
        Ok(QuoteLine {
            quantity: parse_decimal("quote_lines.quantity", &row.quantity)?,
            tax_rate_pct: parse_decimal("quote_lines.tax_rate_pct", &row.tax_rate_pct)?,
            discount_pct: parse_decimal_opt("quote_lines.discount_pct", row.discount_pct)?,
            id: row.id,
            version_id: row.version_id,
            kind: row.kind,
            product_id: row.product_id,
            label: row.label,
            description: row.description,
            unit_price_cents: row.unit_price_cents,
            position: row.position,
            net_cents: row.net_cents,
            tax_cents: row.tax_cents,
            gross_cents: row.gross_cents,
            deleted_at: row.deleted_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

// =============================================================================
// Public Link
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct LinkRow {
    pub id: String,
    pub quote_id: String,
    pub token: String,
    pub pin_hash: Option<String>,
    pub failed_attempts: i64,
    pub locked_until: Option<DateTime<Utc>>,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<LinkRow> for PublicLink {
    fn from(row: LinkRow) -> PublicLink {
        PublicLink {
            id: row.id,
            quote_id: row.quote_id,
            token: row.token,
            pin_hash: row.pin_hash,
            failed_attempts: row.failed_attempts,
            locked_until: row.locked_until,
            enabled: row.enabled,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

// =============================================================================
// Activity
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct ActivityRow {
    pub id: String,
    pub quote_id: String,
    pub version_id: Option<String>,
    pub activity_type: ActivityType,
    pub actor: String,
    pub metadata: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ActivityRow> for Activity {
    type Error = DbError;

    fn try_from(row: ActivityRow) -> DbResult<Activity> {
        let metadata = row
            .metadata
            .map(|raw| {
                serde_json::from_str(&raw)
                    .map_err(|e| DbError::Internal(format!("stored activity metadata: {e}")))
            })
            .transpose()?;

        Ok(Activity {
            id: row.id,
            quote_id: row.quote_id,
            version_id: row.version_id,
            activity_type: row.activity_type,
            actor: row.actor,
            metadata,
            created_at: row.created_at,
        })
    }
}

// =============================================================================
// PDF Job
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PdfJobRow {
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

impl From<PdfJobRow> for PdfJob {
    fn from(row: PdfJobRow) -> PdfJob {
        PdfJob {
            id: row.id,
            quote_id: row.quote_id,
            version_id: row.version_id,
            status: row.status,
            file_url: row.file_url,
            error_code: row.error_code,
            error_message: row.error_message,
            attempts: row.attempts,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}
