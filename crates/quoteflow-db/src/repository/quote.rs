//! # Quote Repository
//!
//! Create, patch, list and soft-delete quote documents.
//!
//! ## Quote Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        Quote Lifecycle                              │
//! │                                                                     │
//! │  1. CREATE                                                          │
//! │     └── create() → number reserved, quote + version 1 (current)     │
//! │         + lines inserted, totals cached, all in one transaction     │
//! │                                                                     │
//! │  2. EDIT                                                            │
//! │     └── update() → partial metadata patch                           │
//! │     └── line/version repositories → content revisions               │
//! │                                                                     │
//! │  3. SEND / ACCEPT / DECLINE                                         │
//! │     └── update(status) or the acceptance workflow                   │
//! │         (status → accepted locks all non-current versions)          │
//! │                                                                     │
//! │  4. (OPTIONAL) SOFT DELETE                                          │
//! │     └── soft_delete() → hidden from listings, restorable            │
//! │                                                                     │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{Datelike, Duration, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

use quoteflow_core::error::CoreError;
use quoteflow_core::totals::split_deposit;
use quoteflow_core::types::{
    ActivityType, BrandingDefaults, NewQuote, Quote, QuotePatch, QuoteListFilter, QuoteStatus,
    VersionStatus,
};
use quoteflow_core::validation::{
    validate_pagination, validate_percent, validate_required_text,
};

use crate::error::{DbError, DbResult};
use crate::numbering::reserve_quote_number;
use crate::repository::activity::{log_activity, ACTOR_ADMIN};
use crate::repository::line::{insert_line_at, validate_new_line};
use crate::repository::version::lock_non_current_versions;
use crate::rows::QuoteRow;

pub(crate) const QUOTE_COLUMNS: &str = "id, number, customer_name, title, summary, currency, \
     status, valid_until, deposit_pct, current_version_id, accepted_at, accepted_by_name, \
     acceptance_mode, deleted_at, created_at, updated_at";

/// Loads a non-deleted quote or fails with `quote_not_found`.
pub(crate) async fn fetch_live_quote(conn: &mut SqliteConnection, id: &str) -> DbResult<Quote> {
    let row: Option<QuoteRow> = sqlx::query_as(&format!(
        "SELECT {QUOTE_COLUMNS} FROM quotes WHERE id = ?1 AND deleted_at IS NULL"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;

    match row {
        Some(row) => Quote::try_from(row),
        None => Err(CoreError::QuoteNotFound(id.to_string()).into()),
    }
}

/// Repository for quote document operations.
#[derive(Debug, Clone)]
pub struct QuoteRepository {
    pool: SqlitePool,
}

impl QuoteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        QuoteRepository { pool }
    }

    /// Creates a quote together with its version 1 in one transaction.
    ///
    /// ## Branding Defaults
    /// - `valid_until`: today + `default_validity_days`, unless the caller
    ///   provided a date or explicitly nulled the field
    /// - `deposit_pct`: `default_deposit_pct` unless provided
    ///
    /// ## Numbering
    /// The document number comes from the per-year counter. If the final
    /// insert loses a number-uniqueness race (pathological concurrent
    /// counter reset), the whole reserve+insert cycle is retried once
    /// before `number_conflict` surfaces.
    pub async fn create(&self, input: NewQuote, branding: &BrandingDefaults) -> DbResult<Quote> {
        validate_required_text("customer_name", &input.customer_name)?;
        validate_required_text("title", &input.title)?;
        if let Some(pct) = input.deposit_pct {
            validate_percent("deposit_pct", pct)?;
        }
        for line in &input.lines {
            validate_new_line(line)?;
        }

        let mut last_err = None;
        for attempt in 1..=2 {
            match self.try_create(&input, branding).await {
                Ok(quote) => return Ok(quote),
                Err(err @ DbError::Domain(CoreError::NumberConflict { .. })) => {
                    warn!(attempt, "quote number collision, retrying reservation");
                    last_err = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_err.unwrap_or_else(|| DbError::Internal("number retry loop".to_string())))
    }

    async fn try_create(&self, input: &NewQuote, branding: &BrandingDefaults) -> DbResult<Quote> {
        let mut tx = self.pool.begin().await?;

        let now = Utc::now();
        let today = now.date_naive();
        let number = reserve_quote_number(&mut tx, &branding.number_prefix, today.year()).await?;

        let valid_until = match input.valid_until {
            // Explicitly provided, or explicitly nulled.
            Some(explicit) => explicit,
            None => Some(today + Duration::days(branding.default_validity_days)),
        };
        let deposit_pct = input.deposit_pct.or(branding.default_deposit_pct);
        let currency = input.currency.unwrap_or_default();

        let quote_id = Uuid::new_v4().to_string();
        let version_id = Uuid::new_v4().to_string();

        debug!(id = %quote_id, number = %number, "Creating quote");

        let inserted = sqlx::query(
            r#"
            INSERT INTO quotes (
                id, number, customer_name, title, summary, currency, status,
                valid_until, deposit_pct, current_version_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
            "#,
        )
        .bind(&quote_id)
        .bind(&number)
        .bind(&input.customer_name)
        .bind(&input.title)
        .bind(&input.summary)
        .bind(currency)
        .bind(QuoteStatus::Draft)
        .bind(valid_until)
        .bind(deposit_pct.map(|p| p.to_string()))
        .bind(&version_id)
        .bind(now)
        .execute(&mut *tx)
        .await;

        if let Err(err) = inserted {
            let err = DbError::from(err);
            if err.is_unique_violation_on("quotes.number") {
                return Err(CoreError::NumberConflict { number }.into());
            }
            return Err(err);
        }

        sqlx::query(
            r#"
            INSERT INTO quote_versions (
                id, quote_id, version_number, status, is_locked,
                valid_until, deposit_pct, currency, created_at, updated_at
            ) VALUES (?1, ?2, 1, ?3, 0, ?4, ?5, ?6, ?7, ?7)
            "#,
        )
        .bind(&version_id)
        .bind(&quote_id)
        .bind(VersionStatus::Current)
        .bind(valid_until)
        .bind(deposit_pct.map(|p| p.to_string()))
        .bind(currency)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let mut totals = quoteflow_core::totals::VersionTotals::default();
        for (index, line) in input.lines.iter().enumerate() {
            let line = insert_line_at(&mut tx, &version_id, line, index as i64 + 1).await?;
            totals.lines_net_cents += line.net_cents;
            totals.lines_tax_cents += line.tax_cents;
            totals.lines_gross_cents += line.gross_cents;
        }

        let (deposit_cents, balance_cents) = split_deposit(totals.lines_gross_cents, deposit_pct);
        sqlx::query(
            r#"
            UPDATE quote_versions SET
                lines_net_cents = ?2, lines_tax_cents = ?3, lines_gross_cents = ?4,
                deposit_cents = ?5, balance_cents = ?6, updated_at = ?7
            WHERE id = ?1
            "#,
        )
        .bind(&version_id)
        .bind(totals.lines_net_cents)
        .bind(totals.lines_tax_cents)
        .bind(totals.lines_gross_cents)
        .bind(deposit_cents)
        .bind(balance_cents)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        log_activity(
            &mut tx,
            &quote_id,
            Some(&version_id),
            ActivityType::Created,
            ACTOR_ADMIN,
            Some(serde_json::json!({ "number": number })),
        )
        .await?;

        let quote = fetch_live_quote(&mut tx, &quote_id).await?;
        tx.commit().await?;

        Ok(quote)
    }

    /// Gets a non-deleted quote by ID.
    pub async fn get(&self, id: &str) -> DbResult<Quote> {
        let mut conn = self.pool.acquire().await?;
        fetch_live_quote(&mut conn, id).await
    }

    /// Applies a partial metadata patch.
    ///
    /// ## Side Effects
    /// - Empty patches are rejected (`validation`)
    /// - A transition into `accepted` locks all non-current versions
    /// - A status patch out of `accepted` is refused (`already_accepted`);
    ///   only the acceptance workflow's undo leaves that status
    /// - Activities: `updated`, plus `status_changed` and the semantic
    ///   event (`send`/`accept`/`decline`) when the status moved
    pub async fn update(&self, id: &str, patch: QuotePatch) -> DbResult<Quote> {
        if patch.is_empty() {
            return Err(quoteflow_core::error::ValidationError::EmptyPatch.into());
        }
        if let Some(name) = &patch.customer_name {
            validate_required_text("customer_name", name)?;
        }
        if let Some(title) = &patch.title {
            validate_required_text("title", title)?;
        }
        if let Some(Some(pct)) = patch.deposit_pct {
            validate_percent("deposit_pct", pct)?;
        }

        let mut tx = self.pool.begin().await?;
        let mut quote = fetch_live_quote(&mut tx, id).await?;
        let old_status = quote.status;
        let now = Utc::now();

        // accepted → sent exists only as the acceptance workflow's undo,
        // which also clears the acceptance fields. A metadata patch never
        // moves a quote out of `accepted`.
        if old_status == QuoteStatus::Accepted {
            if let Some(status) = patch.status {
                if status != QuoteStatus::Accepted {
                    return Err(CoreError::AlreadyAccepted(quote.id).into());
                }
            }
        }

        let mut changed_fields = Vec::new();
        if let Some(name) = patch.customer_name {
            quote.customer_name = name;
            changed_fields.push("customer_name");
        }
        if let Some(title) = patch.title {
            quote.title = title;
            changed_fields.push("title");
        }
        if let Some(summary) = patch.summary {
            quote.summary = summary;
            changed_fields.push("summary");
        }
        if let Some(currency) = patch.currency {
            quote.currency = currency;
            changed_fields.push("currency");
        }
        if let Some(status) = patch.status {
            quote.status = status;
            changed_fields.push("status");
        }
        if let Some(valid_until) = patch.valid_until {
            quote.valid_until = valid_until;
            changed_fields.push("valid_until");
        }
        if let Some(deposit_pct) = patch.deposit_pct {
            quote.deposit_pct = deposit_pct;
            changed_fields.push("deposit_pct");
        }
        quote.updated_at = now;

        sqlx::query(
            r#"
            UPDATE quotes SET
                customer_name = ?2, title = ?3, summary = ?4, currency = ?5,
                status = ?6, valid_until = ?7, deposit_pct = ?8, updated_at = ?9
            WHERE id = ?1
            "#,
        )
        .bind(&quote.id)
        .bind(&quote.customer_name)
        .bind(&quote.title)
        .bind(&quote.summary)
        .bind(quote.currency)
        .bind(quote.status)
        .bind(quote.valid_until)
        .bind(quote.deposit_pct.map(|p| p.to_string()))
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let status_changed = quote.status != old_status;
        if status_changed && quote.status == QuoteStatus::Accepted {
            lock_non_current_versions(&mut tx, &quote.id).await?;
        }

        log_activity(
            &mut tx,
            &quote.id,
            None,
            ActivityType::Updated,
            ACTOR_ADMIN,
            Some(serde_json::json!({ "fields": changed_fields })),
        )
        .await?;

        if status_changed {
            log_activity(
                &mut tx,
                &quote.id,
                None,
                ActivityType::StatusChanged,
                ACTOR_ADMIN,
                Some(serde_json::json!({
                    "from": old_status.as_str(),
                    "to": quote.status.as_str(),
                })),
            )
            .await?;

            let semantic = match quote.status {
                QuoteStatus::Sent => Some(ActivityType::Send),
                QuoteStatus::Accepted => Some(ActivityType::Accept),
                QuoteStatus::Declined => Some(ActivityType::Decline),
                _ => None,
            };
            if let Some(activity_type) = semantic {
                log_activity(&mut tx, &quote.id, None, activity_type, ACTOR_ADMIN, None).await?;
            }
        }

        tx.commit().await?;
        Ok(quote)
    }

    /// Soft-deletes a quote. Versions and lines stay addressable; the
    /// quote disappears from default listings.
    pub async fn soft_delete(&self, id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let result =
            sqlx::query("UPDATE quotes SET deleted_at = ?2, updated_at = ?2 WHERE id = ?1 AND deleted_at IS NULL")
                .bind(id)
                .bind(now)
                .execute(&mut *tx)
                .await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::QuoteNotFound(id.to_string()).into());
        }

        log_activity(&mut tx, id, None, ActivityType::Deleted, ACTOR_ADMIN, None).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Restores a soft-deleted quote.
    pub async fn restore(&self, id: &str) -> DbResult<Quote> {
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        let result = sqlx::query(
            "UPDATE quotes SET deleted_at = NULL, updated_at = ?2 WHERE id = ?1 AND deleted_at IS NOT NULL",
        )
        .bind(id)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::QuoteNotFound(id.to_string()).into());
        }

        log_activity(&mut tx, id, None, ActivityType::Restored, ACTOR_ADMIN, None).await?;
        let quote = fetch_live_quote(&mut tx, id).await?;
        tx.commit().await?;
        Ok(quote)
    }

    /// Lists non-deleted quotes, newest first.
    ///
    /// ## Filters
    /// - `statuses`: any-of match; empty means all
    /// - `search`: case-insensitive substring over number/title/customer
    /// - `created_from`/`created_to`: creation-date range
    /// - pagination: limit 1-100 (default 50), offset >= 0
    pub async fn list(&self, filter: QuoteListFilter) -> DbResult<Vec<Quote>> {
        let (limit, offset) = validate_pagination(filter.limit, filter.offset)?;

        let mut qb: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "SELECT {QUOTE_COLUMNS} FROM quotes WHERE deleted_at IS NULL"
        ));

        if !filter.statuses.is_empty() {
            qb.push(" AND status IN (");
            let mut statuses = qb.separated(", ");
            for status in &filter.statuses {
                statuses.push_bind(*status);
            }
            qb.push(")");
        }

        if let Some(search) = filter
            .search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            // instr() is a literal substring match, so the needle is
            // lowercased but never wildcard-wrapped.
            let needle = search.to_lowercase();
            qb.push(" AND (instr(lower(number), ");
            qb.push_bind(needle.clone());
            qb.push(") > 0 OR instr(lower(title), ");
            qb.push_bind(needle.clone());
            qb.push(") > 0 OR instr(lower(customer_name), ");
            qb.push_bind(needle);
            qb.push(") > 0)");
        }

        if let Some(from) = filter.created_from {
            qb.push(" AND created_at >= ");
            qb.push_bind(from);
        }
        if let Some(to) = filter.created_to {
            qb.push(" AND created_at <= ");
            qb.push_bind(to);
        }

        qb.push(" ORDER BY created_at DESC, number DESC LIMIT ");
        qb.push_bind(limit);
        qb.push(" OFFSET ");
        qb.push_bind(offset);

        let rows: Vec<QuoteRow> = qb.build_query_as().fetch_all(&self.pool).await?;
        rows.into_iter().map(Quote::try_from).collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{branding, new_quote, service_line, test_db};
    use quoteflow_core::types::Currency;
    use rust_decimal::Decimal;

    #[tokio::test]
    async fn test_create_assigns_number_and_version_one() {
        let db = test_db().await;
        let mut input = new_quote("Website relaunch");
        input.lines = vec![service_line("Consulting", 999, "1.5", "20")];
        let quote = db.quotes().create(input, &branding()).await.unwrap();

        let year = Utc::now().year();
        assert_eq!(quote.number, format!("Q-{year}-001"));
        assert_eq!(quote.status, QuoteStatus::Draft);

        let version_id = quote.current_version_id.clone().unwrap();
        let version = db.versions().get(&version_id).await.unwrap();
        assert_eq!(version.version_number, 1);
        assert_eq!(version.status, VersionStatus::Current);

        // 999 × 1.5 at 20% → 1499 / 300 / 1799
        assert_eq!(version.lines_net_cents, 1499);
        assert_eq!(version.lines_tax_cents, 300);
        assert_eq!(version.lines_gross_cents, 1799);
        // 50% deposit, half away from zero.
        assert_eq!(version.deposit_cents, 900);
        assert_eq!(version.balance_cents, 899);

        let second = db
            .quotes()
            .create(new_quote("Second"), &branding())
            .await
            .unwrap();
        assert_eq!(second.number, format!("Q-{year}-002"));
    }

    #[tokio::test]
    async fn test_branding_defaults_apply_unless_overridden() {
        let db = test_db().await;

        let quote = db
            .quotes()
            .create(new_quote("Defaults"), &branding())
            .await
            .unwrap();
        let today = Utc::now().date_naive();
        assert_eq!(quote.valid_until, Some(today + Duration::days(30)));
        assert_eq!(quote.deposit_pct, Some(Decimal::from(50)));
        assert_eq!(quote.deposit_pct.unwrap().to_string(), "50");

        // Explicitly nulled validity stays null.
        let mut input = new_quote("Nulled");
        input.valid_until = Some(None);
        input.deposit_pct = Some(Decimal::from(10));
        let quote = db.quotes().create(input, &branding()).await.unwrap();
        assert_eq!(quote.valid_until, None);
        assert_eq!(quote.deposit_pct, Some(Decimal::from(10)));
    }

    #[tokio::test]
    async fn test_empty_patch_is_rejected() {
        let db = test_db().await;
        let quote = db
            .quotes()
            .create(new_quote("Patchable"), &branding())
            .await
            .unwrap();

        let err = db
            .quotes()
            .update(&quote.id, QuotePatch::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "validation");
    }

    #[tokio::test]
    async fn test_status_patch_to_accepted_locks_other_versions() {
        let db = test_db().await;
        let quote = db
            .quotes()
            .create(new_quote("Lockdown"), &branding())
            .await
            .unwrap();
        let draft = db.versions().create(&quote.id, None).await.unwrap();

        db.quotes()
            .update(
                &quote.id,
                QuotePatch {
                    status: Some(QuoteStatus::Accepted),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let draft = db.versions().get(&draft.id).await.unwrap();
        assert!(draft.is_locked);
        let current = db
            .versions()
            .get(quote.current_version_id.as_deref().unwrap())
            .await
            .unwrap();
        assert!(!current.is_locked);

        let activities = db.activities().list_for_quote(&quote.id).await.unwrap();
        let types: Vec<_> = activities.iter().map(|a| a.activity_type).collect();
        assert!(types.contains(&ActivityType::StatusChanged));
        assert!(types.contains(&ActivityType::Accept));
    }

    #[tokio::test]
    async fn test_status_patch_cannot_leave_accepted() {
        let db = test_db().await;
        let quote = db
            .quotes()
            .create(new_quote("Sealed"), &branding())
            .await
            .unwrap();
        db.acceptance()
            .accept_paper(&quote.id, None, Some("C. Signer"), None)
            .await
            .unwrap();

        for target in [QuoteStatus::Draft, QuoteStatus::Sent, QuoteStatus::Declined] {
            let err = db
                .quotes()
                .update(
                    &quote.id,
                    QuotePatch {
                        status: Some(target),
                        ..Default::default()
                    },
                )
                .await
                .unwrap_err();
            assert_eq!(err.code(), "already_accepted");
        }

        // The refusal leaves the row untouched.
        let quote = db.quotes().get(&quote.id).await.unwrap();
        assert_eq!(quote.status, QuoteStatus::Accepted);
        assert!(quote.accepted_at.is_some());
        assert_eq!(quote.accepted_by_name.as_deref(), Some("C. Signer"));

        // Non-status metadata stays editable on an accepted quote.
        let quote = db
            .quotes()
            .update(
                &quote.id,
                QuotePatch {
                    title: Some("Sealed, renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(quote.title, "Sealed, renamed");
        assert_eq!(quote.status, QuoteStatus::Accepted);

        // The workflow undo is the one legal way out.
        let reverted = db.acceptance().undo(&quote.id, None).await.unwrap();
        assert_eq!(reverted.status, QuoteStatus::Sent);
        assert_eq!(reverted.accepted_at, None);
    }

    #[tokio::test]
    async fn test_soft_delete_and_restore() {
        let db = test_db().await;
        let quote = db
            .quotes()
            .create(new_quote("Ephemeral"), &branding())
            .await
            .unwrap();

        db.quotes().soft_delete(&quote.id).await.unwrap();
        let err = db.quotes().get(&quote.id).await.unwrap_err();
        assert_eq!(err.code(), "quote_not_found");

        // Deleting again is not found either.
        let err = db.quotes().soft_delete(&quote.id).await.unwrap_err();
        assert_eq!(err.code(), "quote_not_found");

        let restored = db.quotes().restore(&quote.id).await.unwrap();
        assert_eq!(restored.id, quote.id);
        assert!(db.quotes().get(&quote.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_list_filters() {
        let db = test_db().await;

        let mut alpha = new_quote("Alpha build");
        alpha.customer_name = "ACME GmbH".to_string();
        let alpha = db.quotes().create(alpha, &branding()).await.unwrap();

        let mut beta = new_quote("Beta maintenance");
        beta.customer_name = "Borealis SA".to_string();
        beta.currency = Some(Currency::Usd);
        let beta = db.quotes().create(beta, &branding()).await.unwrap();

        db.quotes()
            .update(
                &beta.id,
                QuotePatch {
                    status: Some(QuoteStatus::Sent),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // Status filter.
        let sent = db
            .quotes()
            .list(QuoteListFilter {
                statuses: vec![QuoteStatus::Sent],
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].id, beta.id);

        // Case-insensitive substring over customer name.
        let acme = db
            .quotes()
            .list(QuoteListFilter {
                search: Some("acme".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(acme.len(), 1);
        assert_eq!(acme[0].id, alpha.id);

        // Matches in the middle of a field, not just prefixes.
        let tenance = db
            .quotes()
            .list(QuoteListFilter {
                search: Some("TENANCE".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(tenance.len(), 1);
        assert_eq!(tenance[0].id, beta.id);

        // Substring over the document number matches both.
        let year = Utc::now().year();
        let by_number = db
            .quotes()
            .list(QuoteListFilter {
                search: Some(format!("q-{year}")),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(by_number.len(), 2);

        // Soft-deleted quotes never appear.
        db.quotes().soft_delete(&alpha.id).await.unwrap();
        let all = db.quotes().list(QuoteListFilter::default()).await.unwrap();
        assert_eq!(all.len(), 1);

        // Pagination bounds are validated.
        let err = db
            .quotes()
            .list(QuoteListFilter {
                limit: Some(0),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.code(), "validation");
    }

    #[tokio::test]
    async fn test_create_writes_created_activity() {
        let db = test_db().await;
        let quote = db
            .quotes()
            .create(new_quote("Audited"), &branding())
            .await
            .unwrap();

        let activities = db.activities().list_for_quote(&quote.id).await.unwrap();
        assert_eq!(activities.len(), 1);
        assert_eq!(activities[0].activity_type, ActivityType::Created);
        assert_eq!(
            activities[0].metadata.as_ref().unwrap()["number"],
            serde_json::json!(quote.number)
        );
    }

    #[tokio::test]
    async fn test_lines_validated_on_create() {
        let db = test_db().await;
        let mut input = new_quote("Bad line");
        input.lines.push(service_line("zero qty", 100, "0", "20"));

        let err = db.quotes().create(input, &branding()).await.unwrap_err();
        assert_eq!(err.code(), "validation");
    }
}
