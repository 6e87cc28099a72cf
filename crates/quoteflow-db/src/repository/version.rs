//! # Version Repository
//!
//! Append-only pricing revisions of a quote.
//!
//! ## Version Rules
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                         Version Rules                               │
//! │                                                                     │
//! │  * at most 5 live (non-deleted) versions per quote                  │
//! │  * no new versions once the quote is accepted                       │
//! │  * version numbers are never reused, even after deletes             │
//! │  * exactly one current version after every publish                  │
//! │  * locked versions (is_locked) refuse publishing and line edits     │
//! │                                                                     │
//! │  Rejected creations still leave a version_rejected activity.        │
//! │  That record is written in its own transaction so it survives       │
//! │  the failure it documents.                                          │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use quoteflow_core::diff::{diff_versions, VersionDiff};
use quoteflow_core::error::CoreError;
use quoteflow_core::totals::{compute_line_totals, split_deposit};
use quoteflow_core::types::{
    ActivityType, QuoteStatus, QuoteVersion, VersionStatus,
};
use quoteflow_core::MAX_LIVE_VERSIONS;

use crate::error::DbResult;
use crate::repository::activity::{log_activity, ACTOR_ADMIN};
use crate::repository::line::fetch_live_lines;
use crate::repository::quote::fetch_live_quote;
use crate::rows::VersionRow;

pub(crate) const VERSION_COLUMNS: &str = "id, quote_id, version_number, label, status, \
     is_locked, valid_until, deposit_pct, currency, lines_net_cents, lines_tax_cents, \
     lines_gross_cents, deposit_cents, balance_cents, deleted_at, created_at, updated_at";

/// Loads a non-deleted version or fails with `version_not_found`.
pub(crate) async fn fetch_live_version(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<QuoteVersion> {
    let row: Option<VersionRow> = sqlx::query_as(&format!(
        "SELECT {VERSION_COLUMNS} FROM quote_versions WHERE id = ?1 AND deleted_at IS NULL"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;

    match row {
        Some(row) => QuoteVersion::try_from(row),
        None => Err(CoreError::VersionNotFound(id.to_string()).into()),
    }
}

/// Locks every live version of `quote_id` except the quote's current one.
/// Locking is irreversible; undoing an acceptance does not unlock.
pub(crate) async fn lock_non_current_versions(
    conn: &mut SqliteConnection,
    quote_id: &str,
) -> DbResult<()> {
    sqlx::query(
        r#"
        UPDATE quote_versions SET is_locked = 1, updated_at = ?2
        WHERE quote_id = ?1
          AND deleted_at IS NULL
          AND is_locked = 0
          AND id <> COALESCE((SELECT current_version_id FROM quotes WHERE id = ?1), '')
        "#,
    )
    .bind(quote_id)
    .bind(Utc::now())
    .execute(conn)
    .await?;

    Ok(())
}

/// Repository for version operations.
#[derive(Debug, Clone)]
pub struct VersionRepository {
    pool: SqlitePool,
}

impl VersionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        VersionRepository { pool }
    }

    /// Creates a new draft version, numbered MAX+1 over every version the
    /// quote ever had. With a `source_version_id` the source's live lines
    /// are deep-copied (fresh IDs, recomputed totals); without one the
    /// draft starts empty with the quote's metadata snapshot.
    ///
    /// Refused with `version_creation_forbidden` on accepted quotes and
    /// `version_limit_reached` at five live versions. Both refusals write
    /// a `version_rejected` activity that outlives the rollback.
    pub async fn create(
        &self,
        quote_id: &str,
        source_version_id: Option<&str>,
    ) -> DbResult<QuoteVersion> {
        let mut tx = self.pool.begin().await?;
        let quote = fetch_live_quote(&mut tx, quote_id).await?;

        if quote.status == QuoteStatus::Accepted {
            drop(tx);
            self.log_rejection(quote_id, "quote_accepted").await?;
            return Err(CoreError::VersionCreationForbidden(quote_id.to_string()).into());
        }

        let live_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM quote_versions WHERE quote_id = ?1 AND deleted_at IS NULL",
        )
        .bind(quote_id)
        .fetch_one(&mut *tx)
        .await?;
        if live_count >= MAX_LIVE_VERSIONS {
            drop(tx);
            self.log_rejection(quote_id, "version_limit").await?;
            return Err(CoreError::VersionLimitReached {
                quote_id: quote_id.to_string(),
                count: live_count,
            }
            .into());
        }

        // MAX over all versions, deleted included: numbers are append-only.
        let max_number: Option<i64> = sqlx::query_scalar(
            "SELECT MAX(version_number) FROM quote_versions WHERE quote_id = ?1",
        )
        .bind(quote_id)
        .fetch_one(&mut *tx)
        .await?;
        let version_number = max_number.unwrap_or(0) + 1;

        let source = match source_version_id {
            Some(id) => {
                let source = fetch_live_version(&mut tx, id).await?;
                if source.quote_id != quote_id {
                    return Err(CoreError::VersionNotFound(id.to_string()).into());
                }
                Some(source)
            }
            None => None,
        };

        let version_id = Uuid::new_v4().to_string();
        let now = Utc::now();
        debug!(quote_id, version_number, "Creating version");

        // Snapshot metadata from the source revision, or the quote itself
        // for a blank draft.
        let (label, valid_until, deposit_pct, currency) = match &source {
            Some(s) => (s.label.clone(), s.valid_until, s.deposit_pct, s.currency),
            None => (None, quote.valid_until, quote.deposit_pct, quote.currency),
        };

        sqlx::query(
            r#"
            INSERT INTO quote_versions (
                id, quote_id, version_number, label, status, is_locked,
                valid_until, deposit_pct, currency, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6, ?7, ?8, ?9, ?9)
            "#,
        )
        .bind(&version_id)
        .bind(quote_id)
        .bind(version_number)
        .bind(&label)
        .bind(VersionStatus::Draft)
        .bind(valid_until)
        .bind(deposit_pct.map(|p| p.to_string()))
        .bind(currency)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if let Some(source) = &source {
            let lines = fetch_live_lines(&mut tx, &source.id).await?;
            let mut totals = quoteflow_core::totals::VersionTotals::default();
            for line in &lines {
                let computed =
                    compute_line_totals(line.unit_price_cents, line.quantity, line.tax_rate_pct);
                totals.lines_net_cents += computed.net_cents;
                totals.lines_tax_cents += computed.tax_cents;
                totals.lines_gross_cents += computed.gross_cents;

                sqlx::query(
                    r#"
                    INSERT INTO quote_lines (
                        id, version_id, kind, product_id, label, description,
                        quantity, unit_price_cents, tax_rate_pct, discount_pct,
                        position, net_cents, tax_cents, gross_cents,
                        created_at, updated_at
                    ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?15)
                    "#,
                )
                .bind(Uuid::new_v4().to_string())
                .bind(&version_id)
                .bind(line.kind)
                .bind(&line.product_id)
                .bind(&line.label)
                .bind(&line.description)
                .bind(line.quantity.to_string())
                .bind(line.unit_price_cents)
                .bind(line.tax_rate_pct.to_string())
                .bind(line.discount_pct.map(|p| p.to_string()))
                .bind(line.position)
                .bind(computed.net_cents)
                .bind(computed.tax_cents)
                .bind(computed.gross_cents)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }

            let (deposit_cents, balance_cents) =
                split_deposit(totals.lines_gross_cents, deposit_pct);
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
        }

        log_activity(
            &mut tx,
            quote_id,
            Some(&version_id),
            ActivityType::VersionCreated,
            ACTOR_ADMIN,
            Some(serde_json::json!({
                "version_number": version_number,
                "source_version_id": source_version_id,
            })),
        )
        .await?;

        let version = fetch_live_version(&mut tx, &version_id).await?;
        tx.commit().await?;
        Ok(version)
    }

    /// Makes `version_id` the quote's current version: every other live
    /// version is archived and the quote's pointer moves, in one
    /// transaction. Locked versions refuse with `version_locked`.
    pub async fn publish(&self, quote_id: &str, version_id: &str) -> DbResult<QuoteVersion> {
        let mut tx = self.pool.begin().await?;
        fetch_live_quote(&mut tx, quote_id).await?;

        let version = fetch_live_version(&mut tx, version_id).await?;
        if version.quote_id != quote_id {
            return Err(CoreError::VersionNotFound(version_id.to_string()).into());
        }
        if version.is_locked {
            return Err(CoreError::VersionLocked(version_id.to_string()).into());
        }

        let now = Utc::now();
        sqlx::query(
            r#"
            UPDATE quote_versions SET status = ?3, updated_at = ?4
            WHERE quote_id = ?1 AND id <> ?2 AND deleted_at IS NULL AND status = ?5
            "#,
        )
        .bind(quote_id)
        .bind(version_id)
        .bind(VersionStatus::Archived)
        .bind(now)
        .bind(VersionStatus::Current)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE quote_versions SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(version_id)
            .bind(VersionStatus::Current)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        sqlx::query("UPDATE quotes SET current_version_id = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(quote_id)
            .bind(version_id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        log_activity(
            &mut tx,
            quote_id,
            Some(version_id),
            ActivityType::VersionPublished,
            ACTOR_ADMIN,
            Some(serde_json::json!({ "version_number": version.version_number })),
        )
        .await?;

        let version = fetch_live_version(&mut tx, version_id).await?;
        tx.commit().await?;
        Ok(version)
    }

    /// Gets a non-deleted version by ID.
    pub async fn get(&self, id: &str) -> DbResult<QuoteVersion> {
        let mut conn = self.pool.acquire().await?;
        fetch_live_version(&mut conn, id).await
    }

    /// Live versions of a quote, ordered by version number.
    pub async fn list_for_quote(&self, quote_id: &str) -> DbResult<Vec<QuoteVersion>> {
        let rows: Vec<VersionRow> = sqlx::query_as(&format!(
            "SELECT {VERSION_COLUMNS} FROM quote_versions \
             WHERE quote_id = ?1 AND deleted_at IS NULL ORDER BY version_number"
        ))
        .bind(quote_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(QuoteVersion::try_from).collect()
    }

    /// Structural diff between two live versions.
    pub async fn diff(&self, from_id: &str, to_id: &str) -> DbResult<VersionDiff> {
        let mut conn = self.pool.acquire().await?;

        let from = fetch_live_version(&mut conn, from_id).await?;
        let to = fetch_live_version(&mut conn, to_id).await?;
        let from_lines = fetch_live_lines(&mut conn, from_id).await?;
        let to_lines = fetch_live_lines(&mut conn, to_id).await?;

        Ok(diff_versions(&from, &from_lines, &to, &to_lines))
    }

    /// Writes the audit record of a refused creation in its own
    /// transaction, so the rollback of the refused operation cannot
    /// swallow it.
    async fn log_rejection(&self, quote_id: &str, reason: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        log_activity(
            &mut tx,
            quote_id,
            None,
            ActivityType::VersionRejected,
            ACTOR_ADMIN,
            Some(serde_json::json!({ "reason": reason })),
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{branding, new_quote, test_db};
    use quoteflow_core::types::QuotePatch;

    #[tokio::test]
    async fn test_create_copies_source_lines_and_totals() {
        let db = test_db().await;
        let quote = db
            .quotes()
            .create(new_quote("Copy source"), &branding())
            .await
            .unwrap();
        let v1_id = quote.current_version_id.clone().unwrap();
        let v1 = db.versions().get(&v1_id).await.unwrap();

        let v2 = db.versions().create(&quote.id, Some(&v1_id)).await.unwrap();
        assert_eq!(v2.version_number, 2);
        assert_eq!(v2.status, VersionStatus::Draft);
        assert_eq!(v2.lines_gross_cents, v1.lines_gross_cents);
        assert_eq!(v2.deposit_cents, v1.deposit_cents);

        let v1_lines = db.lines().list_for_version(&v1_id).await.unwrap();
        let v2_lines = db.lines().list_for_version(&v2.id).await.unwrap();
        assert_eq!(v1_lines.len(), v2_lines.len());
        for (a, b) in v1_lines.iter().zip(&v2_lines) {
            assert_ne!(a.id, b.id, "copied lines get fresh ids");
            assert_eq!(a.label, b.label);
            assert_eq!(a.position, b.position);
            assert_eq!(a.gross_cents, b.gross_cents);
        }
    }

    #[tokio::test]
    async fn test_create_without_source_starts_empty() {
        let db = test_db().await;
        let quote = db
            .quotes()
            .create(new_quote("Blank draft"), &branding())
            .await
            .unwrap();

        let v2 = db.versions().create(&quote.id, None).await.unwrap();
        assert_eq!(v2.lines_gross_cents, 0);
        assert_eq!(v2.deposit_pct, quote.deposit_pct);
        assert!(db
            .lines()
            .list_for_version(&v2.id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_version_limit_rejection_leaves_activity() {
        let db = test_db().await;
        let quote = db
            .quotes()
            .create(new_quote("Limited"), &branding())
            .await
            .unwrap();

        // Version 1 exists; four more reach the cap of five.
        for _ in 0..4 {
            db.versions().create(&quote.id, None).await.unwrap();
        }

        let err = db.versions().create(&quote.id, None).await.unwrap_err();
        assert_eq!(err.code(), "version_limit_reached");

        let activities = db.activities().list_for_quote(&quote.id).await.unwrap();
        let rejected: Vec<_> = activities
            .iter()
            .filter(|a| a.activity_type == ActivityType::VersionRejected)
            .collect();
        assert_eq!(rejected.len(), 1);
        assert_eq!(
            rejected[0].metadata.as_ref().unwrap()["reason"],
            serde_json::json!("version_limit")
        );
    }

    #[tokio::test]
    async fn test_accepted_quote_refuses_new_versions() {
        let db = test_db().await;
        let quote = db
            .quotes()
            .create(new_quote("Done deal"), &branding())
            .await
            .unwrap();
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

        let err = db.versions().create(&quote.id, None).await.unwrap_err();
        assert_eq!(err.code(), "version_creation_forbidden");

        let activities = db.activities().list_for_quote(&quote.id).await.unwrap();
        assert!(activities
            .iter()
            .any(|a| a.activity_type == ActivityType::VersionRejected));
    }

    #[tokio::test]
    async fn test_publish_keeps_exactly_one_current() {
        let db = test_db().await;
        let quote = db
            .quotes()
            .create(new_quote("Publisher"), &branding())
            .await
            .unwrap();
        let v1_id = quote.current_version_id.clone().unwrap();
        let v2 = db.versions().create(&quote.id, Some(&v1_id)).await.unwrap();

        let published = db.versions().publish(&quote.id, &v2.id).await.unwrap();
        assert_eq!(published.status, VersionStatus::Current);

        let versions = db.versions().list_for_quote(&quote.id).await.unwrap();
        let current: Vec<_> = versions
            .iter()
            .filter(|v| v.status == VersionStatus::Current)
            .collect();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].id, v2.id);
        assert!(versions
            .iter()
            .any(|v| v.id == v1_id && v.status == VersionStatus::Archived));

        let quote = db.quotes().get(&quote.id).await.unwrap();
        assert_eq!(quote.current_version_id.as_deref(), Some(v2.id.as_str()));
    }

    #[tokio::test]
    async fn test_publish_refuses_locked_version() {
        let db = test_db().await;
        let quote = db
            .quotes()
            .create(new_quote("Locked out"), &branding())
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

        let err = db.versions().publish(&quote.id, &draft.id).await.unwrap_err();
        assert_eq!(err.code(), "version_locked");
    }

    #[tokio::test]
    async fn test_version_numbers_never_reused() {
        let db = test_db().await;
        let quote = db
            .quotes()
            .create(new_quote("Numbered"), &branding())
            .await
            .unwrap();

        let v2 = db.versions().create(&quote.id, None).await.unwrap();
        assert_eq!(v2.version_number, 2);

        // Simulate a deleted revision; the next number still advances.
        sqlx::query("UPDATE quote_versions SET deleted_at = ?2 WHERE id = ?1")
            .bind(&v2.id)
            .bind(Utc::now())
            .execute(db.pool())
            .await
            .unwrap();

        let v3 = db.versions().create(&quote.id, None).await.unwrap();
        assert_eq!(v3.version_number, 3);
    }

    #[tokio::test]
    async fn test_diff_between_versions() {
        let db = test_db().await;
        let quote = db
            .quotes()
            .create(new_quote("Diffable"), &branding())
            .await
            .unwrap();
        let v1_id = quote.current_version_id.clone().unwrap();
        let v2 = db.versions().create(&quote.id, Some(&v1_id)).await.unwrap();

        let diff = db.versions().diff(&v1_id, &v2.id).await.unwrap();
        assert!(diff.is_empty(), "copy diffs clean against its source");

        let lines = db.lines().list_for_version(&v2.id).await.unwrap();
        db.lines()
            .update(
                &lines[0].id,
                quoteflow_core::types::LinePatch {
                    unit_price_cents: Some(123_45),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let diff = db.versions().diff(&v1_id, &v2.id).await.unwrap();
        assert!(diff.meta.is_empty());
        assert_eq!(diff.lines.len(), 1);

        let err = db.versions().diff(&v1_id, "nope").await.unwrap_err();
        assert_eq!(err.code(), "version_not_found");
    }
}
