//! # Line Repository
//!
//! Line items of a version. Every mutation re-derives the version's
//! cached totals inside the same transaction, so readers never observe
//! totals that disagree with the lines.
//!
//! Live lines of a version always occupy positions 1..N with no gaps;
//! a partial unique index enforces it. Shifts are applied row by row in
//! an order that keeps the index satisfied at every intermediate step.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use quoteflow_core::error::{CoreError, ValidationError};
use quoteflow_core::totals::{compute_line_totals, compute_version_totals, split_deposit};
use quoteflow_core::types::{LinePatch, NewLine, QuoteLine, QuoteVersion};
use quoteflow_core::validation::{
    validate_percent, validate_quantity, validate_required_text, validate_tax_rate_pct,
    validate_unit_price_cents,
};

use crate::error::DbResult;
use crate::repository::version::fetch_live_version;
use crate::rows::LineRow;

pub(crate) const LINE_COLUMNS: &str = "id, version_id, kind, product_id, label, description, \
     quantity, unit_price_cents, tax_rate_pct, discount_pct, position, net_cents, tax_cents, \
     gross_cents, deleted_at, created_at, updated_at";

pub(crate) fn validate_new_line(line: &NewLine) -> Result<(), ValidationError> {
    validate_required_text("label", &line.label)?;
    validate_quantity(line.quantity)?;
    validate_unit_price_cents(line.unit_price_cents)?;
    validate_tax_rate_pct(line.tax_rate_pct)?;
    if let Some(discount) = line.discount_pct {
        validate_percent("discount_pct", discount)?;
    }
    Ok(())
}

/// Live lines of a version, ordered by position.
pub(crate) async fn fetch_live_lines(
    conn: &mut SqliteConnection,
    version_id: &str,
) -> DbResult<Vec<QuoteLine>> {
    let rows: Vec<LineRow> = sqlx::query_as(&format!(
        "SELECT {LINE_COLUMNS} FROM quote_lines \
         WHERE version_id = ?1 AND deleted_at IS NULL ORDER BY position"
    ))
    .bind(version_id)
    .fetch_all(conn)
    .await?;

    rows.into_iter().map(QuoteLine::try_from).collect()
}

async fn fetch_live_line(conn: &mut SqliteConnection, id: &str) -> DbResult<QuoteLine> {
    let row: Option<LineRow> = sqlx::query_as(&format!(
        "SELECT {LINE_COLUMNS} FROM quote_lines WHERE id = ?1 AND deleted_at IS NULL"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await?;

    match row {
        Some(row) => QuoteLine::try_from(row),
        None => Err(CoreError::LineNotFound(id.to_string()).into()),
    }
}

/// Loads the version a line edit targets, refusing locked revisions.
async fn fetch_editable_version(
    conn: &mut SqliteConnection,
    version_id: &str,
) -> DbResult<QuoteVersion> {
    let version = fetch_live_version(conn, version_id).await?;
    if version.is_locked {
        return Err(CoreError::VersionLocked(version_id.to_string()).into());
    }
    Ok(version)
}

/// Inserts one line at `position` with freshly computed totals.
/// The caller owns position bookkeeping and the totals refresh.
pub(crate) async fn insert_line_at(
    conn: &mut SqliteConnection,
    version_id: &str,
    new: &NewLine,
    position: i64,
) -> DbResult<QuoteLine> {
    let totals = compute_line_totals(new.unit_price_cents, new.quantity, new.tax_rate_pct);
    let now = Utc::now();
    let line = QuoteLine {
        id: Uuid::new_v4().to_string(),
        version_id: version_id.to_string(),
        kind: new.kind,
        product_id: new.product_id.clone(),
        label: new.label.clone(),
        description: new.description.clone(),
        quantity: new.quantity,
        unit_price_cents: new.unit_price_cents,
        tax_rate_pct: new.tax_rate_pct,
        discount_pct: new.discount_pct,
        position,
        net_cents: totals.net_cents,
        tax_cents: totals.tax_cents,
        gross_cents: totals.gross_cents,
        deleted_at: None,
        created_at: now,
        updated_at: now,
    };

    sqlx::query(
        r#"
        INSERT INTO quote_lines (
            id, version_id, kind, product_id, label, description,
            quantity, unit_price_cents, tax_rate_pct, discount_pct,
            position, net_cents, tax_cents, gross_cents, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?15)
        "#,
    )
    .bind(&line.id)
    .bind(version_id)
    .bind(line.kind)
    .bind(&line.product_id)
    .bind(&line.label)
    .bind(&line.description)
    .bind(line.quantity.to_string())
    .bind(line.unit_price_cents)
    .bind(line.tax_rate_pct.to_string())
    .bind(line.discount_pct.map(|p| p.to_string()))
    .bind(position)
    .bind(line.net_cents)
    .bind(line.tax_cents)
    .bind(line.gross_cents)
    .bind(now)
    .execute(conn)
    .await?;

    Ok(line)
}

/// Re-derives and persists the cached totals of a version from its
/// current live lines.
async fn refresh_version_totals(
    conn: &mut SqliteConnection,
    version: &QuoteVersion,
) -> DbResult<()> {
    let lines = fetch_live_lines(conn, &version.id).await?;
    let totals = compute_version_totals(&lines);
    let (deposit_cents, balance_cents) =
        split_deposit(totals.lines_gross_cents, version.deposit_pct);

    sqlx::query(
        r#"
        UPDATE quote_versions SET
            lines_net_cents = ?2, lines_tax_cents = ?3, lines_gross_cents = ?4,
            deposit_cents = ?5, balance_cents = ?6, updated_at = ?7
        WHERE id = ?1
        "#,
    )
    .bind(&version.id)
    .bind(totals.lines_net_cents)
    .bind(totals.lines_tax_cents)
    .bind(totals.lines_gross_cents)
    .bind(deposit_cents)
    .bind(balance_cents)
    .bind(Utc::now())
    .execute(conn)
    .await?;

    Ok(())
}

/// Repository for line item operations.
#[derive(Debug, Clone)]
pub struct LineRepository {
    pool: SqlitePool,
}

impl LineRepository {
    pub fn new(pool: SqlitePool) -> Self {
        LineRepository { pool }
    }

    /// Adds a line, appended at the end or inserted at the requested
    /// 1-based position with subsequent lines shifted up.
    pub async fn add(&self, version_id: &str, new: NewLine) -> DbResult<QuoteLine> {
        validate_new_line(&new)?;

        let mut tx = self.pool.begin().await?;
        let version = fetch_editable_version(&mut tx, version_id).await?;

        let live_count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM quote_lines WHERE version_id = ?1 AND deleted_at IS NULL",
        )
        .bind(version_id)
        .fetch_one(&mut *tx)
        .await?;

        let position = new.position.unwrap_or(live_count + 1);
        if position < 1 || position > live_count + 1 {
            return Err(ValidationError::OutOfRange {
                field: "position".to_string(),
                min: 1,
                max: live_count + 1,
            }
            .into());
        }

        // Shift the tail up by one, highest position first, so the
        // partial unique index holds at every step.
        let shifted: Vec<(String, i64)> = sqlx::query_as(
            r#"
            SELECT id, position FROM quote_lines
            WHERE version_id = ?1 AND deleted_at IS NULL AND position >= ?2
            ORDER BY position DESC
            "#,
        )
        .bind(version_id)
        .bind(position)
        .fetch_all(&mut *tx)
        .await?;

        let now = Utc::now();
        for (id, old_position) in shifted {
            sqlx::query("UPDATE quote_lines SET position = ?2, updated_at = ?3 WHERE id = ?1")
                .bind(id)
                .bind(old_position + 1)
                .bind(now)
                .execute(&mut *tx)
                .await?;
        }

        let line = insert_line_at(&mut tx, version_id, &new, position).await?;
        refresh_version_totals(&mut tx, &version).await?;
        tx.commit().await?;
        Ok(line)
    }

    /// Applies a partial patch to a line. Line totals are recomputed only
    /// when a pricing field changed; version totals always are.
    pub async fn update(&self, line_id: &str, patch: LinePatch) -> DbResult<QuoteLine> {
        if patch.is_empty() {
            return Err(ValidationError::EmptyPatch.into());
        }
        if let Some(label) = &patch.label {
            validate_required_text("label", label)?;
        }
        if let Some(quantity) = patch.quantity {
            validate_quantity(quantity)?;
        }
        if let Some(cents) = patch.unit_price_cents {
            validate_unit_price_cents(cents)?;
        }
        if let Some(rate) = patch.tax_rate_pct {
            validate_tax_rate_pct(rate)?;
        }
        if let Some(Some(discount)) = patch.discount_pct {
            validate_percent("discount_pct", discount)?;
        }

        let mut tx = self.pool.begin().await?;
        let mut line = fetch_live_line(&mut tx, line_id).await?;
        let version = fetch_editable_version(&mut tx, &line.version_id).await?;

        let recompute = patch.affects_totals();
        if let Some(label) = patch.label {
            line.label = label;
        }
        if let Some(description) = patch.description {
            line.description = description;
        }
        if let Some(quantity) = patch.quantity {
            line.quantity = quantity;
        }
        if let Some(cents) = patch.unit_price_cents {
            line.unit_price_cents = cents;
        }
        if let Some(rate) = patch.tax_rate_pct {
            line.tax_rate_pct = rate;
        }
        if let Some(discount) = patch.discount_pct {
            line.discount_pct = discount;
        }

        if recompute {
            let totals =
                compute_line_totals(line.unit_price_cents, line.quantity, line.tax_rate_pct);
            line.net_cents = totals.net_cents;
            line.tax_cents = totals.tax_cents;
            line.gross_cents = totals.gross_cents;
        }
        line.updated_at = Utc::now();

        sqlx::query(
            r#"
            UPDATE quote_lines SET
                label = ?2, description = ?3, quantity = ?4, unit_price_cents = ?5,
                tax_rate_pct = ?6, discount_pct = ?7, net_cents = ?8, tax_cents = ?9,
                gross_cents = ?10, updated_at = ?11
            WHERE id = ?1
            "#,
        )
        .bind(&line.id)
        .bind(&line.label)
        .bind(&line.description)
        .bind(line.quantity.to_string())
        .bind(line.unit_price_cents)
        .bind(line.tax_rate_pct.to_string())
        .bind(line.discount_pct.map(|p| p.to_string()))
        .bind(line.net_cents)
        .bind(line.tax_cents)
        .bind(line.gross_cents)
        .bind(line.updated_at)
        .execute(&mut *tx)
        .await?;

        refresh_version_totals(&mut tx, &version).await?;
        tx.commit().await?;
        Ok(line)
    }

    /// Soft-deletes a line and renumbers the survivors back to a dense
    /// 1..N, preserving their relative order.
    pub async fn remove(&self, line_id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;
        let line = fetch_live_line(&mut tx, line_id).await?;
        let version = fetch_editable_version(&mut tx, &line.version_id).await?;

        let now = Utc::now();
        sqlx::query("UPDATE quote_lines SET deleted_at = ?2, updated_at = ?2 WHERE id = ?1")
            .bind(&line.id)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        // Ascending renumber: positions only move down, never colliding.
        let survivors = fetch_live_lines(&mut tx, &version.id).await?;
        for (index, survivor) in survivors.iter().enumerate() {
            let position = index as i64 + 1;
            if survivor.position != position {
                sqlx::query(
                    "UPDATE quote_lines SET position = ?2, updated_at = ?3 WHERE id = ?1",
                )
                .bind(&survivor.id)
                .bind(position)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }
        }

        refresh_version_totals(&mut tx, &version).await?;
        tx.commit().await?;
        Ok(())
    }

    /// Live lines of a version, ordered by position.
    pub async fn list_for_version(&self, version_id: &str) -> DbResult<Vec<QuoteLine>> {
        let mut conn = self.pool.acquire().await?;
        fetch_live_lines(&mut conn, version_id).await
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{branding, new_quote, service_line, test_db};
    use quoteflow_core::types::{QuotePatch, QuoteStatus};

    async fn quote_with_version(db: &crate::pool::Database) -> (String, String) {
        let quote = db
            .quotes()
            .create(new_quote("Line fixture"), &branding())
            .await
            .unwrap();
        let version_id = quote.current_version_id.clone().unwrap();
        (quote.id, version_id)
    }

    #[tokio::test]
    async fn test_add_appends_and_inserts() {
        let db = test_db().await;
        let (_, version_id) = quote_with_version(&db).await;

        // Fixture starts with two lines; append a third.
        let tail = db
            .lines()
            .add(&version_id, service_line("Appended", 500, "1", "20"))
            .await
            .unwrap();
        assert_eq!(tail.position, 3);

        // Insert at position 1 shifts everything up.
        let mut head = service_line("Inserted first", 250, "2", "20");
        head.position = Some(1);
        let head = db.lines().add(&version_id, head).await.unwrap();
        assert_eq!(head.position, 1);

        let lines = db.lines().list_for_version(&version_id).await.unwrap();
        let positions: Vec<i64> = lines.iter().map(|l| l.position).collect();
        assert_eq!(positions, vec![1, 2, 3, 4]);
        assert_eq!(lines[0].id, head.id);
        assert_eq!(lines[3].id, tail.id);

        // Out-of-range insert position.
        let mut bad = service_line("Too far", 100, "1", "0");
        bad.position = Some(99);
        let err = db.lines().add(&version_id, bad).await.unwrap_err();
        assert_eq!(err.code(), "validation");
    }

    #[tokio::test]
    async fn test_update_recomputes_only_pricing_changes() {
        let db = test_db().await;
        let (_, version_id) = quote_with_version(&db).await;
        let lines = db.lines().list_for_version(&version_id).await.unwrap();
        let target = &lines[0];

        // Label-only patch leaves totals untouched.
        let updated = db
            .lines()
            .update(
                &target.id,
                LinePatch {
                    label: Some("Renamed".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.net_cents, target.net_cents);

        // Price patch recomputes line and version totals.
        let updated = db
            .lines()
            .update(
                &target.id,
                LinePatch {
                    unit_price_cents: Some(10_000),
                    quantity: Some("2".parse().unwrap()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.net_cents, 20_000);
        assert_eq!(updated.tax_cents, 4_000);

        let version = db.versions().get(&version_id).await.unwrap();
        let lines = db.lines().list_for_version(&version_id).await.unwrap();
        let sum: i64 = lines.iter().map(|l| l.gross_cents).sum();
        assert_eq!(version.lines_gross_cents, sum);
    }

    #[tokio::test]
    async fn test_remove_renumbers_densely() {
        let db = test_db().await;
        let (_, version_id) = quote_with_version(&db).await;
        db.lines()
            .add(&version_id, service_line("Third", 300, "1", "20"))
            .await
            .unwrap();

        let lines = db.lines().list_for_version(&version_id).await.unwrap();
        assert_eq!(lines.len(), 3);

        // Drop the middle line; the tail closes the gap.
        db.lines().remove(&lines[1].id).await.unwrap();
        let after = db.lines().list_for_version(&version_id).await.unwrap();
        assert_eq!(after.len(), 2);
        assert_eq!(after[0].position, 1);
        assert_eq!(after[1].position, 2);
        assert_eq!(after[1].id, lines[2].id);

        let err = db.lines().remove(&lines[1].id).await.unwrap_err();
        assert_eq!(err.code(), "line_not_found");
    }

    #[tokio::test]
    async fn test_locked_version_refuses_edits() {
        let db = test_db().await;
        let (quote_id, _) = quote_with_version(&db).await;
        let draft = db.versions().create(&quote_id, None).await.unwrap();
        let line = db
            .lines()
            .add(&draft.id, service_line("Pre-lock", 100, "1", "0"))
            .await
            .unwrap();

        db.quotes()
            .update(
                &quote_id,
                QuotePatch {
                    status: Some(QuoteStatus::Accepted),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let err = db
            .lines()
            .add(&draft.id, service_line("Post-lock", 100, "1", "0"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "version_locked");

        let err = db
            .lines()
            .update(
                &line.id,
                LinePatch {
                    unit_price_cents: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "version_locked");

        let err = db.lines().remove(&line.id).await.unwrap_err();
        assert_eq!(err.code(), "version_locked");
    }

    #[tokio::test]
    async fn test_empty_patch_rejected() {
        let db = test_db().await;
        let (_, version_id) = quote_with_version(&db).await;
        let lines = db.lines().list_for_version(&version_id).await.unwrap();

        let err = db
            .lines()
            .update(&lines[0].id, LinePatch::default())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "validation");
    }
}
