//! # PDF Job Records
//!
//! Bookkeeping for an external renderer. This engine records intent and
//! outcome; it never renders. Jobs move pending → processing → ready or
//! failed, and failed jobs may be picked up again.

use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

use quoteflow_core::error::CoreError;
use quoteflow_core::types::{ActivityType, PdfJob, PdfJobStatus};

use crate::error::DbResult;
use crate::repository::activity::{log_activity, ACTOR_ADMIN};
use crate::repository::quote::fetch_live_quote;
use crate::rows::PdfJobRow;

const PDF_JOB_COLUMNS: &str = "id, quote_id, version_id, status, file_url, error_code, \
     error_message, attempts, created_at, updated_at";

/// Repository for PDF render job records.
#[derive(Debug, Clone)]
pub struct PdfJobRepository {
    pool: SqlitePool,
}

impl PdfJobRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PdfJobRepository { pool }
    }

    /// Requests a render of the quote's current version. The quote must
    /// be live and have a current version to pin the job to.
    pub async fn create(&self, quote_id: &str) -> DbResult<PdfJob> {
        let mut tx = self.pool.begin().await?;
        let quote = fetch_live_quote(&mut tx, quote_id).await?;
        let version_id = quote
            .current_version_id
            .ok_or_else(|| CoreError::NoCurrentVersionForPdf(quote_id.to_string()))?;

        let id = Uuid::new_v4().to_string();
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO pdf_jobs (id, quote_id, version_id, status, attempts, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, 0, ?5, ?5)
            "#,
        )
        .bind(&id)
        .bind(quote_id)
        .bind(&version_id)
        .bind(PdfJobStatus::Pending)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        log_activity(
            &mut tx,
            quote_id,
            Some(&version_id),
            ActivityType::PdfRequested,
            ACTOR_ADMIN,
            Some(serde_json::json!({ "job_id": id })),
        )
        .await?;

        let job = self.fetch(&mut tx, &id).await?;
        tx.commit().await?;
        Ok(job)
    }

    pub async fn get(&self, id: &str) -> DbResult<PdfJob> {
        let mut conn = self.pool.acquire().await?;
        self.fetch(&mut conn, id).await
    }

    /// Claims a job for rendering: pending or failed → processing, with
    /// the attempt counter bumped. Claiming a job in any other state is
    /// reported as not found, so two renderers cannot share one.
    pub async fn mark_processing(&self, id: &str) -> DbResult<PdfJob> {
        let result = sqlx::query(
            r#"
            UPDATE pdf_jobs SET
                status = ?2, attempts = attempts + 1,
                error_code = NULL, error_message = NULL, updated_at = ?3
            WHERE id = ?1 AND status IN (?4, ?5)
            "#,
        )
        .bind(id)
        .bind(PdfJobStatus::Processing)
        .bind(Utc::now())
        .bind(PdfJobStatus::Pending)
        .bind(PdfJobStatus::Failed)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::PdfJobNotFound(id.to_string()).into());
        }

        self.get(id).await
    }

    /// Records a successful render.
    pub async fn mark_ready(&self, id: &str, file_url: &str) -> DbResult<PdfJob> {
        let result = sqlx::query(
            r#"
            UPDATE pdf_jobs SET status = ?2, file_url = ?3, updated_at = ?4
            WHERE id = ?1 AND status = ?5
            "#,
        )
        .bind(id)
        .bind(PdfJobStatus::Ready)
        .bind(file_url)
        .bind(Utc::now())
        .bind(PdfJobStatus::Processing)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::PdfJobNotFound(id.to_string()).into());
        }

        self.get(id).await
    }

    /// Records a failed render. The job stays claimable.
    pub async fn mark_failed(
        &self,
        id: &str,
        error_code: &str,
        error_message: &str,
    ) -> DbResult<PdfJob> {
        let result = sqlx::query(
            r#"
            UPDATE pdf_jobs SET status = ?2, error_code = ?3, error_message = ?4, updated_at = ?5
            WHERE id = ?1 AND status = ?6
            "#,
        )
        .bind(id)
        .bind(PdfJobStatus::Failed)
        .bind(error_code)
        .bind(error_message)
        .bind(Utc::now())
        .bind(PdfJobStatus::Processing)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::PdfJobNotFound(id.to_string()).into());
        }

        self.get(id).await
    }

    /// Jobs of a quote, newest first.
    pub async fn list_for_quote(&self, quote_id: &str) -> DbResult<Vec<PdfJob>> {
        let rows: Vec<PdfJobRow> = sqlx::query_as(&format!(
            "SELECT {PDF_JOB_COLUMNS} FROM pdf_jobs WHERE quote_id = ?1 ORDER BY created_at DESC, id"
        ))
        .bind(quote_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(PdfJob::from).collect())
    }

    async fn fetch(&self, conn: &mut sqlx::SqliteConnection, id: &str) -> DbResult<PdfJob> {
        let row: Option<PdfJobRow> = sqlx::query_as(&format!(
            "SELECT {PDF_JOB_COLUMNS} FROM pdf_jobs WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(conn)
        .await?;

        match row {
            Some(row) => Ok(PdfJob::from(row)),
            None => Err(CoreError::PdfJobNotFound(id.to_string()).into()),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{branding, new_quote, test_db};

    #[tokio::test]
    async fn test_job_lifecycle_ready() {
        let db = test_db().await;
        let quote = db
            .quotes()
            .create(new_quote("Rendered"), &branding())
            .await
            .unwrap();

        let job = db.pdf_jobs().create(&quote.id).await.unwrap();
        assert_eq!(job.status, PdfJobStatus::Pending);
        assert_eq!(job.attempts, 0);
        assert_eq!(
            job.version_id,
            quote.current_version_id.clone().unwrap()
        );

        let job = db.pdf_jobs().mark_processing(&job.id).await.unwrap();
        assert_eq!(job.status, PdfJobStatus::Processing);
        assert_eq!(job.attempts, 1);

        let job = db
            .pdf_jobs()
            .mark_ready(&job.id, "s3://bucket/quote.pdf")
            .await
            .unwrap();
        assert_eq!(job.status, PdfJobStatus::Ready);
        assert_eq!(job.file_url.as_deref(), Some("s3://bucket/quote.pdf"));

        // Terminal: cannot be claimed again.
        let err = db.pdf_jobs().mark_processing(&job.id).await.unwrap_err();
        assert_eq!(err.code(), "pdf_job_not_found");
    }

    #[tokio::test]
    async fn test_failed_job_is_claimable_again() {
        let db = test_db().await;
        let quote = db
            .quotes()
            .create(new_quote("Flaky render"), &branding())
            .await
            .unwrap();

        let job = db.pdf_jobs().create(&quote.id).await.unwrap();
        db.pdf_jobs().mark_processing(&job.id).await.unwrap();
        let job = db
            .pdf_jobs()
            .mark_failed(&job.id, "timeout", "renderer did not answer")
            .await
            .unwrap();
        assert_eq!(job.status, PdfJobStatus::Failed);
        assert_eq!(job.error_code.as_deref(), Some("timeout"));

        // Retry clears the error fields and bumps attempts.
        let job = db.pdf_jobs().mark_processing(&job.id).await.unwrap();
        assert_eq!(job.attempts, 2);
        assert_eq!(job.error_code, None);
        assert_eq!(job.error_message, None);
    }

    #[tokio::test]
    async fn test_create_requires_live_quote_with_current_version() {
        let db = test_db().await;
        let quote = db
            .quotes()
            .create(new_quote("Gone"), &branding())
            .await
            .unwrap();

        // No current version pointer.
        sqlx::query("UPDATE quotes SET current_version_id = NULL WHERE id = ?1")
            .bind(&quote.id)
            .execute(db.pool())
            .await
            .unwrap();
        let err = db.pdf_jobs().create(&quote.id).await.unwrap_err();
        assert_eq!(err.code(), "no_current_version_for_pdf");

        db.quotes().soft_delete(&quote.id).await.unwrap();
        let err = db.pdf_jobs().create(&quote.id).await.unwrap_err();
        assert_eq!(err.code(), "quote_not_found");

        let activities = db.activities().list_for_quote(&quote.id).await.unwrap();
        let requested = activities
            .iter()
            .filter(|a| a.activity_type == ActivityType::PdfRequested)
            .count();
        assert_eq!(requested, 0, "failed requests leave no pdf_requested record");
    }
}
