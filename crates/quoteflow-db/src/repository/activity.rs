//! # Activity Log
//!
//! Append-only audit trail. Every mutating operation of the engine
//! appends its records inside the same transaction it mutates in, so an
//! aborted operation leaves no trace. Records are never updated or
//! deleted.
//!
//! The one exception to in-transaction logging lives in the version
//! repository: rejected version creations log their rejection reason in
//! a transaction of their own, because the record must survive the
//! failed operation.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use uuid::Uuid;

use quoteflow_core::types::{Activity, ActivityType};

use crate::error::DbResult;
use crate::rows::ActivityRow;

/// Actor recorded for administrative operations.
pub const ACTOR_ADMIN: &str = "admin";
/// Actor recorded for operations arriving through a public link.
pub const ACTOR_PUBLIC: &str = "public";

/// Appends one activity record on the caller's connection, normally a
/// live transaction.
pub(crate) async fn log_activity(
    conn: &mut SqliteConnection,
    quote_id: &str,
    version_id: Option<&str>,
    activity_type: ActivityType,
    actor: &str,
    metadata: Option<serde_json::Value>,
) -> DbResult<()> {
    let id = Uuid::new_v4().to_string();
    let now = Utc::now();
    let metadata = metadata.map(|m| m.to_string());

    sqlx::query(
        r#"
        INSERT INTO activities (id, quote_id, version_id, activity_type, actor, metadata, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(id)
    .bind(quote_id)
    .bind(version_id)
    .bind(activity_type)
    .bind(actor)
    .bind(metadata)
    .bind(now)
    .execute(conn)
    .await?;

    Ok(())
}

/// Read side of the audit trail.
#[derive(Debug, Clone)]
pub struct ActivityRepository {
    pool: SqlitePool,
}

impl ActivityRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ActivityRepository { pool }
    }

    /// All activities of a quote, oldest first.
    pub async fn list_for_quote(&self, quote_id: &str) -> DbResult<Vec<Activity>> {
        let rows: Vec<ActivityRow> = sqlx::query_as(
            r#"
            SELECT id, quote_id, version_id, activity_type, actor, metadata, created_at
            FROM activities
            WHERE quote_id = ?1
            ORDER BY created_at, id
            "#,
        )
        .bind(quote_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Activity::try_from).collect()
    }
}
