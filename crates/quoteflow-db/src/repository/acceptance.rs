//! # Acceptance Workflow
//!
//! The one status transition with legal weight. Acceptance freezes the
//! priced content: every non-current version is locked, irreversibly.
//!
//! ## Paths Into `accepted`
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       Acceptance Paths                              │
//! │                                                                     │
//! │  ONLINE  customer → public token → PIN gate → accept_online()       │
//! │  PAPER   back office records a signed document → accept_paper()     │
//! │                                                                     │
//! │  UNDO    only from exactly `accepted`, back to `sent`; acceptance   │
//! │          fields are cleared but version locks stay                  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::info;

use quoteflow_core::error::CoreError;
use quoteflow_core::types::{AcceptanceMode, ActivityType, Quote, QuoteStatus};

use crate::error::DbResult;
use crate::repository::activity::{log_activity, ACTOR_ADMIN, ACTOR_PUBLIC};
use crate::repository::link::fetch_enabled_link;
use crate::repository::quote::fetch_live_quote;
use crate::repository::version::lock_non_current_versions;

/// Repository for the acceptance workflow.
#[derive(Debug, Clone)]
pub struct AcceptanceRepository {
    pool: SqlitePool,
}

impl AcceptanceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        AcceptanceRepository { pool }
    }

    /// Accepts through a public link token.
    ///
    /// ## Gate Order
    /// 1. enabled link for the token (`link_not_found`)
    /// 2. active lockout (`pin_locked`)
    /// 3. PIN configured but not verified in this session, i.e. the
    ///    failure counter is nonzero (`pin_required`)
    /// 4. already accepted (`already_accepted`)
    pub async fn accept_online(&self, token: &str, accepted_by_name: &str) -> DbResult<Quote> {
        let mut tx = self.pool.begin().await?;
        let link = fetch_enabled_link(&mut tx, token).await?;

        let now = Utc::now();
        if let Some(locked_until) = link.locked_until {
            if locked_until > now {
                return Err(CoreError::PinLocked {
                    unlock_at: locked_until,
                }
                .into());
            }
        }
        if link.pin_hash.is_some() && link.failed_attempts > 0 {
            return Err(CoreError::PinRequired.into());
        }

        let quote = fetch_live_quote(&mut tx, &link.quote_id).await?;
        if quote.status == QuoteStatus::Accepted {
            return Err(CoreError::AlreadyAccepted(quote.id).into());
        }

        let quote = self
            .mark_accepted(
                &mut tx,
                quote,
                AcceptanceMode::Online,
                now,
                Some(accepted_by_name),
                None,
                ACTOR_PUBLIC,
            )
            .await?;

        tx.commit().await?;
        info!(quote_id = %quote.id, "Quote accepted online");
        Ok(quote)
    }

    /// Records an acceptance that happened on paper. `accepted_at`
    /// defaults to now; free-form notes live only in the audit trail.
    pub async fn accept_paper(
        &self,
        quote_id: &str,
        accepted_at: Option<DateTime<Utc>>,
        accepted_by_name: Option<&str>,
        notes: Option<&str>,
    ) -> DbResult<Quote> {
        let mut tx = self.pool.begin().await?;
        let quote = fetch_live_quote(&mut tx, quote_id).await?;
        if quote.status == QuoteStatus::Accepted {
            return Err(CoreError::AlreadyAccepted(quote.id).into());
        }

        let quote = self
            .mark_accepted(
                &mut tx,
                quote,
                AcceptanceMode::Paper,
                accepted_at.unwrap_or_else(Utc::now),
                accepted_by_name,
                notes,
                ACTOR_ADMIN,
            )
            .await?;

        tx.commit().await?;
        info!(quote_id = %quote.id, "Paper acceptance recorded");
        Ok(quote)
    }

    /// Reverts an acceptance: only from exactly `accepted`, back to
    /// `sent`, clearing the acceptance fields. Version locks remain.
    pub async fn undo(&self, quote_id: &str, reason: Option<&str>) -> DbResult<Quote> {
        let mut tx = self.pool.begin().await?;
        let quote = fetch_live_quote(&mut tx, quote_id).await?;
        if quote.status != QuoteStatus::Accepted {
            return Err(CoreError::AcceptanceUndoForbidden {
                quote_id: quote.id,
                status: quote.status.as_str().to_string(),
            }
            .into());
        }

        let now = Utc::now();
        sqlx::query(
            r#"
            UPDATE quotes SET
                status = ?2, accepted_at = NULL, accepted_by_name = NULL,
                acceptance_mode = NULL, updated_at = ?3
            WHERE id = ?1
            "#,
        )
        .bind(quote_id)
        .bind(QuoteStatus::Sent)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        log_activity(
            &mut tx,
            quote_id,
            None,
            ActivityType::StatusChanged,
            ACTOR_ADMIN,
            Some(serde_json::json!({
                "from": QuoteStatus::Accepted.as_str(),
                "to": QuoteStatus::Sent.as_str(),
            })),
        )
        .await?;
        log_activity(
            &mut tx,
            quote_id,
            None,
            ActivityType::Decline,
            ACTOR_ADMIN,
            Some(serde_json::json!({ "undo": true, "reason": reason })),
        )
        .await?;

        let quote = fetch_live_quote(&mut tx, quote_id).await?;
        tx.commit().await?;
        Ok(quote)
    }

    #[allow(clippy::too_many_arguments)]
    async fn mark_accepted(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        quote: Quote,
        mode: AcceptanceMode,
        accepted_at: DateTime<Utc>,
        accepted_by_name: Option<&str>,
        notes: Option<&str>,
        actor: &str,
    ) -> DbResult<Quote> {
        let old_status = quote.status;
        let now = Utc::now();

        sqlx::query(
            r#"
            UPDATE quotes SET
                status = ?2, acceptance_mode = ?3, accepted_at = ?4,
                accepted_by_name = ?5, updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(&quote.id)
        .bind(QuoteStatus::Accepted)
        .bind(mode)
        .bind(accepted_at)
        .bind(accepted_by_name)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        lock_non_current_versions(tx, &quote.id).await?;

        log_activity(
            tx,
            &quote.id,
            None,
            ActivityType::StatusChanged,
            actor,
            Some(serde_json::json!({
                "from": old_status.as_str(),
                "to": QuoteStatus::Accepted.as_str(),
            })),
        )
        .await?;
        log_activity(
            tx,
            &quote.id,
            None,
            ActivityType::Accept,
            actor,
            Some(serde_json::json!({
                "mode": mode,
                "accepted_by_name": accepted_by_name,
                "notes": notes,
            })),
        )
        .await?;

        fetch_live_quote(tx, &quote.id).await
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
    async fn test_accept_online_and_double_accept() {
        let db = test_db().await;
        let quote = db
            .quotes()
            .create(new_quote("Online deal"), &branding())
            .await
            .unwrap();
        let link = db.links().enable(&quote.id, None).await.unwrap();

        let accepted = db
            .acceptance()
            .accept_online(&link.token, "Ada Lovelace")
            .await
            .unwrap();
        assert_eq!(accepted.status, QuoteStatus::Accepted);
        assert_eq!(accepted.acceptance_mode, Some(AcceptanceMode::Online));
        assert_eq!(accepted.accepted_by_name.as_deref(), Some("Ada Lovelace"));
        assert!(accepted.accepted_at.is_some());

        let err = db
            .acceptance()
            .accept_online(&link.token, "Ada Lovelace")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "already_accepted");
    }

    #[tokio::test]
    async fn test_accept_online_requires_fresh_pin_verification() {
        let db = test_db().await;
        let quote = db
            .quotes()
            .create(new_quote("Gated"), &branding())
            .await
            .unwrap();
        let link = db.links().enable(&quote.id, Some("4711")).await.unwrap();

        // One failed attempt leaves the counter nonzero: no acceptance.
        let _ = db.links().submit_pin(&link.token, "0000").await;
        let err = db
            .acceptance()
            .accept_online(&link.token, "Eve")
            .await
            .unwrap_err();
        assert_eq!(err.code(), "pin_required");

        // A successful verification resets the counter and unblocks.
        db.links().submit_pin(&link.token, "4711").await.unwrap();
        let accepted = db
            .acceptance()
            .accept_online(&link.token, "Bob")
            .await
            .unwrap();
        assert_eq!(accepted.status, QuoteStatus::Accepted);
    }

    #[tokio::test]
    async fn test_accept_paper_with_explicit_timestamp() {
        let db = test_db().await;
        let quote = db
            .quotes()
            .create(new_quote("Paper deal"), &branding())
            .await
            .unwrap();

        let signed_at = "2024-03-01T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let accepted = db
            .acceptance()
            .accept_paper(&quote.id, Some(signed_at), Some("C. Signer"), Some("countersigned"))
            .await
            .unwrap();
        assert_eq!(accepted.acceptance_mode, Some(AcceptanceMode::Paper));
        assert_eq!(accepted.accepted_at, Some(signed_at));

        let activities = db.activities().list_for_quote(&quote.id).await.unwrap();
        let accept = activities
            .iter()
            .find(|a| a.activity_type == ActivityType::Accept)
            .unwrap();
        assert_eq!(
            accept.metadata.as_ref().unwrap()["notes"],
            serde_json::json!("countersigned")
        );
    }

    #[tokio::test]
    async fn test_undo_only_from_accepted_and_keeps_locks() {
        let db = test_db().await;
        let quote = db
            .quotes()
            .create(new_quote("Undoable"), &branding())
            .await
            .unwrap();
        let draft = db.versions().create(&quote.id, None).await.unwrap();

        // Not yet accepted: undo refused.
        let err = db.acceptance().undo(&quote.id, None).await.unwrap_err();
        assert_eq!(err.code(), "acceptance_undo_forbidden");

        db.acceptance()
            .accept_paper(&quote.id, None, None, None)
            .await
            .unwrap();
        let reverted = db
            .acceptance()
            .undo(&quote.id, Some("clerical error"))
            .await
            .unwrap();
        assert_eq!(reverted.status, QuoteStatus::Sent);
        assert_eq!(reverted.accepted_at, None);
        assert_eq!(reverted.acceptance_mode, None);

        // Locks survive the undo.
        let draft = db.versions().get(&draft.id).await.unwrap();
        assert!(draft.is_locked);

        // A second undo is refused: the quote is back to sent.
        let err = db.acceptance().undo(&quote.id, None).await.unwrap_err();
        assert_eq!(err.code(), "acceptance_undo_forbidden");
    }
}
