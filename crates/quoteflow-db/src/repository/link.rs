//! # Public Access Gateway
//!
//! Customer-facing entry: one link per quote, resolved by an opaque
//! token, optionally gated by a PIN.
//!
//! ## PIN Gate
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                        resolve(token)                               │
//! │                                                                     │
//! │   enabled link? ──no──▶ link_not_found (disabled == absent)         │
//! │        │yes                                                         │
//! │   PIN configured? ──no──▶ quote + current version + lines           │
//! │        │yes                                                         │
//! │   locked_until in the future? ──yes──▶ pin_locked {unlock_at}       │
//! │        │no                                                          │
//! │   pin_required  (content only via submit_pin)                       │
//! │                                                                     │
//! │   submit_pin: lockout first, then constant-time verify.             │
//! │   5 failures → 15-minute lockout. Failure writes commit even        │
//! │   though the call errs.                                             │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{Duration, Utc};
use rand::RngCore;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{info, warn};
use uuid::Uuid;

use quoteflow_core::error::CoreError;
use quoteflow_core::pin::{hash_pin, verify_pin};
use quoteflow_core::types::{ActivityType, PublicLink, PublicQuoteView};
use quoteflow_core::validation::validate_pin;
use quoteflow_core::{PIN_LOCKOUT_MINUTES, PIN_MAX_ATTEMPTS};

use crate::error::DbResult;
use crate::repository::activity::{log_activity, ACTOR_ADMIN, ACTOR_PUBLIC};
use crate::repository::line::fetch_live_lines;
use crate::repository::quote::fetch_live_quote;
use crate::repository::version::fetch_live_version;
use crate::rows::LinkRow;

const LINK_COLUMNS: &str = "id, quote_id, token, pin_hash, failed_attempts, locked_until, \
     enabled, created_at, updated_at";

/// Loads the enabled link for a token. A disabled link is
/// indistinguishable from an absent one.
pub(crate) async fn fetch_enabled_link(
    conn: &mut SqliteConnection,
    token: &str,
) -> DbResult<PublicLink> {
    let row: Option<LinkRow> = sqlx::query_as(&format!(
        "SELECT {LINK_COLUMNS} FROM public_links WHERE token = ?1 AND enabled = 1"
    ))
    .bind(token)
    .fetch_optional(conn)
    .await?;

    match row {
        Some(row) => Ok(PublicLink::from(row)),
        None => Err(CoreError::LinkNotFound.into()),
    }
}

fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::rngs::OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Assembles what a customer is allowed to see: the quote, its current
/// version and that version's live lines.
async fn load_public_view(conn: &mut SqliteConnection, quote_id: &str) -> DbResult<PublicQuoteView> {
    let quote = fetch_live_quote(conn, quote_id).await?;
    let version_id = quote
        .current_version_id
        .clone()
        .ok_or_else(|| crate::error::DbError::Internal(format!(
            "quote {quote_id} has a live link but no current version"
        )))?;
    let version = fetch_live_version(conn, &version_id).await?;
    let lines = fetch_live_lines(conn, &version_id).await?;

    Ok(PublicQuoteView {
        quote,
        version,
        lines,
    })
}

/// Repository for public link operations.
#[derive(Debug, Clone)]
pub struct LinkRepository {
    pool: SqlitePool,
}

impl LinkRepository {
    pub fn new(pool: SqlitePool) -> Self {
        LinkRepository { pool }
    }

    /// Enables sharing for a quote, or rotates the existing link.
    ///
    /// Rotation swaps the token atomically: the old token stops
    /// resolving in the same write that activates the new one. PIN and
    /// failure state are reset either way.
    pub async fn enable(&self, quote_id: &str, pin: Option<&str>) -> DbResult<PublicLink> {
        let pin_hash = match pin {
            Some(pin) => {
                validate_pin(pin)?;
                Some(hash_pin(pin)?)
            }
            None => None,
        };

        let mut tx = self.pool.begin().await?;
        fetch_live_quote(&mut tx, quote_id).await?;

        let existing: Option<String> =
            sqlx::query_scalar("SELECT id FROM public_links WHERE quote_id = ?1")
                .bind(quote_id)
                .fetch_optional(&mut *tx)
                .await?;
        let rotation = existing.is_some();

        let token = generate_token();
        let now = Utc::now();
        sqlx::query(
            r#"
            INSERT INTO public_links (
                id, quote_id, token, pin_hash, failed_attempts, locked_until,
                enabled, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, 0, NULL, 1, ?5, ?5)
            ON CONFLICT (quote_id) DO UPDATE SET
                token = excluded.token,
                pin_hash = excluded.pin_hash,
                failed_attempts = 0,
                locked_until = NULL,
                enabled = 1,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(quote_id)
        .bind(&token)
        .bind(&pin_hash)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let activity_type = if rotation {
            ActivityType::LinkRotated
        } else {
            ActivityType::LinkEnabled
        };
        log_activity(
            &mut tx,
            quote_id,
            None,
            activity_type,
            ACTOR_ADMIN,
            Some(serde_json::json!({ "pin_protected": pin_hash.is_some() })),
        )
        .await?;

        let link = fetch_enabled_link(&mut tx, &token).await?;
        tx.commit().await?;
        info!(quote_id, rotation, "Public link enabled");
        Ok(link)
    }

    /// Disables the quote's link. The token stops resolving; a later
    /// enable() issues a fresh one.
    pub async fn disable(&self, quote_id: &str) -> DbResult<()> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            "UPDATE public_links SET enabled = 0, updated_at = ?2 WHERE quote_id = ?1 AND enabled = 1",
        )
        .bind(quote_id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;
        if result.rows_affected() == 0 {
            return Err(CoreError::LinkNotFound.into());
        }

        log_activity(
            &mut tx,
            quote_id,
            None,
            ActivityType::LinkDisabled,
            ACTOR_ADMIN,
            None,
        )
        .await?;
        tx.commit().await?;
        Ok(())
    }

    /// Resolves a token into the public view, or reports what stands in
    /// the way (`pin_required` / `pin_locked`). Content is never served
    /// past an unverified PIN.
    pub async fn resolve(&self, token: &str) -> DbResult<PublicQuoteView> {
        let mut conn = self.pool.acquire().await?;
        let link = fetch_enabled_link(&mut conn, token).await?;

        if link.pin_hash.is_some() {
            if let Some(locked_until) = link.locked_until {
                if locked_until > Utc::now() {
                    return Err(CoreError::PinLocked {
                        unlock_at: locked_until,
                    }
                    .into());
                }
            }
            return Err(CoreError::PinRequired.into());
        }

        load_public_view(&mut conn, &link.quote_id).await
    }

    /// Verifies a PIN attempt against the link.
    ///
    /// The lockout check comes first: while locked, even the correct
    /// PIN is refused and the counter does not move. Failure state is
    /// committed before the error returns, so abandoned attempts still
    /// count.
    pub async fn submit_pin(&self, token: &str, pin: &str) -> DbResult<PublicQuoteView> {
        let mut tx = self.pool.begin().await?;
        let link = fetch_enabled_link(&mut tx, token).await?;

        let Some(pin_hash) = link.pin_hash.as_deref() else {
            // No PIN configured; behaves like a plain resolve.
            let view = load_public_view(&mut tx, &link.quote_id).await?;
            tx.commit().await?;
            return Ok(view);
        };

        let now = Utc::now();
        if let Some(locked_until) = link.locked_until {
            if locked_until > now {
                return Err(CoreError::PinLocked {
                    unlock_at: locked_until,
                }
                .into());
            }
        }

        if verify_pin(pin, pin_hash) {
            sqlx::query(
                "UPDATE public_links SET failed_attempts = 0, locked_until = NULL, updated_at = ?2 WHERE id = ?1",
            )
            .bind(&link.id)
            .bind(now)
            .execute(&mut *tx)
            .await?;
            log_activity(
                &mut tx,
                &link.quote_id,
                None,
                ActivityType::PinVerified,
                ACTOR_PUBLIC,
                None,
            )
            .await?;

            let view = load_public_view(&mut tx, &link.quote_id).await?;
            tx.commit().await?;
            return Ok(view);
        }

        let failed_attempts = link.failed_attempts + 1;
        log_activity(
            &mut tx,
            &link.quote_id,
            None,
            ActivityType::PinFailed,
            ACTOR_PUBLIC,
            Some(serde_json::json!({ "failed_attempts": failed_attempts })),
        )
        .await?;

        if failed_attempts >= PIN_MAX_ATTEMPTS {
            let unlock_at = now + Duration::minutes(PIN_LOCKOUT_MINUTES);
            sqlx::query(
                r#"
                UPDATE public_links SET failed_attempts = ?2, locked_until = ?3, updated_at = ?4
                WHERE id = ?1
                "#,
            )
            .bind(&link.id)
            .bind(failed_attempts)
            .bind(unlock_at)
            .bind(now)
            .execute(&mut *tx)
            .await?;
            log_activity(
                &mut tx,
                &link.quote_id,
                None,
                ActivityType::PinLocked,
                ACTOR_PUBLIC,
                Some(serde_json::json!({ "unlock_at": unlock_at })),
            )
            .await?;
            tx.commit().await?;

            warn!(quote_id = %link.quote_id, "Public link locked after repeated PIN failures");
            return Err(CoreError::PinLocked { unlock_at }.into());
        }

        sqlx::query(
            "UPDATE public_links SET failed_attempts = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(&link.id)
        .bind(failed_attempts)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        Err(CoreError::PinInvalid {
            remaining_attempts: PIN_MAX_ATTEMPTS - failed_attempts,
        }
        .into())
    }

    /// The quote's link regardless of enabled state, for administration.
    pub async fn get_for_quote(&self, quote_id: &str) -> DbResult<PublicLink> {
        let row: Option<LinkRow> = sqlx::query_as(&format!(
            "SELECT {LINK_COLUMNS} FROM public_links WHERE quote_id = ?1"
        ))
        .bind(quote_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(PublicLink::from(row)),
            None => Err(CoreError::LinkNotFound.into()),
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
    async fn test_resolve_pinless_link() {
        let db = test_db().await;
        let quote = db
            .quotes()
            .create(new_quote("Shared"), &branding())
            .await
            .unwrap();
        let link = db.links().enable(&quote.id, None).await.unwrap();
        assert_eq!(link.token.len(), 64);

        let view = db.links().resolve(&link.token).await.unwrap();
        assert_eq!(view.quote.id, quote.id);
        assert_eq!(view.version.version_number, 1);
        assert_eq!(view.lines.len(), 2);

        let err = db.links().resolve("deadbeef").await.unwrap_err();
        assert_eq!(err.code(), "link_not_found");
    }

    #[tokio::test]
    async fn test_rotation_invalidates_old_token() {
        let db = test_db().await;
        let quote = db
            .quotes()
            .create(new_quote("Rotated"), &branding())
            .await
            .unwrap();

        let first = db.links().enable(&quote.id, None).await.unwrap();
        let second = db.links().enable(&quote.id, None).await.unwrap();
        assert_ne!(first.token, second.token);

        let err = db.links().resolve(&first.token).await.unwrap_err();
        assert_eq!(err.code(), "link_not_found");
        assert!(db.links().resolve(&second.token).await.is_ok());

        let activities = db.activities().list_for_quote(&quote.id).await.unwrap();
        assert!(activities
            .iter()
            .any(|a| a.activity_type == ActivityType::LinkEnabled));
        assert!(activities
            .iter()
            .any(|a| a.activity_type == ActivityType::LinkRotated));
    }

    #[tokio::test]
    async fn test_disable_stops_resolution() {
        let db = test_db().await;
        let quote = db
            .quotes()
            .create(new_quote("Disabled"), &branding())
            .await
            .unwrap();
        let link = db.links().enable(&quote.id, None).await.unwrap();

        db.links().disable(&quote.id).await.unwrap();
        let err = db.links().resolve(&link.token).await.unwrap_err();
        assert_eq!(err.code(), "link_not_found");

        // Double disable reports no live link.
        let err = db.links().disable(&quote.id).await.unwrap_err();
        assert_eq!(err.code(), "link_not_found");
    }

    #[tokio::test]
    async fn test_pin_gate_and_verification() {
        let db = test_db().await;
        let quote = db
            .quotes()
            .create(new_quote("PIN gated"), &branding())
            .await
            .unwrap();
        let link = db.links().enable(&quote.id, Some("123456")).await.unwrap();

        // Content is withheld until the PIN clears.
        let err = db.links().resolve(&link.token).await.unwrap_err();
        assert_eq!(err.code(), "pin_required");

        let err = db.links().submit_pin(&link.token, "000000").await.unwrap_err();
        assert_eq!(err.code(), "pin_invalid");

        let view = db.links().submit_pin(&link.token, "123456").await.unwrap();
        assert_eq!(view.quote.id, quote.id);

        // Success reset the failure counter.
        let link = db.links().get_for_quote(&quote.id).await.unwrap();
        assert_eq!(link.failed_attempts, 0);
    }

    #[tokio::test]
    async fn test_lockout_after_five_failures() {
        let db = test_db().await;
        let quote = db
            .quotes()
            .create(new_quote("Locked"), &branding())
            .await
            .unwrap();
        let link = db.links().enable(&quote.id, Some("4711")).await.unwrap();

        for attempt in 1..=4 {
            let err = db.links().submit_pin(&link.token, "0000").await.unwrap_err();
            assert_eq!(err.code(), "pin_invalid");
            let stored = db.links().get_for_quote(&quote.id).await.unwrap();
            assert_eq!(stored.failed_attempts, attempt);
        }

        // Fifth failure locks for fifteen minutes.
        let err = db.links().submit_pin(&link.token, "0000").await.unwrap_err();
        assert_eq!(err.code(), "pin_locked");

        // While locked even the correct PIN is refused.
        let err = db.links().submit_pin(&link.token, "4711").await.unwrap_err();
        assert_eq!(err.code(), "pin_locked");
        let err = db.links().resolve(&link.token).await.unwrap_err();
        assert_eq!(err.code(), "pin_locked");

        let activities = db.activities().list_for_quote(&quote.id).await.unwrap();
        let failures = activities
            .iter()
            .filter(|a| a.activity_type == ActivityType::PinFailed)
            .count();
        assert_eq!(failures, 5);
        assert!(activities
            .iter()
            .any(|a| a.activity_type == ActivityType::PinLocked));

        // Rotation clears the lockout.
        let fresh = db.links().enable(&quote.id, Some("4711")).await.unwrap();
        assert!(db.links().submit_pin(&fresh.token, "4711").await.is_ok());
    }

    #[tokio::test]
    async fn test_lockout_expiry_restores_correct_pin() {
        let db = test_db().await;
        let quote = db
            .quotes()
            .create(new_quote("Thawed"), &branding())
            .await
            .unwrap();
        let link = db.links().enable(&quote.id, Some("4711")).await.unwrap();

        for _ in 0..5 {
            let _ = db.links().submit_pin(&link.token, "0000").await;
        }
        let err = db.links().submit_pin(&link.token, "4711").await.unwrap_err();
        assert_eq!(err.code(), "pin_locked");

        // Move the unlock time into the past.
        sqlx::query("UPDATE public_links SET locked_until = ?2 WHERE quote_id = ?1")
            .bind(&quote.id)
            .bind(Utc::now() - Duration::minutes(1))
            .execute(db.pool())
            .await
            .unwrap();

        // The correct PIN goes through and clears the failure state.
        let view = db.links().submit_pin(&link.token, "4711").await.unwrap();
        assert_eq!(view.quote.id, quote.id);
        let stored = db.links().get_for_quote(&quote.id).await.unwrap();
        assert_eq!(stored.failed_attempts, 0);
        assert_eq!(stored.locked_until, None);

        // Lock again and expire again: a wrong PIN re-locks immediately,
        // since the counter is still at the threshold. The window after
        // expiry admits exactly one attempt.
        for _ in 0..5 {
            let _ = db.links().submit_pin(&link.token, "0000").await;
        }
        sqlx::query("UPDATE public_links SET locked_until = ?2 WHERE quote_id = ?1")
            .bind(&quote.id)
            .bind(Utc::now() - Duration::minutes(1))
            .execute(db.pool())
            .await
            .unwrap();

        let err = db.links().submit_pin(&link.token, "0000").await.unwrap_err();
        assert_eq!(err.code(), "pin_locked");
    }

    #[tokio::test]
    async fn test_invalid_pin_shape_rejected_on_enable() {
        let db = test_db().await;
        let quote = db
            .quotes()
            .create(new_quote("Bad PIN"), &branding())
            .await
            .unwrap();

        let err = db.links().enable(&quote.id, Some("12")).await.unwrap_err();
        assert_eq!(err.code(), "validation");
        let err = db.links().enable(&quote.id, Some("12ab56")).await.unwrap_err();
        assert_eq!(err.code(), "validation");
    }
}
