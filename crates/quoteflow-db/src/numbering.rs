//! # Numbering Service
//!
//! Allocates globally unique, humanly sequential document numbers,
//! one counter row per calendar year.
//!
//! ## Race Freedom
//! The counter is never read-then-written. A single upsert statement
//! creates the row if absent, increments it otherwise, and returns the
//! new value:
//!
//! ```text
//! INSERT INTO quote_counters (year, last_seq) VALUES (?, 1)
//! ON CONFLICT (year) DO UPDATE SET last_seq = last_seq + 1
//! RETURNING last_seq
//! ```
//!
//! Two transactions reserving concurrently serialize on the row write;
//! neither can observe the other's intermediate state. The residual
//! failure mode - a uniqueness conflict on the final quote insert under
//! a pathological counter reset - is handled by the caller, which
//! retries the whole reserve+insert cycle a bounded number of times.

use sqlx::SqliteConnection;

use quoteflow_core::NUMBER_SEQ_PAD;

use crate::error::DbResult;

/// Reserves the next document number for `year` inside the caller's
/// transaction. Format: `PREFIX-YEAR-SEQ`, SEQ zero-padded to three
/// digits and growing wider past 999.
pub async fn reserve_quote_number(
    conn: &mut SqliteConnection,
    prefix: &str,
    year: i32,
) -> DbResult<String> {
    let seq: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO quote_counters (year, last_seq) VALUES (?1, 1)
        ON CONFLICT (year) DO UPDATE SET last_seq = last_seq + 1
        RETURNING last_seq
        "#,
    )
    .bind(year)
    .fetch_one(conn)
    .await?;

    Ok(format_number(prefix, year, seq))
}

fn format_number(prefix: &str, year: i32, seq: i64) -> String {
    format!("{prefix}-{year}-{seq:0pad$}", pad = NUMBER_SEQ_PAD)
}

// =============================================================================
// Unit Tests
// =============================================================================
