//! # Totals Engine
//!
//! Pure arithmetic for line and version totals, in integer cents.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                         │
//! │                                                                     │
//! │  In floating point: 0.1 + 0.2 = 0.30000000000000004  ❌             │
//! │                                                                     │
//! │  OUR SOLUTION: integer cents everywhere, exact decimals only for    │
//! │  quantities and percentages, rounded once per step.                 │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rounding Contract
//! Round half away from zero, applied independently per step:
//!
//! 1. `net  = round(unit_cents × quantity)`
//! 2. `tax  = round(net × rate / 100)` — derived from the **rounded** net,
//!    not from the unrounded product. This ordering is load-bearing:
//!    `(999, 1.5, 20%)` must yield net 1499, tax 300, gross 1799.
//! 3. `gross = net + tax`
//!
//! Version totals are the sum of already-rounded line totals. The sum is
//! authoritative; there is no global recomputation that could drift from
//! the per-line figures a customer sees.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::types::QuoteLine;

// =============================================================================
// Output Types
// =============================================================================

/// Computed totals for one line, in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LineTotals {
    pub net_cents: i64,
    pub tax_cents: i64,
    pub gross_cents: i64,
}

/// Aggregated totals for a version, in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VersionTotals {
    pub lines_net_cents: i64,
    pub lines_tax_cents: i64,
    pub lines_gross_cents: i64,
}

// =============================================================================
// Computation
// =============================================================================

/// Rounds a decimal to whole cents, half away from zero. Values that do
/// not fit an i64 guard to 0 rather than panic.
fn round_cents(value: Decimal) -> i64 {
    value
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(0)
}

/// Computes net, tax and gross cents for one line.
///
/// ## Example
/// ```rust
/// use rust_decimal::Decimal;
/// use quoteflow_core::totals::compute_line_totals;
///
/// let t = compute_line_totals(999, Decimal::new(15, 1), Decimal::from(20));
/// assert_eq!((t.net_cents, t.tax_cents, t.gross_cents), (1499, 300, 1799));
/// ```
pub fn compute_line_totals(
    unit_price_cents: i64,
    quantity: Decimal,
    tax_rate_pct: Decimal,
) -> LineTotals {
    // checked_mul/checked_div: products beyond Decimal's range guard to
    // 0 instead of panicking, same as the i64 guard in round_cents.
    let net = Decimal::from(unit_price_cents)
        .checked_mul(quantity)
        .unwrap_or(Decimal::ZERO);
    let net_cents = round_cents(net);
    // Tax derives from the rounded net, never from the raw product.
    let tax = Decimal::from(net_cents)
        .checked_mul(tax_rate_pct)
        .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
        .unwrap_or(Decimal::ZERO);
    let tax_cents = round_cents(tax);

    LineTotals {
        net_cents,
        tax_cents,
        gross_cents: net_cents + tax_cents,
    }
}

/// Sums pre-rounded line totals into version totals.
///
/// Idempotent: re-invoking with the same lines yields the same result.
pub fn compute_version_totals(lines: &[QuoteLine]) -> VersionTotals {
    let mut totals = VersionTotals::default();
    for line in lines {
        totals.lines_net_cents += line.net_cents;
        totals.lines_tax_cents += line.tax_cents;
        totals.lines_gross_cents += line.gross_cents;
    }
    totals
}

/// Splits a gross amount into deposit and balance cents.
///
/// `None` or zero percent means no deposit: `(0, gross)`.
pub fn split_deposit(gross_cents: i64, deposit_pct: Option<Decimal>) -> (i64, i64) {
    let pct = match deposit_pct {
        Some(pct) if !pct.is_zero() => pct,
        _ => return (0, gross_cents),
    };

    let deposit = round_cents(
        Decimal::from(gross_cents)
            .checked_mul(pct)
            .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
            .unwrap_or(Decimal::ZERO),
    );
    (deposit, gross_cents - deposit)
}

// =============================================================================
// Unit Tests
// =============================================================================
