//! # Version Diff Engine
//!
//! Structural delta between two quote versions: a meta diff over a fixed
//! field set and a line diff compared **by position index**.
//!
//! ## Positional Comparison
//! Lines are paired index 0 against index 0, index 1 against index 1, up
//! to the longer list. A position present only in "from" is `removed`,
//! only in "to" is `added`, present in both with differing content is
//! `changed`, identical pairs are omitted.
//!
//! Known limitation, kept on purpose: inserting or deleting in the middle
//! of a list shows up as a cascade of `changed` entries rather than one
//! `added`/`removed`. Consumers depend on this exact output shape, so the
//! comparison is not content-addressed.

use serde::Serialize;

use crate::types::{QuoteLine, QuoteVersion};

// =============================================================================
// Output Types
// =============================================================================

/// One changed metadata field, with stringified before/after values.
/// Dates render as ISO-8601; absent values are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetaChange {
    pub field: &'static str,
    pub from: Option<String>,
    pub to: Option<String>,
}

/// How a position differs between the two versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LineChangeKind {
    Added,
    Removed,
    Changed,
}

/// The compared content of one line side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineSnapshot {
    pub label: String,
    pub description: Option<String>,
    pub quantity: String,
    pub unit_price_cents: i64,
    pub tax_rate_pct: String,
    pub net_cents: i64,
    pub tax_cents: i64,
    pub gross_cents: i64,
}

impl From<&QuoteLine> for LineSnapshot {
    fn from(line: &QuoteLine) -> Self {
        LineSnapshot {
            label: line.label.clone(),
            description: line.description.clone(),
            quantity: line.quantity.to_string(),
            unit_price_cents: line.unit_price_cents,
            tax_rate_pct: line.tax_rate_pct.to_string(),
            net_cents: line.net_cents,
            tax_cents: line.tax_cents,
            gross_cents: line.gross_cents,
        }
    }
}

/// One entry of the line diff. `index` is the 0-based position index the
/// two sides were paired under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineChange {
    pub index: usize,
    pub kind: LineChangeKind,
    pub from: Option<LineSnapshot>,
    pub to: Option<LineSnapshot>,
}

/// Full delta between two versions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VersionDiff {
    pub meta: Vec<MetaChange>,
    pub lines: Vec<LineChange>,
}

impl VersionDiff {
    pub fn is_empty(&self) -> bool {
        self.meta.is_empty() && self.lines.is_empty()
    }
}

// =============================================================================
// Computation
// =============================================================================

fn meta_change(
    field: &'static str,
    from: Option<String>,
    to: Option<String>,
) -> Option<MetaChange> {
    if from == to {
        None
    } else {
        Some(MetaChange { field, from, to })
    }
}

/// Diffs the fixed metadata field set: label, validity date, deposit
/// percent, currency.
pub fn diff_meta(from: &QuoteVersion, to: &QuoteVersion) -> Vec<MetaChange> {
    [
        meta_change("label", from.label.clone(), to.label.clone()),
        meta_change(
            "valid_until",
            from.valid_until.map(|d| d.to_string()),
            to.valid_until.map(|d| d.to_string()),
        ),
        meta_change(
            "deposit_pct",
            from.deposit_pct.map(|p| p.to_string()),
            to.deposit_pct.map(|p| p.to_string()),
        ),
        meta_change(
            "currency",
            Some(from.currency.as_str().to_string()),
            Some(to.currency.as_str().to_string()),
        ),
    ]
    .into_iter()
    .flatten()
    .collect()
}

/// Diffs two line lists positionally. Both slices are expected in
/// position order (live lines only).
pub fn diff_lines(from_lines: &[QuoteLine], to_lines: &[QuoteLine]) -> Vec<LineChange> {
    let len = from_lines.len().max(to_lines.len());
    let mut changes = Vec::new();

    for index in 0..len {
        let from = from_lines.get(index).map(LineSnapshot::from);
        let to = to_lines.get(index).map(LineSnapshot::from);

        let kind = match (&from, &to) {
            (Some(_), None) => LineChangeKind::Removed,
            (None, Some(_)) => LineChangeKind::Added,
            (Some(a), Some(b)) if a != b => LineChangeKind::Changed,
            _ => continue,
        };

        changes.push(LineChange {
            index,
            kind,
            from,
            to,
        });
    }

    changes
}

/// Full diff of two versions and their (position-ordered, live) lines.
pub fn diff_versions(
    from: &QuoteVersion,
    from_lines: &[QuoteLine],
    to: &QuoteVersion,
    to_lines: &[QuoteLine],
) -> VersionDiff {
    VersionDiff {
        meta: diff_meta(from, to),
        lines: diff_lines(from_lines, to_lines),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
