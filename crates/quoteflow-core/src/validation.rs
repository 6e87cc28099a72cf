//! # Validation Module
//!
//! Domain-level input checks for the quote engine.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       Validation Layers                             │
//! │                                                                     │
//! │  Layer 1: Transport (out of scope)                                  │
//! │  ├── Shape/type validation, request marshaling                      │
//! │  └── Rejects malformed payloads before they reach the engine        │
//! │           │                                                         │
//! │           ▼                                                         │
//! │  Layer 2: THIS MODULE - domain constraints                          │
//! │  ├── Ranges the business owns (tax bps, percentages, pagination)    │
//! │  └── Non-empty patches, PIN shape                                   │
//! │           │                                                         │
//! │           ▼                                                         │
//! │  Layer 3: Database (SQLite)                                         │
//! │  └── NOT NULL / UNIQUE / FK constraints                             │
//! │                                                                     │
//! │  Defense in depth: multiple layers catch different errors           │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use rust_decimal::Decimal;

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Default page size for quote listings.
pub const DEFAULT_PAGE_LIMIT: i64 = 50;
/// Maximum page size for quote listings.
pub const MAX_PAGE_LIMIT: i64 = 100;
/// Tax rates above 25% are outside this engine's domain.
pub const MAX_TAX_RATE_BPS: i64 = 2500;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a required short text field (customer name, title, label).
pub fn validate_required_text(field: &'static str, value: &str) -> ValidationResult<()> {
    let value = value.trim();

    if value.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if value.len() > 200 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 200,
        });
    }

    Ok(())
}

/// Validates a public-link PIN: 4-12 digits.
pub fn validate_pin(pin: &str) -> ValidationResult<()> {
    if pin.len() < 4 || pin.len() > 12 {
        return Err(ValidationError::OutOfRange {
            field: "pin".to_string(),
            min: 4,
            max: 12,
        });
    }

    if !pin.chars().all(|c| c.is_ascii_digit()) {
        return Err(ValidationError::InvalidFormat {
            field: "pin".to_string(),
            reason: "must contain only digits".to_string(),
        });
    }

    Ok(())
}

/// Validates a UUID string format.
pub fn validate_uuid(field: &'static str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a line quantity: strictly positive.
pub fn validate_quantity(quantity: Decimal) -> ValidationResult<()> {
    if quantity <= Decimal::ZERO {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    Ok(())
}

/// Validates a unit price in cents: non-negative (zero = free line).
pub fn validate_unit_price_cents(cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::OutOfRange {
            field: "unit_price_cents".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok(())
}

/// Validates a tax rate given as decimal percent: 0% to 25%
/// (0-2500 basis points).
pub fn validate_tax_rate_pct(rate: Decimal) -> ValidationResult<()> {
    let bps = rate * Decimal::ONE_HUNDRED;
    if bps < Decimal::ZERO || bps > Decimal::from(MAX_TAX_RATE_BPS) {
        return Err(ValidationError::OutOfRange {
            field: "tax_rate".to_string(),
            min: 0,
            max: MAX_TAX_RATE_BPS,
        });
    }

    Ok(())
}

/// Validates a percentage field (discount, deposit): 0 to 100.
pub fn validate_percent(field: &'static str, pct: Decimal) -> ValidationResult<()> {
    if pct < Decimal::ZERO || pct > Decimal::ONE_HUNDRED {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: 100,
        });
    }

    Ok(())
}

/// Validates and normalizes pagination: limit 1-100 (default 50),
/// offset >= 0 (default 0).
pub fn validate_pagination(
    limit: Option<i64>,
    offset: Option<i64>,
) -> ValidationResult<(i64, i64)> {
    let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    if !(1..=MAX_PAGE_LIMIT).contains(&limit) {
        return Err(ValidationError::OutOfRange {
            field: "limit".to_string(),
            min: 1,
            max: MAX_PAGE_LIMIT,
        });
    }

    let offset = offset.unwrap_or(0);
    if offset < 0 {
        return Err(ValidationError::OutOfRange {
            field: "offset".to_string(),
            min: 0,
            max: i64::MAX,
        });
    }

    Ok((limit, offset))
}

// =============================================================================
// Unit Tests
// =============================================================================
