//! Input coercion and validation
//!
//! Numeric form input is never rejected: anything that does not read as a
//! number becomes 0. Structured requests (transfers) are validated before they
//! reach the backend.

use std::str::FromStr;

use rust_decimal::Decimal;

use crate::models::TransferRequest;

// ============================================================================
// Numeric input coercion
// ============================================================================

/// Largest stock count a single field can hold
pub const MAX_QUANTITY: i64 = 1_000_000_000;

/// Coerce a raw quantity field to a stock count.
///
/// Accepts integers, decimals (truncated toward zero) and exponent notation.
/// Empty, non-numeric, non-finite and negative input all become 0; anything
/// above [`MAX_QUANTITY`] is capped.
pub fn coerce_quantity(raw: &str) -> i64 {
    let trimmed = raw.trim();
    if let Ok(value) = trimmed.parse::<i64>() {
        return value.clamp(0, MAX_QUANTITY);
    }
    match trimmed.parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => {
            value.trunc().min(MAX_QUANTITY as f64) as i64
        }
        _ => 0,
    }
}

/// Coerce a raw money field to an amount. Same rules as [`coerce_quantity`].
pub fn coerce_amount(raw: &str) -> Decimal {
    let trimmed = raw.trim();
    let parsed = Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .unwrap_or(Decimal::ZERO);
    parsed.max(Decimal::ZERO)
}

// ============================================================================
// Request validation
// ============================================================================

/// Validate a transfer request before it is filed
pub fn validate_transfer_request(request: &TransferRequest) -> Result<(), &'static str> {
    if request.product_id.is_empty() {
        return Err("Select a product to transfer");
    }
    if request.to_bar.is_empty() {
        return Err("Select a destination bar");
    }
    if request.to_bar == request.from_bar {
        return Err("Destination bar must differ from the source bar");
    }
    if request.qty < 1 {
        return Err("Transfer quantity must be at least 1");
    }
    Ok(())
}
