//! Exact decimal to minor-unit conversion.
//!
//! Amounts are rounded to cents straight from their decimal text, half away
//! from zero, so `2.005` becomes `201` and `-2.005` becomes `-201`. No binary
//! floating point is involved at any step.

use rust_decimal::Decimal;
use rust_decimal::prelude::{RoundingStrategy, ToPrimitive};

/// Fractional digits kept in minor units.
const MINOR_DIGITS: u32 = 2;

/// Parse a decimal amount into minor units.
///
/// Accepts an optional sign, digits with an optional fractional part, and an
/// optional `e`/`E` exponent. Returns `None` for anything else or when the
/// result does not fit in an `i64`.
pub fn parse_minor_units(text: &str) -> Option<i64> {
    let text = text.trim();
    let amount = if text.contains(['e', 'E']) {
        Decimal::from_scientific(text)
    } else {
        Decimal::from_str_exact(text)
    }
    .ok()?;

    amount
        .round_dp_with_strategy(MINOR_DIGITS, RoundingStrategy::MidpointAwayFromZero)
        .checked_mul(Decimal::ONE_HUNDRED)?
        .to_i64()
}
