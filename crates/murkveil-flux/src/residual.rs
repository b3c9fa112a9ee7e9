//! Fractional-residual carryover.
//!
//! Each tracked actor holds a running [`Decimal`] accumulator. Incoming
//! flux is added to it; only when the magnitude reaches 1.0 does the
//! accumulator emit a whole-unit delta (truncated toward zero), and what
//! was emitted is subtracted so the remainder persists to the next
//! cadence. Sub-unit drift is therefore never lost and never
//! double-counted: over any cadence split, the emitted total differs from
//! the exact sum by strictly less than one unit.

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

/// Fold `incoming` into the accumulator and drain any whole units.
///
/// Returns the emitted integer delta (zero while the accumulator's
/// magnitude stays below 1.0).
pub fn settle(residual: &mut Decimal, incoming: Decimal) -> i32 {
    *residual = residual.saturating_add(incoming);
    if residual.abs() < Decimal::ONE {
        return 0;
    }

    let whole = residual.trunc();
    *residual = residual.saturating_sub(whole);
    whole
        .to_i32()
        .unwrap_or(if whole.is_sign_negative() { i32::MIN } else { i32::MAX })
}
