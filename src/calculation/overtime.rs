//! Overtime hour pricing.

use rust_decimal::Decimal;

use crate::models::round_up;

/// Added to the shift fee before it is spread over an overtime shift.
pub const OVERTIME_FEE_ALLOWANCE: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

/// The number of hours the adjusted shift fee is spread over.
pub const OVERTIME_HOURS_PER_SHIFT: Decimal = Decimal::from_parts(7, 0, 0, false, 0);

/// Returns the pay for one overtime hour: `(shift_fee + 10000) / 7`,
/// rounded up to a whole currency unit.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::hourly_overtime_fee;
/// use rust_decimal::Decimal;
///
/// assert_eq!(hourly_overtime_fee(Decimal::from(4_000)), Decimal::from(2_000));
/// assert_eq!(hourly_overtime_fee(Decimal::from(5_000)), Decimal::from(2_143));
/// ```
pub fn hourly_overtime_fee(shift_fee: Decimal) -> Decimal {
    round_up(shift_fee.saturating_add(OVERTIME_FEE_ALLOWANCE) / OVERTIME_HOURS_PER_SHIFT)
}
