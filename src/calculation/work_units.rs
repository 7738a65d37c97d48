//! Work-log unit billing.

use rust_decimal::Decimal;

use crate::models::WorkLog;

/// The pay for one billable work unit.
pub const WORK_UNIT_FEE: Decimal = Decimal::from_parts(1_000, 0, 0, false, 0);

/// Sums the captured multipliers of every unit of every log.
///
/// Callers pass only live logs with live units; the store already leaves
/// soft-deleted rows out.
pub fn total_work_units(work_logs: &[WorkLog]) -> Decimal {
    work_logs
        .iter()
        .flat_map(|log| log.units.iter())
        .map(|unit| unit.work_multiplier)
        .fold(Decimal::ZERO, Decimal::saturating_add)
}

/// The "Tes dan Resep" amount for a number of work units.
pub fn work_units_fee(total_units: Decimal) -> Decimal {
    total_units.saturating_mul(WORK_UNIT_FEE)
}
