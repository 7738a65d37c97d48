//! Calculation logic for the payroll engine.
//!
//! This module contains the pure calculation functions: attendance
//! summaries and the per-day month view, work-unit billing, overtime hour
//! pricing and the monthly salary formula that combines them.

mod attendance_summary;
mod overtime;
mod salary;
mod work_units;

pub use attendance_summary::{create_employee_summaries, create_employee_summary, list_at_date};
pub use overtime::{OVERTIME_FEE_ALLOWANCE, OVERTIME_HOURS_PER_SHIFT, hourly_overtime_fee};
pub use salary::{
    OVERTIME_COMPONENT, SHIFT_COMPONENT, SalaryInputs, WORK_UNITS_COMPONENT, calculate_salary,
};
pub use work_units::{WORK_UNIT_FEE, total_work_units, work_units_fee};
