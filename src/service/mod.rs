//! Services for the payroll engine.
//!
//! [`SalaryCalculator`] computes salaries from any [`crate::store::SalarySource`];
//! [`PayrollService`] is the validated, time-bounded front door used by the
//! HTTP layer.

mod calculator;
mod payroll;

pub use calculator::SalaryCalculator;
pub use payroll::{DEFAULT_REQUEST_TIMEOUT, PayrollService};
