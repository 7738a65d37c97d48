//! The monthly salary formula.
//!
//! This module turns the inputs gathered for one employee and one month into
//! an itemized [`Salary`]. It does no I/O; fetching the inputs is the job of
//! the salary calculator service.

use rust_decimal::Decimal;

use super::{hourly_overtime_fee, work_units_fee};
use crate::models::{
    AdditionalComponent, Component, Employee, EmployeeSummary, ExtraInfo, Salary,
};

/// Description of the worked-shifts line.
pub const SHIFT_COMPONENT: &str = "Banyak Shift Jaga";

/// Description of the overtime-hours line.
pub const OVERTIME_COMPONENT: &str = "Banyak Jam Lembur";

/// Description of the work-unit line.
pub const WORK_UNITS_COMPONENT: &str = "Tes dan Resep";

/// Everything the salary formula reads for one employee and one month.
#[derive(Debug, Clone)]
pub struct SalaryInputs {
    /// The employee being paid.
    pub employee: Employee,
    /// The employee's attendance summary for the month.
    pub attendance: EmployeeSummary,
    /// Billable work units logged in the month.
    pub total_work_units: Decimal,
    /// One-off components for the month, in creation order.
    pub additional_components: Vec<AdditionalComponent>,
    /// Notes for the month.
    pub extra_infos: Vec<ExtraInfo>,
}

/// Computes an itemized salary.
///
/// Components come out in a fixed order:
/// 1. worked shifts at the shift fee,
/// 2. overtime hours at [`hourly_overtime_fee`],
/// 3. one line per benefit type, by name, at the shift fee,
/// 4. work units at the per-unit fee,
/// 5. every additional component unchanged.
///
/// The result depends on nothing but the inputs.
pub fn calculate_salary(inputs: SalaryInputs) -> Salary {
    let SalaryInputs {
        employee,
        attendance,
        total_work_units,
        additional_components,
        extra_infos,
    } = inputs;

    let shift_fee = employee.shift_fee;

    let mut components = vec![
        Component::new(
            SHIFT_COMPONENT,
            shift_fee,
            Decimal::from(attendance.working_days),
        ),
        Component::new(
            OVERTIME_COMPONENT,
            hourly_overtime_fee(shift_fee),
            attendance.overtime_hours,
        ),
    ];

    // BTreeMap iteration is already in name order.
    components.extend(
        attendance
            .days_by_benefit
            .iter()
            .map(|(name, days)| Component::new(name.clone(), shift_fee, Decimal::from(*days))),
    );

    components.push(Component::new(
        WORK_UNITS_COMPONENT,
        work_units_fee(total_work_units),
        Decimal::ONE,
    ));

    components.extend(additional_components.iter().map(AdditionalComponent::to_component));

    Salary {
        components,
        extra_infos,
    }
}
