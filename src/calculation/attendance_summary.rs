//! Attendance summarization.
//!
//! This module reduces raw attendance rows into per-employee aggregates and
//! lays them out as one entry per calendar day for the month view.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::{Attendance, DailyAttendances, EmployeeSummary, PayableType};

/// Summarizes the attendance rows of one employee.
///
/// `working` rows count toward [`EmployeeSummary::working_days`], `benefit`
/// rows count toward the bucket named after their attendance type, and
/// `none` rows only contribute their overtime hours. The summary belongs to
/// the first row's employee; an empty slice yields a zeroed summary with
/// employee id 0.
///
/// # Examples
///
/// ```
/// use payroll_engine::calculation::create_employee_summary;
///
/// let summary = create_employee_summary(&[]);
/// assert_eq!(summary.employee_id, 0);
/// assert_eq!(summary.working_days, 0);
/// assert!(summary.days_by_benefit.is_empty());
/// ```
pub fn create_employee_summary(attendances: &[Attendance]) -> EmployeeSummary {
    let Some(first) = attendances.first() else {
        return EmployeeSummary::default();
    };

    let mut summary = EmployeeSummary {
        employee_id: first.employee_id,
        working_days: 0,
        days_by_benefit: BTreeMap::new(),
        overtime_hours: Decimal::ZERO,
    };

    for attendance in attendances {
        match attendance.attendance_type.payable_type {
            PayableType::Working => summary.working_days += 1,
            PayableType::Benefit => {
                *summary
                    .days_by_benefit
                    .entry(attendance.attendance_type.name.clone())
                    .or_insert(0) += 1;
            }
            PayableType::None => {}
        }
        summary.overtime_hours = summary.overtime_hours.saturating_add(attendance.overtime_hours);
    }

    summary
}

/// Summarizes attendance rows of many employees, one summary per employee
/// in ascending employee id order.
pub fn create_employee_summaries(attendances: &[Attendance]) -> Vec<EmployeeSummary> {
    let mut by_employee: BTreeMap<i64, Vec<Attendance>> = BTreeMap::new();
    for attendance in attendances {
        by_employee
            .entry(attendance.employee_id)
            .or_default()
            .push(attendance.clone());
    }

    by_employee
        .values()
        .map(|rows| create_employee_summary(rows))
        .collect()
}

/// Lays attendance rows out as one entry per calendar day from `from` to
/// `to`, both inclusive.
///
/// Days without attendance still get an entry. When `to` is before `from`
/// the days are listed from `from` backwards. Within a day, rows keep their
/// input order.
pub fn list_at_date(attendances: &[Attendance], from: NaiveDate, to: NaiveDate) -> Vec<DailyAttendances> {
    let mut by_date: BTreeMap<NaiveDate, Vec<Attendance>> = BTreeMap::new();
    for attendance in attendances {
        by_date
            .entry(attendance.date)
            .or_default()
            .push(attendance.clone());
    }

    let step = |date: NaiveDate| {
        if from <= to {
            date.succ_opt()
        } else {
            date.pred_opt()
        }
    };

    let mut days = Vec::new();
    let mut current = Some(from);
    while let Some(date) = current {
        days.push(DailyAttendances {
            date,
            attendances: by_date.remove(&date).unwrap_or_default(),
        });
        if date == to {
            break;
        }
        current = step(date);
    }

    days
}
