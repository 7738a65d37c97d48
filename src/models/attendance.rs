//! Attendance models.
//!
//! Attendance is a single mutable fact per employee per day. Each row points
//! at an [`AttendanceType`] whose [`PayableType`] decides how the day counts
//! toward pay.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::validation::{FieldError, MAX_OVERTIME_HOURS, ValidationErrors, Validator};

/// How a day of a given attendance type contributes to pay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayableType {
    /// The employee worked and is paid their shift fee.
    Working,
    /// The employee did not work but is paid their shift fee as a benefit.
    Benefit,
    /// The employee did not work and is not paid.
    None,
}

impl PayableType {
    /// Every payable type, in declaration order.
    pub const ALL: [PayableType; 3] = [
        PayableType::Working,
        PayableType::Benefit,
        PayableType::None,
    ];

    /// The stored and serialized name.
    pub fn as_str(&self) -> &'static str {
        match self {
            PayableType::Working => "working",
            PayableType::Benefit => "benefit",
            PayableType::None => "none",
        }
    }
}

impl fmt::Display for PayableType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PayableType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PayableType::ALL
            .into_iter()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("invalid payable type: {}", s))
    }
}

/// A kind of attendance, such as "Masuk", "Sakit" or "Cuti".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttendanceType {
    /// Unique identifier for the type.
    pub id: i64,
    /// Display name, also used as the salary line for benefit days.
    pub name: String,
    /// How days of this type are paid.
    pub payable_type: PayableType,
    /// When the type was created.
    pub created_at: DateTime<Utc>,
    /// When the type last changed.
    pub updated_at: DateTime<Utc>,
}

/// One employee's attendance on one day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    /// Unique identifier for the row.
    pub id: i64,
    /// The employee the attendance belongs to.
    #[serde(rename = "employeeID")]
    pub employee_id: i64,
    /// The local calendar date.
    pub date: NaiveDate,
    /// The attendance type, joined.
    #[serde(rename = "type")]
    pub attendance_type: AttendanceType,
    /// Overtime worked on the day, in hours.
    pub overtime_hours: Decimal,
    /// When the row was first written.
    pub created_at: DateTime<Utc>,
    /// When the row was last written.
    pub updated_at: DateTime<Utc>,
    /// The employee who last wrote the row.
    #[serde(rename = "lastOperatorEmployeeID")]
    pub last_operator_employee_id: i64,
}

/// Per-employee aggregate of a set of attendance rows.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeSummary {
    /// The employee the rows belong to, 0 for an empty set.
    #[serde(rename = "employeeID")]
    pub employee_id: i64,
    /// Number of `working` days.
    pub working_days: u32,
    /// Number of `benefit` days per attendance type name.
    pub days_by_benefit: BTreeMap<String, u32>,
    /// Total overtime hours across every row.
    pub overtime_hours: Decimal,
}

/// Every attendance recorded on one calendar day.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyAttendances {
    /// The calendar day.
    pub date: NaiveDate,
    /// Attendance rows on that day, possibly empty.
    pub attendances: Vec<Attendance>,
}

/// A month of attendance: the per-day list and the per-employee totals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyAttendance {
    /// One entry per day of the month, in order.
    pub daily_attendances: Vec<DailyAttendances>,
    /// One summary per employee with any attendance in the month.
    pub employee_summaries: Vec<EmployeeSummary>,
}

/// Request to record an attendance for an (employee, date) pair.
///
/// The employee, date and operator come from the request path and the
/// caller's identity rather than the body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertAttendanceRequest {
    /// The employee the attendance belongs to.
    #[serde(skip)]
    pub employee_id: i64,
    /// The local calendar date.
    #[serde(skip, default = "epoch_date")]
    pub date: NaiveDate,
    /// The attendance type to record.
    #[serde(rename = "typeID", default)]
    pub type_id: i64,
    /// Overtime worked on the day, in hours.
    #[serde(default)]
    pub overtime_hours: Decimal,
    /// The employee recording the attendance.
    #[serde(rename = "operatorEmployeeID", default)]
    pub operator_employee_id: i64,
}

fn epoch_date() -> NaiveDate {
    NaiveDate::default()
}

impl UpsertAttendanceRequest {
    /// Checks ids are positive and overtime is between 0 and 24 hours.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        Validator::new()
            .id("employeeID", self.employee_id)
            .id("typeID", self.type_id)
            .non_negative("overtimeHours", self.overtime_hours)
            .at_most("overtimeHours", self.overtime_hours, MAX_OVERTIME_HOURS)
            .id("operatorEmployeeID", self.operator_employee_id)
            .finish()
    }
}

/// Request to create an attendance type.
///
/// The payable type is kept as text so an unknown value is reported as a
/// field error rather than a body parse failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateAttendanceTypeRequest {
    /// Display name of the type.
    #[serde(default)]
    pub name: String,
    /// One of `working`, `benefit` or `none`.
    #[serde(default)]
    pub payable_type: String,
}

impl CreateAttendanceTypeRequest {
    /// Validates the request and returns the parsed payable type.
    pub fn validate(&self) -> Result<PayableType, ValidationErrors> {
        let payable_type = self.payable_type.parse::<PayableType>();
        Validator::new()
            .required("name", &self.name)
            .check(
                payable_type.is_ok(),
                "payableType",
                "must be one of working, benefit, none",
            )
            .finish()?;
        payable_type.map_err(|message| FieldError::new("payableType", message).into())
    }
}
