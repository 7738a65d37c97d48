//! Query-string types for the payroll API.
//!
//! Request bodies are the domain request types in [`crate::models`]; this
//! module only holds what arrives in the URL.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{Calendar, Month};
use crate::validation::FieldError;

/// Query for `GET /work-logs`.
///
/// Either a single `date`, or a `from`/`to` span. Missing bounds default to
/// today in the organization calendar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkLogsQuery {
    /// A single local day.
    pub date: Option<NaiveDate>,
    /// First local day of the span.
    pub from: Option<NaiveDate>,
    /// Last local day of the span.
    pub to: Option<NaiveDate>,
}

impl WorkLogsQuery {
    /// Resolves the query to an inclusive span of local days.
    pub fn span(&self, calendar: &Calendar) -> (NaiveDate, NaiveDate) {
        if let Some(date) = self.date {
            return (date, date);
        }
        let today = calendar.today();
        (self.from.unwrap_or(today), self.to.unwrap_or(today))
    }
}

/// Query for `GET /attendances`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthQuery {
    /// The month as `YYYY-MM`.
    #[serde(default)]
    pub month: String,
}

impl MonthQuery {
    /// Parses the month, reporting a field error for the `month` parameter.
    pub fn month(&self) -> Result<Month, FieldError> {
        Month::parse_field("month", &self.month)
    }
}

/// Query for `GET /salary-snapshots`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotsQuery {
    /// Only snapshots of this employee.
    #[serde(rename = "employeeID")]
    pub employee_id: Option<i64>,
    /// Only snapshots of this month, as `YYYY-MM`.
    pub month: Option<String>,
}

impl SnapshotsQuery {
    /// Parses the optional month filter.
    pub fn month(&self) -> Result<Option<Month>, FieldError> {
        self.month
            .as_deref()
            .map(|value| Month::parse_field("month", value))
            .transpose()
    }
}

/// Query for deletes that record who performed them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorQuery {
    /// The employee performing the delete.
    #[serde(rename = "operatorEmployeeID", default)]
    pub operator_employee_id: i64,
}
