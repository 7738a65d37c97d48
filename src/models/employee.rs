//! Employee model and related types.
//!
//! This module defines the Employee struct and the requests that create an
//! employee or change their shift fee.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::validation::{MAX_AMOUNT, ValidationErrors, Validator};

/// Represents an employee of the pharmacy.
///
/// Employees are never deleted; every other record references them by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    /// Unique identifier for the employee.
    pub id: i64,
    /// The employee's display name.
    pub name: String,
    /// The base pay for one shift.
    pub shift_fee: Decimal,
    /// When the employee was created.
    pub created_at: DateTime<Utc>,
    /// When the employee record (usually the shift fee) last changed.
    pub updated_at: DateTime<Utc>,
}

/// Request to add an employee to the directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEmployeeRequest {
    /// The employee's display name.
    #[serde(default)]
    pub name: String,
    /// The base pay for one shift.
    #[serde(default)]
    pub shift_fee: Decimal,
}

impl CreateEmployeeRequest {
    /// Checks that the name is present and the shift fee is positive and
    /// within [`MAX_AMOUNT`].
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        Validator::new()
            .required("name", &self.name)
            .positive("shiftFee", self.shift_fee)
            .at_most("shiftFee", self.shift_fee, MAX_AMOUNT)
            .finish()
    }
}

/// Request to change an employee's shift fee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateShiftFeeRequest {
    /// The new base pay for one shift.
    #[serde(default)]
    pub shift_fee: Decimal,
}

impl UpdateShiftFeeRequest {
    /// Checks that the new shift fee is positive and within [`MAX_AMOUNT`].
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        Validator::new()
            .positive("shiftFee", self.shift_fee)
            .at_most("shiftFee", self.shift_fee, MAX_AMOUNT)
            .finish()
    }
}
