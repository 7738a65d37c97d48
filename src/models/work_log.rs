//! Work-log models.
//!
//! A work log records a clinical service (a test or a dispensed
//! prescription) performed by an employee for a patient. Each log owns one
//! or more billable units.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::validation::{MAX_MULTIPLIER, ValidationErrors, Validator};

/// A billable kind of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkType {
    /// Unique identifier for the work type.
    pub id: i64,
    /// Display name of the work type.
    pub name: String,
    /// The unit the outcome is measured in.
    pub outcome_unit: String,
    /// Billing weight per unit, copied onto each unit when it is logged.
    pub multiplier: Decimal,
    /// Free-text notes.
    pub notes: String,
}

/// One billable unit of a work log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkLogUnit {
    /// Unique identifier for the unit.
    pub id: i64,
    /// The work type, joined.
    pub work_type: WorkType,
    /// What the work produced.
    pub work_outcome: String,
    /// Billing weight captured when the unit was logged.
    pub work_multiplier: Decimal,
}

/// A clinical service record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkLog {
    /// Unique identifier for the log.
    pub id: i64,
    /// The employee who performed the work.
    #[serde(rename = "employeeID")]
    pub employee_id: i64,
    /// The patient the work was performed for.
    pub patient_name: String,
    /// When the work was logged.
    pub created_at: DateTime<Utc>,
    /// The units of the log, in insertion order.
    pub units: Vec<WorkLogUnit>,
}

/// Request to create a work type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkTypeRequest {
    /// Display name of the work type.
    #[serde(default)]
    pub name: String,
    /// The unit the outcome is measured in.
    #[serde(default)]
    pub outcome_unit: String,
    /// Billing weight per unit.
    #[serde(default)]
    pub multiplier: Decimal,
    /// Free-text notes.
    #[serde(default)]
    pub notes: String,
}

impl CreateWorkTypeRequest {
    /// Checks the name is present and the multiplier is between 0 and
    /// [`MAX_MULTIPLIER`].
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        Validator::new()
            .required("name", &self.name)
            .non_negative("multiplier", self.multiplier)
            .at_most("multiplier", self.multiplier, MAX_MULTIPLIER)
            .finish()
    }
}

/// One unit of a work-log creation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkLogUnitRequest {
    /// The work type the unit bills as.
    #[serde(rename = "workTypeID", default)]
    pub work_type_id: i64,
    /// What the work produced.
    #[serde(default)]
    pub work_outcome: String,
}

impl CreateWorkLogUnitRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        Validator::new()
            .id("workTypeID", self.work_type_id)
            .required("workOutcome", &self.work_outcome)
            .finish()
    }
}

/// Request to create a work log together with its units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkLogRequest {
    /// The employee who performed the work.
    #[serde(rename = "employeeID", default)]
    pub employee_id: i64,
    /// The patient the work was performed for.
    #[serde(default)]
    pub patient_name: String,
    /// The units to log, at least one.
    #[serde(default)]
    pub units: Vec<CreateWorkLogUnitRequest>,
}

impl CreateWorkLogRequest {
    /// Validates the log and every unit; unit errors are reported as
    /// `units[i].field`.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        self.units
            .iter()
            .enumerate()
            .fold(
                Validator::new()
                    .id("employeeID", self.employee_id)
                    .required("patientName", &self.patient_name)
                    .not_empty("units", &self.units),
                |validator, (i, unit)| validator.nested(&format!("units[{}]", i), unit.validate()),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_request_parses_unit_ids() {
        let request: CreateWorkLogRequest = serde_json::from_str(
            r#"{
                "employeeID": 3,
                "patientName": "Pak Joko",
                "units": [{"workTypeID": 1, "workOutcome": "negatif"}]
            }"#,
        )
        .unwrap();

        assert_eq!(request.employee_id, 3);
        assert_eq!(request.units[0].work_type_id, 1);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_create_request_requires_units() {
        let request = CreateWorkLogRequest {
            employee_id: 1,
            patient_name: "Bu Sri".to_string(),
            units: vec![],
        };
        assert!(request.validate().unwrap_err().has_field("units"));
    }

    #[test]
    fn test_unit_errors_are_indexed() {
        let request = CreateWorkLogRequest {
            employee_id: 1,
            patient_name: "Bu Sri".to_string(),
            units: vec![
                CreateWorkLogUnitRequest {
                    work_type_id: 1,
                    work_outcome: "120 mg/dL".to_string(),
                },
                CreateWorkLogUnitRequest {
                    work_type_id: 0,
                    work_outcome: String::new(),
                },
            ],
        };

        let errors = request.validate().unwrap_err();
        assert!(errors.has_field("units[1].workTypeID"));
        assert!(errors.has_field("units[1].workOutcome"));
        assert!(!errors.has_field("units[0].workTypeID"));
    }

    #[test]
    fn test_work_type_rejects_oversized_multiplier() {
        let request = CreateWorkTypeRequest {
            name: "Cek Gula Darah".to_string(),
            outcome_unit: "mg/dL".to_string(),
            multiplier: Decimal::from(1_000_001),
            notes: String::new(),
        };
        assert!(request.validate().unwrap_err().has_field("multiplier"));
    }

    #[test]
    fn test_work_type_rejects_negative_multiplier() {
        let request = CreateWorkTypeRequest {
            name: "Cek Gula Darah".to_string(),
            outcome_unit: "mg/dL".to_string(),
            multiplier: Decimal::NEGATIVE_ONE,
            notes: String::new(),
        };
        assert!(request.validate().unwrap_err().has_field("multiplier"));
    }
}
