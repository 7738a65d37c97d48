//! Salary models.
//!
//! A [`Salary`] is an ordered list of [`Component`]s plus the period's
//! [`ExtraInfo`] notes. Totals are derived on read and written into the
//! JSON form, but never stored or trusted on input.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};

use super::Month;
use crate::validation::{MAX_AMOUNT, MAX_MULTIPLIER, ValidationErrors, Validator};

/// Descriptions containing this word (case-insensitively) are debt
/// repayments and are left out of [`Salary::total_without_debt`].
pub const DEBT_MARKER: &str = "utang";

/// Rounds a money amount up to a whole currency unit.
pub fn round_up(value: Decimal) -> Decimal {
    value.ceil()
}

/// One line of a salary.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Component {
    /// What the line pays for.
    pub description: String,
    /// The price of one unit.
    pub amount: Decimal,
    /// How many units.
    pub multiplier: Decimal,
}

impl Component {
    /// Creates a component.
    pub fn new(description: impl Into<String>, amount: Decimal, multiplier: Decimal) -> Self {
        Self {
            description: description.into(),
            amount,
            multiplier,
        }
    }

    /// `amount × multiplier`, rounded up.
    ///
    /// Saturates at [`Decimal::MAX`] or [`Decimal::MIN`] instead of
    /// overflowing; validated amounts and multipliers never get there.
    pub fn total(&self) -> Decimal {
        round_up(self.amount.saturating_mul(self.multiplier))
    }

    /// Returns true if the line repays a debt.
    pub fn is_debt(&self) -> bool {
        self.description.to_lowercase().contains(DEBT_MARKER)
    }
}

impl Serialize for Component {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Component", 4)?;
        state.serialize_field("description", &self.description)?;
        state.serialize_field("amount", &self.amount)?;
        state.serialize_field("multiplier", &self.multiplier)?;
        state.serialize_field("total", &self.total())?;
        state.end()
    }
}

/// A free-text note attached to an employee's month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtraInfo {
    /// Unique identifier for the note.
    pub id: i64,
    /// The employee the note belongs to.
    #[serde(rename = "employeeID")]
    pub employee_id: i64,
    /// The month the note belongs to.
    pub month: Month,
    /// Short title.
    pub title: String,
    /// Body of the note.
    pub description: String,
    /// When the note was created.
    pub created_at: DateTime<Utc>,
}

/// An itemized salary.
///
/// # Example
///
/// ```
/// use payroll_engine::models::{Component, Salary};
/// use rust_decimal::Decimal;
///
/// let salary = Salary::new(vec![
///     Component::new("Banyak Shift Jaga", Decimal::from(100_000), Decimal::from(20)),
///     Component::new("Bayar Utang", Decimal::from(-50_000), Decimal::ONE),
/// ]);
///
/// assert_eq!(salary.total(), Decimal::from(1_950_000));
/// assert_eq!(salary.total_without_debt(), Decimal::from(2_000_000));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Salary {
    /// Salary lines in payment order.
    #[serde(default)]
    pub components: Vec<Component>,
    /// Notes for the period.
    #[serde(default)]
    pub extra_infos: Vec<ExtraInfo>,
}

impl Salary {
    /// Creates a salary with no notes.
    pub fn new(components: Vec<Component>) -> Self {
        Self {
            components,
            extra_infos: Vec::new(),
        }
    }

    /// Sum of component totals, rounded up. Saturates like
    /// [`Component::total`].
    pub fn total(&self) -> Decimal {
        sum_totals(self.components.iter())
    }

    /// Sum of component totals excluding debt lines, rounded up.
    pub fn total_without_debt(&self) -> Decimal {
        sum_totals(self.components.iter().filter(|c| !c.is_debt()))
    }
}

fn sum_totals<'a>(components: impl Iterator<Item = &'a Component>) -> Decimal {
    round_up(
        components
            .map(Component::total)
            .fold(Decimal::ZERO, Decimal::saturating_add),
    )
}

impl Serialize for Salary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Salary", 4)?;
        state.serialize_field("components", &self.components)?;
        state.serialize_field("total", &self.total())?;
        state.serialize_field("totalWithoutDebt", &self.total_without_debt())?;
        state.serialize_field("extraInfos", &self.extra_infos)?;
        state.end()
    }
}

/// A recurring salary line that belongs to an employee permanently.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StaticComponent {
    /// Unique identifier for the component.
    pub id: i64,
    /// The employee the component belongs to.
    #[serde(rename = "employeeID")]
    pub employee_id: i64,
    /// What the line pays for.
    pub description: String,
    /// The price of one unit.
    pub amount: Decimal,
    /// How many units.
    pub multiplier: Decimal,
    /// When the component was created.
    pub created_at: DateTime<Utc>,
}

impl StaticComponent {
    /// The component as a plain salary line.
    pub fn to_component(&self) -> Component {
        Component::new(self.description.clone(), self.amount, self.multiplier)
    }
}

impl Serialize for StaticComponent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("StaticComponent", 7)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("employeeID", &self.employee_id)?;
        state.serialize_field("description", &self.description)?;
        state.serialize_field("amount", &self.amount)?;
        state.serialize_field("multiplier", &self.multiplier)?;
        state.serialize_field("createdAt", &self.created_at)?;
        state.serialize_field("total", &self.to_component().total())?;
        state.end()
    }
}

/// A one-off salary line for one employee's month.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdditionalComponent {
    /// Unique identifier for the component.
    pub id: i64,
    /// The employee the component belongs to.
    #[serde(rename = "employeeID")]
    pub employee_id: i64,
    /// The month the component is paid in.
    pub month: Month,
    /// What the line pays for.
    pub description: String,
    /// The price of one unit.
    pub amount: Decimal,
    /// How many units.
    pub multiplier: Decimal,
    /// When the component was created.
    pub created_at: DateTime<Utc>,
}

impl AdditionalComponent {
    /// The component as a plain salary line.
    pub fn to_component(&self) -> Component {
        Component::new(self.description.clone(), self.amount, self.multiplier)
    }
}

impl Serialize for AdditionalComponent {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("AdditionalComponent", 8)?;
        state.serialize_field("id", &self.id)?;
        state.serialize_field("employeeID", &self.employee_id)?;
        state.serialize_field("month", &self.month)?;
        state.serialize_field("description", &self.description)?;
        state.serialize_field("amount", &self.amount)?;
        state.serialize_field("multiplier", &self.multiplier)?;
        state.serialize_field("createdAt", &self.created_at)?;
        state.serialize_field("total", &self.to_component().total())?;
        state.end()
    }
}

/// Request to create a static or additional component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateComponentRequest {
    /// What the line pays for.
    #[serde(default)]
    pub description: String,
    /// The price of one unit, negative for deductions.
    #[serde(default)]
    pub amount: Decimal,
    /// How many units.
    #[serde(default = "one")]
    pub multiplier: Decimal,
}

fn one() -> Decimal {
    Decimal::ONE
}

impl CreateComponentRequest {
    /// Checks the description is present, the amount is within
    /// [`MAX_AMOUNT`] and the multiplier is between 0 and [`MAX_MULTIPLIER`].
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        Validator::new()
            .required("description", &self.description)
            .at_most("amount", self.amount, MAX_AMOUNT)
            .non_negative("multiplier", self.multiplier)
            .at_most("multiplier", self.multiplier, MAX_MULTIPLIER)
            .finish()
    }

    /// The request as a plain salary line.
    pub fn to_component(&self) -> Component {
        Component::new(self.description.clone(), self.amount, self.multiplier)
    }
}

/// Request to attach a note to an employee's month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateExtraInfoRequest {
    /// Short title.
    #[serde(default)]
    pub title: String,
    /// Body of the note.
    #[serde(default)]
    pub description: String,
}

impl CreateExtraInfoRequest {
    /// Checks the title and description are present.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        Validator::new()
            .required("title", &self.title)
            .required("description", &self.description)
            .finish()
    }
}

/// An immutable capture of a computed salary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Unique identifier for the snapshot.
    pub id: i64,
    /// The employee the salary was computed for.
    #[serde(rename = "employeeID")]
    pub employee_id: i64,
    /// The month the salary was computed for.
    pub month: Month,
    /// The salary as it was when captured.
    pub salary: Salary,
    /// When the snapshot was taken.
    pub created_at: DateTime<Utc>,
}

/// Request to capture an employee's salary for a month.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSnapshotRequest {
    /// The employee to capture.
    #[serde(rename = "employeeID", default)]
    pub employee_id: i64,
    /// The month to capture, `YYYY-MM`.
    #[serde(default)]
    pub month: String,
}

impl CreateSnapshotRequest {
    /// Validates the request and returns the parsed month.
    pub fn validate(&self) -> Result<Month, ValidationErrors> {
        let month = Month::parse_field("month", &self.month);
        let mut validator = Validator::new().id("employeeID", self.employee_id);
        if let Err(e) = &month {
            validator = validator.check(false, &e.field, &e.message);
        }
        validator.finish()?;
        month.map_err(ValidationErrors::from)
    }
}

/// The stored form of a snapshot's salary.
///
/// Payloads are written as `{"version": 1, "salary": {...}}`. Payloads
/// written before versioning are a bare salary object and still read.
pub struct SnapshotPayload;

impl SnapshotPayload {
    /// The version written by [`SnapshotPayload::encode`].
    pub const CURRENT_VERSION: u64 = 1;

    /// Serializes a salary, totals included, into the current payload form.
    pub fn encode(salary: &Salary) -> Result<String, serde_json::Error> {
        serde_json::to_string(&serde_json::json!({
            "version": Self::CURRENT_VERSION,
            "salary": salary,
        }))
    }

    /// Reads a salary back from any known payload form.
    pub fn decode(payload: &str) -> Result<Salary, String> {
        let mut value: serde_json::Value =
            serde_json::from_str(payload).map_err(|e| e.to_string())?;

        let version = match value.get("version") {
            None => return serde_json::from_value(value).map_err(|e| e.to_string()),
            Some(v) => v.as_u64(),
        };

        match version {
            Some(Self::CURRENT_VERSION) => {
                let salary = value
                    .get_mut("salary")
                    .map(serde_json::Value::take)
                    .ok_or_else(|| "payload has no salary".to_string())?;
                serde_json::from_value(salary).map_err(|e| e.to_string())
            }
            _ => Err(format!("unsupported payload version {}", value["version"])),
        }
    }
}
