//! Field-level request validation.
//!
//! Create and update requests collect every failing field into a
//! [`ValidationErrors`] list instead of stopping at the first problem, so
//! callers can report all of them at once.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Largest accepted magnitude for money: amounts and shift fees.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

/// Largest accepted multiplier for components and work types.
pub const MAX_MULTIPLIER: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Largest accepted overtime for one day.
pub const MAX_OVERTIME_HOURS: Decimal = Decimal::from_parts(24, 0, 0, false, 0);

/// A single failing field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// The JSON name of the field.
    pub field: String,
    /// What is wrong with it.
    pub message: String,
}

impl FieldError {
    /// Creates a new field error.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// A non-empty list of failing fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    /// Returns the failing fields in the order they were checked.
    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    /// Returns true if the given field failed.
    pub fn has_field(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }
}

impl From<Vec<FieldError>> for ValidationErrors {
    fn from(errors: Vec<FieldError>) -> Self {
        Self { errors }
    }
}

impl From<FieldError> for ValidationErrors {
    fn from(error: FieldError) -> Self {
        Self {
            errors: vec![error],
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for error in &self.errors {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{} {}", error.field, error.message)?;
            first = false;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}

/// Collects field errors for one request.
///
/// # Example
///
/// ```
/// use payroll_engine::validation::Validator;
/// use rust_decimal::Decimal;
///
/// let result = Validator::new()
///     .required("name", "")
///     .positive("shiftFee", Decimal::ZERO)
///     .finish();
///
/// let errors = result.unwrap_err();
/// assert_eq!(errors.errors().len(), 2);
/// assert!(errors.has_field("name"));
/// ```
#[derive(Debug, Default)]
pub struct Validator {
    errors: Vec<FieldError>,
}

impl Validator {
    /// Creates an empty validator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fails the field if it is empty or only whitespace.
    pub fn required(mut self, field: &str, value: &str) -> Self {
        if value.trim().is_empty() {
            self.errors.push(FieldError::new(field, "is required"));
        }
        self
    }

    /// Fails the field if the id is not a positive number.
    pub fn id(mut self, field: &str, value: i64) -> Self {
        if value <= 0 {
            self.errors.push(FieldError::new(field, "must be a positive id"));
        }
        self
    }

    /// Fails the field unless it is strictly greater than zero.
    pub fn positive(mut self, field: &str, value: Decimal) -> Self {
        if value <= Decimal::ZERO {
            self.errors
                .push(FieldError::new(field, "must be greater than 0"));
        }
        self
    }

    /// Fails the field if it is negative.
    pub fn non_negative(mut self, field: &str, value: Decimal) -> Self {
        if value.is_sign_negative() && !value.is_zero() {
            self.errors
                .push(FieldError::new(field, "must not be negative"));
        }
        self
    }

    /// Fails the field if its magnitude exceeds `limit`.
    pub fn at_most(mut self, field: &str, value: Decimal, limit: Decimal) -> Self {
        if value.abs() > limit {
            self.errors
                .push(FieldError::new(field, format!("must be at most {} in magnitude", limit)));
        }
        self
    }

    /// Fails the field if the collection is empty.
    pub fn not_empty<T>(mut self, field: &str, values: &[T]) -> Self {
        if values.is_empty() {
            self.errors
                .push(FieldError::new(field, "must contain at least one item"));
        }
        self
    }

    /// Records an error found by a custom check.
    pub fn check(mut self, ok: bool, field: &str, message: &str) -> Self {
        if !ok {
            self.errors.push(FieldError::new(field, message));
        }
        self
    }

    /// Merges errors found while validating a nested item.
    pub fn nested(mut self, prefix: &str, result: Result<(), ValidationErrors>) -> Self {
        if let Err(nested) = result {
            self.errors.extend(nested.errors.into_iter().map(|e| {
                FieldError::new(format!("{}.{}", prefix, e.field), e.message)
            }));
        }
        self
    }

    /// Returns `Ok(())` if no field failed.
    pub fn finish(self) -> Result<(), ValidationErrors> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationErrors {
                errors: self.errors,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_valid_values_pass() {
        let result = Validator::new()
            .required("name", "Ani")
            .positive("shiftFee", dec("100000"))
            .non_negative("overtimeHours", dec("0"))
            .id("typeID", 1)
            .not_empty("units", &[1])
            .finish();

        assert!(result.is_ok());
    }

    #[test]
    fn test_whitespace_is_not_a_value() {
        let errors = Validator::new().required("title", "   ").finish().unwrap_err();
        assert_eq!(errors.errors(), &[FieldError::new("title", "is required")]);
    }

    #[test]
    fn test_zero_is_not_positive_but_is_non_negative() {
        let errors = Validator::new()
            .positive("shiftFee", Decimal::ZERO)
            .non_negative("multiplier", Decimal::ZERO)
            .finish()
            .unwrap_err();

        assert!(errors.has_field("shiftFee"));
        assert!(!errors.has_field("multiplier"));
    }

    #[test]
    fn test_negative_overtime_fails() {
        let errors = Validator::new()
            .non_negative("overtimeHours", dec("-0.5"))
            .finish()
            .unwrap_err();
        assert!(errors.has_field("overtimeHours"));
    }

    #[test]
    fn test_at_most_bounds_both_signs() {
        let errors = Validator::new()
            .at_most("amount", dec("-1000000000001"), MAX_AMOUNT)
            .at_most("multiplier", dec("1000000"), MAX_MULTIPLIER)
            .at_most("shiftFee", dec("79228162514264337593543950335"), MAX_AMOUNT)
            .finish()
            .unwrap_err();

        let fields: Vec<&str> = errors.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["amount", "shiftFee"]);
        assert_eq!(errors.errors()[0].message, "must be at most 1000000000000 in magnitude");
    }

    #[test]
    fn test_bounds_keep_products_representable() {
        let product = MAX_AMOUNT.checked_mul(MAX_MULTIPLIER).unwrap();
        assert!(product.checked_mul(Decimal::from(1_000_000_000)).is_some());
        assert_eq!(MAX_AMOUNT, dec("1000000000000"));
    }

    #[test]
    fn test_nested_errors_are_prefixed() {
        let unit = Validator::new().required("workOutcome", "").finish();
        let errors = Validator::new()
            .nested("units[1]", unit)
            .finish()
            .unwrap_err();

        assert_eq!(errors.errors()[0].field, "units[1].workOutcome");
    }

    #[test]
    fn test_errors_keep_check_order() {
        let errors = Validator::new()
            .id("employeeID", 0)
            .check(false, "payableType", "must be one of working, benefit, none")
            .finish()
            .unwrap_err();

        let fields: Vec<&str> = errors.errors().iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["employeeID", "payableType"]);
    }
}
