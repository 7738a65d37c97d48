//! Calendar month model.
//!
//! A [`Month`] is the pay period of the engine. It scopes additional
//! components, extra infos and snapshots, and resolves to the date range
//! used to window attendance.

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, Months, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::validation::FieldError;

/// A (year, month) pair, written as `"YYYY-MM"`.
///
/// # Example
///
/// ```
/// use payroll_engine::models::Month;
/// use chrono::NaiveDate;
///
/// let month: Month = "2024-02".parse().unwrap();
/// let (from, to) = month.date_range();
///
/// assert_eq!(month.to_string(), "2024-02");
/// assert_eq!(from, NaiveDate::from_ymd_opt(2024, 2, 1).unwrap());
/// assert_eq!(to, NaiveDate::from_ymd_opt(2024, 2, 29).unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Month {
    year: i32,
    month: u32,
}

impl Month {
    /// Creates a month, returning `None` if it does not exist on the calendar.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        NaiveDate::from_ymd_opt(year, month, 1).map(|_| Self { year, month })
    }

    /// Returns the month containing the given date.
    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// The calendar year.
    pub fn year(&self) -> i32 {
        self.year
    }

    /// The month number, 1 to 12.
    pub fn month(&self) -> u32 {
        self.month
    }

    /// The first day of the month.
    pub fn first_day(&self) -> NaiveDate {
        // Constructors only admit months that exist on the calendar.
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// The last day of the month.
    pub fn last_day(&self) -> NaiveDate {
        self.first_day()
            .checked_add_months(Months::new(1))
            .and_then(|next| next.pred_opt())
            .unwrap_or(NaiveDate::MAX)
    }

    /// The inclusive date range `[first day, last day]`.
    pub fn date_range(&self) -> (NaiveDate, NaiveDate) {
        (self.first_day(), self.last_day())
    }

    /// Parses a month, reporting failures against the named request field.
    pub fn parse_field(field: &str, value: &str) -> Result<Self, FieldError> {
        value
            .parse()
            .map_err(|e: MonthParseError| FieldError::new(field, e.to_string()))
    }
}

impl fmt::Display for Month {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// The reason a month string was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthParseError {
    input: String,
}

impl fmt::Display for MonthParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid month format ({}), expected YYYY-MM", self.input)
    }
}

impl std::error::Error for MonthParseError {}

impl FromStr for Month {
    type Err = MonthParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let err = || MonthParseError {
            input: s.to_string(),
        };

        let (year, month) = s.split_once('-').ok_or_else(err)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(err());
        }
        if !year.bytes().chain(month.bytes()).all(|b| b.is_ascii_digit()) {
            return Err(err());
        }

        let year: i32 = year.parse().map_err(|_| err())?;
        let month: u32 = month.parse().map_err(|_| err())?;
        Month::new(year, month).ok_or_else(err)
    }
}

impl Serialize for Month {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Month {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
