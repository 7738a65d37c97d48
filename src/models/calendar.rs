//! The organization's civil calendar.
//!
//! Day and month boundaries are local to the pharmacy, not UTC. The offset
//! comes from configuration and is passed explicitly to everything that
//! needs to turn a date into an instant.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Offset, TimeZone, Utc};

use super::Month;

/// Resolves local dates to UTC instants for a fixed UTC offset.
///
/// # Example
///
/// ```
/// use payroll_engine::models::{Calendar, Month};
/// use chrono::{FixedOffset, TimeZone, Utc};
///
/// let calendar = Calendar::new(FixedOffset::east_opt(7 * 3600).unwrap());
/// let (from, _) = calendar.month_window("2025-01".parse::<Month>().unwrap());
///
/// // Midnight in UTC+7 is 17:00 the previous day in UTC.
/// assert_eq!(from, Utc.with_ymd_and_hms(2024, 12, 31, 17, 0, 0).unwrap());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Calendar {
    offset: FixedOffset,
}

impl Calendar {
    /// Creates a calendar for the given UTC offset.
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// A calendar whose days are UTC days.
    pub fn utc() -> Self {
        Self::new(Utc.fix())
    }

    /// The configured offset.
    pub fn offset(&self) -> FixedOffset {
        self.offset
    }

    /// The first instant of the local date.
    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        self.at(date, NaiveTime::MIN)
    }

    /// The last instant of the local date, to the nanosecond.
    pub fn end_of_day(&self, date: NaiveDate) -> DateTime<Utc> {
        let last = NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999).unwrap_or(NaiveTime::MIN);
        self.at(date, last)
    }

    /// The inclusive instant window covering every day of the month.
    pub fn month_window(&self, month: Month) -> (DateTime<Utc>, DateTime<Utc>) {
        let (from, to) = month.date_range();
        (self.start_of_day(from), self.end_of_day(to))
    }

    /// The inclusive instant window covering `from` through `to`.
    ///
    /// Reversed bounds are swapped.
    pub fn days_window(&self, from: NaiveDate, to: NaiveDate) -> (DateTime<Utc>, DateTime<Utc>) {
        let (from, to) = if from > to { (to, from) } else { (from, to) };
        (self.start_of_day(from), self.end_of_day(to))
    }

    /// The local date of an instant.
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.offset).date_naive()
    }

    /// Today's local date.
    pub fn today(&self) -> NaiveDate {
        self.date_of(Utc::now())
    }

    fn at(&self, date: NaiveDate, time: NaiveTime) -> DateTime<Utc> {
        // A fixed offset has exactly one mapping for every local time.
        self.offset
            .from_local_datetime(&date.and_time(time))
            .single()
            .map(|local| local.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&date.and_time(time)))
    }
}

impl Default for Calendar {
    fn default() -> Self {
        Self::utc()
    }
}
