use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Utc};
use num_traits::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::constants::DAYS_PER_YEAR;
use crate::errors::ValidationError;

/// Leap year used to validate month/day pairs so that Feb 29 is accepted.
const REFERENCE_LEAP_YEAR: i32 = 2020;

/// A calendar month/day pair without a year, e.g. a fixed annual deadline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MonthDay {
    month: u32,
    day: u32,
}

impl MonthDay {
    /// Creates a month/day pair, rejecting combinations that are not a date
    /// in any year.
    pub fn new(month: u32, day: u32) -> Result<Self, ValidationError> {
        if !(1..=12).contains(&month) {
            return Err(ValidationError::invalid_field(
                "dueMonth",
                "must be a valid month in range 1-12",
            ));
        }
        if NaiveDate::from_ymd_opt(REFERENCE_LEAP_YEAR, month, day).is_none() {
            return Err(ValidationError::invalid_field(
                "dueDay",
                "must be a valid day for the selected month",
            ));
        }
        Ok(Self { month, day })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            month: date.month(),
            day: date.day(),
        }
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn day(&self) -> u32 {
        self.day
    }

    /// Re-checks a value that may have been deserialized without going through `new`.
    pub fn is_valid(&self) -> bool {
        Self::new(self.month, self.day).is_ok()
    }

    /// Resolves this month/day in the given year. Feb 29 falls back to Feb 28
    /// in non-leap years.
    pub fn in_year(&self, year: i32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, self.month, self.day)
            .or_else(|| {
                let day = self.day.checked_sub(1)?;
                NaiveDate::from_ymd_opt(year, self.month, day)
            })
            // only reachable for values that bypassed `new`
            .unwrap_or(NaiveDate::MAX)
    }

    /// Display label, e.g. "6/30".
    pub fn label(&self) -> String {
        format!("{}/{}", self.month, self.day)
    }
}

/// Midnight UTC at the start of the given date.
pub fn start_of_day_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(NaiveTime::MIN).and_utc()
}

/// Next occurrence of `month_day` at midnight UTC, counting from the year of
/// `now`. A date earlier than `now` rolls forward one year.
pub fn next_occurrence(month_day: MonthDay, now: DateTime<Utc>) -> DateTime<Utc> {
    let due = start_of_day_utc(month_day.in_year(now.year()));
    if due < now {
        start_of_day_utc(month_day.in_year(now.year() + 1))
    } else {
        due
    }
}

/// Whole days remaining until `due`, or 0 if `due` has already passed.
pub fn days_left(due: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    if due > now {
        (due - now).num_days()
    } else {
        0
    }
}

/// Converts a (possibly fractional) number of years to a duration in days.
pub fn years_to_duration(years: Decimal) -> Duration {
    let days = (years * Decimal::from(DAYS_PER_YEAR))
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
        .unwrap_or(0);
    Duration::days(days)
}
