pub mod time_utils;

pub use time_utils::{days_left, next_occurrence, start_of_day_utc, years_to_duration, MonthDay};
