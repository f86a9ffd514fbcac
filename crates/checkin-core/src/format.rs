//! Output formatting shared by overviews, summaries and messages.
//!
//! The overview strings are consumed by downstream spreadsheets, so the
//! rounding here is fixed: round the duration UP to a whole minute, then
//! render hours with one decimal, half-up.

use chrono::{Duration, NaiveTime, Timelike};

/// Prefix marking a value that contains an estimated session.
pub const ESTIMATED_PREFIX: &str = "~";

/// Prefix of the week-total column headers in an overview.
pub const WEEK_COLUMN_PREFIX: &str = "w-";

/// Whole minutes in `duration`, rounding any sub-minute remainder up.
///
/// Negative durations count as zero.
pub fn ceil_minutes(duration: Duration) -> i64 {
    if duration <= Duration::zero() {
        return 0;
    }
    let seconds = duration.num_seconds();
    let minutes = seconds / 60;
    if seconds % 60 != 0 || duration.subsec_nanos() != 0 {
        minutes + 1
    } else {
        minutes
    }
}

/// Formats a duration as hours with one decimal place; zero is empty.
///
/// `90s` → `"0.0"`, `3600s` → `"1.0"`, `9min` → `"0.2"`.
pub fn format_hours(duration: Duration) -> String {
    if duration.is_zero() {
        return String::new();
    }
    // tenths of an hour = minutes / 6, rounded half-up
    let tenths = (ceil_minutes(duration) + 3) / 6;
    format!("{}.{}", tenths / 10, tenths % 10)
}

/// [`format_hours`] with the estimated marker when `estimated` is set.
pub fn format_overview_value(duration: Duration, estimated: bool) -> String {
    let value = format_hours(duration);
    if estimated {
        format!("{ESTIMATED_PREFIX}{value}")
    } else {
        value
    }
}

/// Formats a duration as `H:MM` after rounding up to a whole minute.
pub fn format_hours_minutes(duration: Duration) -> String {
    let minutes = ceil_minutes(duration);
    format!("{}:{:02}", minutes / 60, minutes % 60)
}

/// Formats a clock time as `HH:MM`.
pub fn format_clock(time: NaiveTime) -> String {
    format!("{:02}:{:02}", time.hour(), time.minute())
}
