//! Shared utilities for CLI commands.

use checkin_core::format::format_hours_minutes;
use chrono::{Duration, NaiveDateTime};

/// Timestamp format used in all listings.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

pub fn format_time(time: NaiveDateTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// `H:MM`, or `-` when there is nothing to show.
pub fn format_elapsed(elapsed: Option<Duration>) -> String {
    elapsed.map_or_else(|| "-".to_string(), format_hours_minutes)
}

pub const fn state_label(checked_in: bool, auto: bool) -> &'static str {
    match (checked_in, auto) {
        (true, _) => "in",
        (false, true) => "out (auto)",
        (false, false) => "out",
    }
}
