//! Population-average checkout time.
//!
//! Sessions closed by the auto-checkout trigger have no real end. Their end
//! is estimated as the mean clock time of the day's real checkouts across
//! all enabled people.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};

/// Returned when a day has no real checkouts: the last instant of the day.
pub const END_OF_DAY: NaiveTime = match NaiveTime::from_hms_nano_opt(23, 59, 59, 999_999_999) {
    Some(time) => time,
    None => NaiveTime::MIN,
};

/// Half-open `[day 00:00, day+1 00:00)` bounds of a calendar day.
pub fn day_bounds(day: NaiveDate) -> (NaiveDateTime, NaiveDateTime) {
    let start = day.and_time(NaiveTime::MIN);
    let end = day
        .succ_opt()
        .map_or(NaiveDateTime::MAX, |next| next.and_time(NaiveTime::MIN));
    (start, end)
}

/// Mean time-of-day of `checkouts`, truncated to whole seconds.
///
/// Falls back to [`END_OF_DAY`] when there is nothing to average.
pub fn average_checkout_time<I>(checkouts: I) -> NaiveTime
where
    I: IntoIterator<Item = NaiveTime>,
{
    let (count, total) = checkouts
        .into_iter()
        .fold((0_u64, 0_u64), |(count, total), time| {
            (count + 1, total + u64::from(time.num_seconds_from_midnight()))
        });
    if count == 0 {
        return END_OF_DAY;
    }
    let mean = u32::try_from(total / count).unwrap_or(u32::MAX);
    NaiveTime::from_num_seconds_from_midnight_opt(mean, 0).unwrap_or(END_OF_DAY)
}
