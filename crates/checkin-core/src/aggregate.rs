//! Daily, weekly and monthly presence totals.
//!
//! Totals are built bottom-up: every closing event contributes one
//! [`session_duration`]; a day sums its closing events; weeks and months
//! sum days. Day totals go through the result cache, everything above
//! them is recomputed on each call.
//!
//! Weeks end on Sunday. A month overview emits one value per day and, after
//! every Sunday, the total of the week that just ended (clipped to the
//! month).

use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime, Weekday};
use rayon::prelude::*;
use serde::Serialize;

use crate::cache::DayTotal;
use crate::duration::{SessionDuration, session_duration};
use crate::error::AttendanceError;
use crate::estimate::{END_OF_DAY, average_checkout_time, day_bounds};
use crate::event::{CheckEvent, Person};
use crate::format::{WEEK_COLUMN_PREFIX, format_clock, format_overview_value};
use crate::store::{EventStore, Notifier, PersonDirectory, StoreError};
use crate::tracker::Tracker;
use crate::types::{PersonUid, YearMonth};

/// One person's row of a month overview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attendance {
    pub name: String,
    pub durations: Vec<String>,
}

/// The month table of every enabled person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Overview {
    pub year_month: YearMonth,
    pub columns: Vec<String>,
    pub attendances: Vec<Attendance>,
    /// Average checkout per day as `HH:MM`; `None` under week columns.
    pub average_checkouts: Vec<Option<String>>,
}

/// Presence summary of one person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub name: String,
    pub checked_in: bool,
    pub auto: bool,
    /// Time since the latest event.
    #[serde(serialize_with = "serialize_opt_seconds")]
    pub last_duration: Option<Duration>,
    /// Total of the current week so far.
    #[serde(serialize_with = "serialize_seconds")]
    pub week_duration: Duration,
}

/// Checked-in state of one person, as shown to check-in terminals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientStatus {
    pub uid: PersonUid,
    pub name: String,
    pub enabled: bool,
    pub checked_in: bool,
}

#[allow(clippy::ref_option, reason = "serde passes fields by reference")]
fn serialize_opt_seconds<S>(value: &Option<Duration>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match value {
        Some(duration) => serializer.serialize_some(&duration.num_seconds()),
        None => serializer.serialize_none(),
    }
}

fn serialize_seconds<S>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_i64(value.num_seconds())
}

/// Column headers of a month overview: day numbers and a `w-N` column
/// after each Sunday.
pub fn overview_columns(year_month: YearMonth) -> Vec<String> {
    let mut columns = Vec::with_capacity(year_month.length() + 5);
    let mut week = 0;
    for day in year_month.days() {
        columns.push(day.day().to_string());
        if day.weekday() == Weekday::Sun {
            week += 1;
            columns.push(format!("{WEEK_COLUMN_PREFIX}{week}"));
        }
    }
    columns
}

/// The Sunday strictly before `reference` (a week earlier on Sundays).
pub fn previous_sunday(reference: NaiveDate) -> NaiveDate {
    let back = match reference.weekday().num_days_from_sunday() {
        0 => 7,
        days => days,
    };
    reference - Duration::days(i64::from(back))
}

impl<S, N> Tracker<S, N>
where
    S: EventStore + PersonDirectory,
    N: Notifier,
{
    /// Mean time-of-day of the day's last real checkout per enabled person.
    pub fn average_checkout_time(&self, day: NaiveDate) -> Result<NaiveTime, StoreError> {
        let (start, end) = day_bounds(day);
        let checkouts = self.store.latest_real_checkouts(start, end)?;
        Ok(average_checkout_time(
            checkouts.iter().map(|event| event.time.time()),
        ))
    }

    /// Duration of the session closed by `closing`.
    pub fn session_duration(&self, closing: &CheckEvent) -> Result<SessionDuration, StoreError> {
        let mut average = None;
        self.session_duration_with(closing, &mut average)
    }

    /// Like [`session_duration`](Self::session_duration), reusing an
    /// average computed earlier for the same day.
    fn session_duration_with(
        &self,
        closing: &CheckEvent,
        average: &mut Option<NaiveTime>,
    ) -> Result<SessionDuration, StoreError> {
        let opening = self.store.latest_before(&closing.person, closing.time)?;
        let estimate = match (*average, closing.auto && opening.is_some()) {
            (Some(known), _) => known,
            (None, true) => {
                let computed = self.average_checkout_time(closing.date())?;
                *average = Some(computed);
                computed
            }
            (None, false) => END_OF_DAY,
        };
        Ok(session_duration(closing, opening.as_ref(), estimate))
    }

    /// Total presence of a person on a day, served from the cache.
    pub fn day_duration(&self, uid: &PersonUid, day: NaiveDate) -> Result<DayTotal, StoreError> {
        self.cache
            .get_or_compute(uid, day, || self.compute_day_duration(uid, day))
    }

    fn compute_day_duration(&self, uid: &PersonUid, day: NaiveDate) -> Result<DayTotal, StoreError> {
        let (start, end) = day_bounds(day);
        let mut average = None;
        let mut total = DayTotal::ZERO;
        for closing in self
            .store
            .between(uid, start, end)?
            .iter()
            .filter(|event| !event.checked_in)
        {
            let session = self.session_duration_with(closing, &mut average)?;
            total.duration += session.duration;
            total.estimated |= session.estimated;
        }
        tracing::debug!(uid = %uid, %day, seconds = total.duration.num_seconds(), "computed day total");
        Ok(total)
    }

    /// Sum of day totals over `first..=last`.
    pub fn range_duration(
        &self,
        uid: &PersonUid,
        first: NaiveDate,
        last: NaiveDate,
    ) -> Result<DayTotal, StoreError> {
        first
            .iter_days()
            .take_while(|day| *day <= last)
            .try_fold(DayTotal::ZERO, |acc, day| {
                let day_total = self.day_duration(uid, day)?;
                Ok(DayTotal {
                    duration: acc.duration + day_total.duration,
                    estimated: acc.estimated || day_total.estimated,
                })
            })
    }

    /// Presence from the preceding Sunday up to and including `reference`.
    pub fn week_duration(
        &self,
        uid: &PersonUid,
        reference: NaiveDate,
    ) -> Result<DayTotal, StoreError> {
        self.range_duration(uid, previous_sunday(reference), reference)
    }

    /// Formatted per-day values with week totals after each Sunday.
    pub fn month_overview(
        &self,
        uid: &PersonUid,
        year_month: YearMonth,
    ) -> Result<Vec<String>, StoreError> {
        let mut values = Vec::with_capacity(year_month.length() + 5);
        let mut week = DayTotal::ZERO;
        for day in year_month.days() {
            let total = self.day_duration(uid, day)?;
            values.push(format_overview_value(total.duration, total.estimated));

            week.duration += total.duration;
            week.estimated |= total.estimated;
            if day.weekday() == Weekday::Sun {
                values.push(format_overview_value(week.duration, week.estimated));
                week = DayTotal::ZERO;
            }
        }
        Ok(values)
    }

    /// Average checkout time per day of the month, aligned with
    /// [`overview_columns`].
    pub fn average_checkout_row(
        &self,
        year_month: YearMonth,
    ) -> Result<Vec<Option<String>>, StoreError> {
        let mut row = Vec::with_capacity(year_month.length() + 5);
        for day in year_month.days() {
            row.push(Some(format_clock(self.average_checkout_time(day)?)));
            if day.weekday() == Weekday::Sun {
                row.push(None);
            }
        }
        Ok(row)
    }

    /// The month table for every enabled person.
    ///
    /// Rows are computed in parallel and share the result cache.
    pub fn overview(&self, year_month: YearMonth) -> Result<Overview, StoreError> {
        let people = self.store.list_enabled()?;
        let attendances = people
            .par_iter()
            .map(|person| {
                Ok(Attendance {
                    name: person.name.clone(),
                    durations: self.month_overview(&person.uid, year_month)?,
                })
            })
            .collect::<Result<Vec<_>, StoreError>>()?;

        Ok(Overview {
            year_month,
            columns: overview_columns(year_month),
            attendances,
            average_checkouts: self.average_checkout_row(year_month)?,
        })
    }

    /// Presence summary of a person as of `now`.
    pub fn summary_at(&self, person: &Person, now: NaiveDateTime) -> Result<Summary, StoreError> {
        let latest = self.store.latest(&person.uid)?;
        Ok(Summary {
            name: person.name.clone(),
            checked_in: latest.as_ref().is_some_and(|event| event.checked_in),
            auto: latest.as_ref().is_some_and(|event| event.auto),
            last_duration: latest.map(|event| now - event.time),
            week_duration: self.week_duration(&person.uid, now.date())?.duration,
        })
    }

    /// Summaries of all enabled people.
    pub fn public_summaries_at(&self, now: NaiveDateTime) -> Result<Vec<Summary>, StoreError> {
        self.store
            .list_enabled()?
            .par_iter()
            .map(|person| self.summary_at(person, now))
            .collect()
    }

    /// Checked-in state of every known person, enabled or not.
    pub fn client_statuses(&self) -> Result<Vec<ClientStatus>, StoreError> {
        self.store
            .list_all()?
            .into_iter()
            .map(|person| {
                Ok(ClientStatus {
                    checked_in: self.is_checked_in(&person.uid)?,
                    uid: person.uid,
                    name: person.name,
                    enabled: person.enabled,
                })
            })
            .collect()
    }

    /// A person's events within a month, newest first.
    pub fn checks_in_month(
        &self,
        uid: &PersonUid,
        year_month: YearMonth,
    ) -> Result<Vec<CheckEvent>, AttendanceError> {
        if self.store.find(uid)?.is_none() {
            return Err(AttendanceError::PersonNotFound(uid.clone()));
        }
        let start = year_month.first_day().and_time(NaiveTime::MIN);
        let end = year_month.next_first_day().and_time(NaiveTime::MIN);
        let mut events = self.store.between(uid, start, end)?;
        events.reverse();
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{at, enroll, tracker, uid};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn columns_insert_week_markers_after_sundays() {
        // June 2024 starts on a Saturday
        let columns = overview_columns("2024-06".parse().unwrap());
        assert_eq!(&columns[..4], ["1", "2", "w-1", "3"]);
        assert_eq!(columns.iter().filter(|c| c.starts_with("w-")).count(), 5);
        assert_eq!(columns.last().map(String::as_str), Some("w-5"));
    }

    #[test]
    fn previous_sunday_is_strict() {
        assert_eq!(previous_sunday(date("2024-06-05")), date("2024-06-02"));
        assert_eq!(previous_sunday(date("2024-06-09")), date("2024-06-02"));
        assert_eq!(previous_sunday(date("2024-06-10")), date("2024-06-09"));
    }

    #[test]
    fn estimator_uses_last_real_checkout_of_enabled_people() {
        let tracker = tracker();
        enroll(&tracker, "a", "Ada");
        enroll(&tracker, "b", "Bo");
        tracker.store.seed("a", "2024-06-03 09:00:00", true, false);
        tracker.store.seed("a", "2024-06-03 12:00:00", false, false);
        tracker.store.seed("a", "2024-06-03 13:00:00", true, false);
        tracker.store.seed("a", "2024-06-03 17:00:00", false, false);
        tracker.store.seed("b", "2024-06-03 10:00:00", true, false);
        tracker.store.seed("b", "2024-06-03 18:00:00", false, false);
        // auto checkouts and disabled people do not count
        tracker.store.seed("b", "2024-06-03 19:00:00", true, false);
        tracker.store.seed("b", "2024-06-03 23:59:00", false, true);
        tracker.store.seed("stray", "2024-06-03 08:00:00", false, false);

        let avg = tracker.average_checkout_time(date("2024-06-03")).unwrap();
        assert_eq!(avg, NaiveTime::from_hms_opt(17, 30, 0).unwrap());

        let empty = tracker.average_checkout_time(date("2024-06-04")).unwrap();
        assert_eq!(empty, END_OF_DAY);
    }

    #[test]
    fn auto_closed_session_is_estimated_against_average() {
        let tracker = tracker();
        enroll(&tracker, "a", "Ada");
        enroll(&tracker, "b", "Bo");
        tracker.store.seed("a", "2024-06-03 09:00:00", true, false);
        tracker.store.seed("a", "2024-06-03 17:00:00", false, false);
        tracker.store.seed("b", "2024-06-03 10:00:00", true, false);
        tracker.store.seed("b", "2024-06-03 23:59:00", false, true);

        let total = tracker.day_duration(&uid("b"), date("2024-06-03")).unwrap();
        assert_eq!(total.duration, Duration::hours(7));
        assert!(total.estimated);

        let exact = tracker.day_duration(&uid("a"), date("2024-06-03")).unwrap();
        assert_eq!(exact.duration, Duration::hours(8));
        assert!(!exact.estimated);
    }

    #[test]
    fn session_spanning_midnight_counts_on_closing_day() {
        let tracker = tracker();
        enroll(&tracker, "a", "Ada");
        tracker.store.seed("a", "2024-06-03 22:00:00", true, false);
        tracker.store.seed("a", "2024-06-04 01:30:00", false, false);

        assert_eq!(
            tracker.day_duration(&uid("a"), date("2024-06-03")).unwrap(),
            DayTotal::ZERO
        );
        assert_eq!(
            tracker
                .day_duration(&uid("a"), date("2024-06-04"))
                .unwrap()
                .duration,
            Duration::minutes(210)
        );
    }

    #[test]
    fn repeated_checkouts_degrade_gracefully() {
        let tracker = tracker();
        enroll(&tracker, "a", "Ada");
        tracker.store.seed("a", "2024-06-03 09:00:00", true, false);
        tracker.store.seed("a", "2024-06-03 10:00:00", false, false);
        tracker.store.seed("a", "2024-06-03 10:30:00", false, false);

        let total = tracker.day_duration(&uid("a"), date("2024-06-03")).unwrap();
        assert_eq!(total.duration, Duration::minutes(90));
    }

    #[test]
    fn day_durations_add_up_to_session_durations() {
        let tracker = tracker();
        enroll(&tracker, "a", "Ada");
        enroll(&tracker, "b", "Bo");
        let seeds = [
            ("2024-06-03 09:00:00", true, false),
            ("2024-06-03 12:10:05", false, false),
            ("2024-06-05 08:00:00", true, false),
            ("2024-06-05 23:59:00", false, true),
            ("2024-06-11 23:00:00", true, false),
            ("2024-06-12 00:45:00", false, false),
            ("2024-06-30 13:00:00", true, false),
            ("2024-06-30 14:00:00", false, false),
        ];
        for (time, checked_in, auto) in seeds {
            tracker.store.seed("a", time, checked_in, auto);
        }
        tracker.store.seed("b", "2024-06-05 09:00:00", true, false);
        tracker.store.seed("b", "2024-06-05 16:15:00", false, false);

        let month: YearMonth = "2024-06".parse().unwrap();
        let by_day = month
            .days()
            .map(|day| tracker.day_duration(&uid("a"), day).unwrap().duration)
            .fold(Duration::zero(), |acc, d| acc + d);

        let (start, end) = (at("2024-06-01 00:00:00"), at("2024-07-01 00:00:00"));
        let by_session = tracker
            .store
            .between(&uid("a"), start, end)
            .unwrap()
            .iter()
            .filter(|event| !event.checked_in)
            .map(|event| tracker.session_duration(event).unwrap().duration)
            .fold(Duration::zero(), |acc, d| acc + d);

        assert_eq!(by_day, by_session);
        assert!(by_day > Duration::zero());
    }

    #[test]
    fn month_overview_interleaves_week_totals() {
        let tracker = tracker();
        enroll(&tracker, "a", "Ada");
        // Sat 1st and Sun 2nd, then Mon 3rd auto-closed
        tracker.store.seed("a", "2024-06-01 10:00:00", true, false);
        tracker.store.seed("a", "2024-06-01 11:00:00", false, false);
        tracker.store.seed("a", "2024-06-02 10:00:00", true, false);
        tracker.store.seed("a", "2024-06-02 10:01:30", false, false);
        tracker.store.seed("a", "2024-06-03 09:00:00", true, false);
        tracker.store.seed("a", "2024-06-03 23:59:00", false, true);

        let values = tracker
            .month_overview(&uid("a"), "2024-06".parse().unwrap())
            .unwrap();

        assert_eq!(values.len(), overview_columns("2024-06".parse().unwrap()).len());
        // no real checkout on the 3rd: estimate runs to 23:59:59.999
        assert_eq!(&values[..5], ["1.0", "0.0", "1.0", "~15.0", ""]);
        assert_eq!(values[10], "~15.0");
    }

    #[test]
    fn week_duration_starts_at_previous_sunday() {
        let tracker = tracker();
        enroll(&tracker, "a", "Ada");
        // Sat 1st is before the window, Sun 2nd opens it
        tracker.store.seed("a", "2024-06-01 10:00:00", true, false);
        tracker.store.seed("a", "2024-06-01 12:00:00", false, false);
        tracker.store.seed("a", "2024-06-02 10:00:00", true, false);
        tracker.store.seed("a", "2024-06-02 11:00:00", false, false);
        tracker.store.seed("a", "2024-06-05 10:00:00", true, false);
        tracker.store.seed("a", "2024-06-05 10:30:00", false, false);

        let week = tracker.week_duration(&uid("a"), date("2024-06-05")).unwrap();
        assert_eq!(week.duration, Duration::minutes(90));
        assert!(!week.estimated);
    }

    #[test]
    fn overview_includes_enabled_people_only() {
        let tracker = tracker();
        enroll(&tracker, "a", "Ada");
        tracker.store.seed("stray", "2024-06-03 09:00:00", true, false);
        tracker
            .store
            .create_placeholder(&uid("stray"), "new-user-x")
            .unwrap();

        let overview = tracker.overview("2024-06".parse().unwrap()).unwrap();
        assert_eq!(overview.attendances.len(), 1);
        assert_eq!(overview.attendances[0].name, "Ada");
        assert_eq!(overview.average_checkouts.len(), overview.columns.len());
        assert_eq!(overview.average_checkouts[0].as_deref(), Some("23:59"));
        assert_eq!(overview.average_checkouts[2], None);
    }

    #[test]
    fn summary_reports_presence_and_week() {
        let tracker = tracker();
        enroll(&tracker, "a", "Ada");
        tracker.store.seed("a", "2024-06-03 09:00:00", true, false);
        tracker.store.seed("a", "2024-06-03 11:00:00", false, false);
        tracker.store.seed("a", "2024-06-04 09:00:00", true, false);

        let summaries = tracker.public_summaries_at(at("2024-06-04 09:45:00")).unwrap();
        assert_eq!(summaries.len(), 1);
        let summary = &summaries[0];
        assert!(summary.checked_in);
        assert!(!summary.auto);
        assert_eq!(summary.last_duration, Some(Duration::minutes(45)));
        assert_eq!(summary.week_duration, Duration::hours(2));
    }

    #[test]
    fn checks_in_month_is_newest_first_and_checks_existence() {
        let tracker = tracker();
        enroll(&tracker, "a", "Ada");
        tracker.store.seed("a", "2024-05-31 09:00:00", true, false);
        tracker.store.seed("a", "2024-06-01 09:00:00", false, false);
        tracker.store.seed("a", "2024-06-30 23:00:00", true, false);
        tracker.store.seed("a", "2024-07-01 00:00:00", false, false);

        let events = tracker
            .checks_in_month(&uid("a"), "2024-06".parse().unwrap())
            .unwrap();
        let times: Vec<_> = events.iter().map(|event| event.time).collect();
        assert_eq!(times, [at("2024-06-30 23:00:00"), at("2024-06-01 09:00:00")]);

        let missing = tracker.checks_in_month(&uid("zz"), "2024-06".parse().unwrap());
        assert!(missing.unwrap_err().is_not_found());
    }

    #[test]
    fn client_statuses_cover_enabled_people_and_placeholders() {
        let tracker = tracker();
        enroll(&tracker, "a", "Ada");
        enroll(&tracker, "b", "Bo");
        tracker.store.seed("a", "2024-06-03 09:00:00", true, false);
        tracker
            .record_check_at(&uid("card"), false, at("2024-06-03 10:00:00"))
            .unwrap();

        let statuses = tracker.client_statuses().unwrap();
        let rows: Vec<_> = statuses
            .iter()
            .map(|status| (status.uid.as_str(), status.enabled, status.checked_in))
            .collect();
        assert_eq!(
            rows,
            [("a", true, true), ("b", true, false), ("card", false, true)]
        );
        assert!(statuses[2].name.starts_with("new-user-"));
    }
}
