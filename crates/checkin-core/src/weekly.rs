//! Weekly presence summary.
//!
//! Covers the seven calendar days before the run date. Each enabled person
//! gets their own total; the trainer gets one line per person.

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::format::format_hours_minutes;
use crate::store::{EventStore, Notifier, PersonDirectory, Recipient, StoreError};
use crate::tracker::{Tracker, local_now};
use crate::types::PersonUid;

pub const PERSONAL_SUBJECT: &str = "Your Check-in Weekly Summary";
pub const OVERALL_SUBJECT: &str = "Check-in Summary";

const DATE_FORMAT: &str = "%A, %d.%m.%Y";

/// One person's line in the weekly summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeeklyRow {
    pub uid: PersonUid,
    pub name: String,
    pub enabled: bool,
    /// Formatted `H:MM`.
    pub total: String,
}

/// Outcome of one weekly summary run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeeklyReport {
    pub first_day: NaiveDate,
    pub last_day: NaiveDate,
    pub rows: Vec<WeeklyRow>,
    /// People whose total could not be computed; they get no message.
    pub failed: Vec<PersonUid>,
    pub sent: usize,
    pub notify_failures: usize,
}

/// `today-7 ..= today-1`.
pub fn summary_window(today: NaiveDate) -> (NaiveDate, NaiveDate) {
    (today - Duration::days(7), today - Duration::days(1))
}

fn personal_message(name: &str, total: &str, first: NaiveDate, last: NaiveDate) -> String {
    format!(
        "Hello {name}!\n\n\
         Another week has passed and we're happy to share how much time you were present!\n\
         You have been checked in for {total} hours in the week from {} until {}.\n\
         Happy coding and see you next week!\n\n\
         Your refugees{{code}} team",
        first.format(DATE_FORMAT),
        last.format(DATE_FORMAT),
    )
}

fn overall_message(rows: &[WeeklyRow], first: NaiveDate, last: NaiveDate) -> String {
    let mut message = format!(
        "Hello Trainer!\n\nHere's the summary for the week from {} until {}:\n\n",
        first.format(DATE_FORMAT),
        last.format(DATE_FORMAT),
    );
    for row in rows {
        message.push_str(&format!("{}\t{}\n", row.name, row.total));
    }
    message.push_str("\nHappy coding!");
    message
}

impl<S, N> Tracker<S, N>
where
    S: EventStore + PersonDirectory,
    N: Notifier,
{
    pub fn weekly_summary(&self, trainer: Option<&str>) -> Result<WeeklyReport, StoreError> {
        self.weekly_summary_at(local_now().date(), trainer)
    }

    /// Computes last week's totals and sends the summary messages.
    ///
    /// Without a `trainer` address the overall message is skipped. Delivery
    /// failures are logged and counted. A person whose total cannot be read
    /// is reported in `failed` and left out of every message; only listing
    /// the people can fail the run as a whole.
    pub fn weekly_summary_at(
        &self,
        today: NaiveDate,
        trainer: Option<&str>,
    ) -> Result<WeeklyReport, StoreError> {
        let (first_day, last_day) = summary_window(today);
        tracing::info!(%first_day, %last_day, "sending weekly summary");

        let mut report = WeeklyReport {
            first_day,
            last_day,
            rows: Vec::new(),
            failed: Vec::new(),
            sent: 0,
            notify_failures: 0,
        };

        for person in self.store.list_all()? {
            let total = match self.range_duration(&person.uid, first_day, last_day) {
                Ok(total) => format_hours_minutes(total.duration),
                Err(err) => {
                    tracing::error!(uid = %person.uid, error = %err, "failed to compute weekly total");
                    report.failed.push(person.uid);
                    continue;
                }
            };

            if person.enabled {
                let message = personal_message(&person.name, &total, first_day, last_day);
                self.deliver(
                    &Recipient::Person(person.clone()),
                    PERSONAL_SUBJECT,
                    &message,
                    &mut report,
                );
            }
            report.rows.push(WeeklyRow {
                uid: person.uid,
                name: person.name,
                enabled: person.enabled,
                total,
            });
        }

        match trainer {
            Some(address) => {
                let message = overall_message(&report.rows, first_day, last_day);
                let recipient = Recipient::Address(address.to_string());
                self.deliver(&recipient, OVERALL_SUBJECT, &message, &mut report);
            }
            None => tracing::debug!("no trainer address configured; skipping overall summary"),
        }
        Ok(report)
    }

    fn deliver(&self, recipient: &Recipient, subject: &str, body: &str, report: &mut WeeklyReport) {
        match self.notifier.send(recipient, subject, body) {
            Ok(()) => report.sent += 1,
            Err(err) => {
                tracing::warn!(recipient = recipient.label(), error = %err, "failed to send weekly summary");
                report.notify_failures += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::testing::{enroll, tracker, uid};

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn window_is_the_seven_days_before_today() {
        assert_eq!(
            summary_window(date("2024-06-09")),
            (date("2024-06-02"), date("2024-06-08"))
        );
    }

    #[test]
    fn sums_last_week_and_messages_everyone() {
        let tracker = tracker();
        enroll(&tracker, "a", "Ada");
        enroll(&tracker, "b", "Bo");
        tracker.set_enabled(&uid("b"), false).unwrap();
        // outside the window on both ends
        tracker.store.seed("a", "2024-06-01 09:00:00", true, false);
        tracker.store.seed("a", "2024-06-01 10:00:00", false, false);
        tracker.store.seed("a", "2024-06-09 09:00:00", true, false);
        tracker.store.seed("a", "2024-06-09 10:00:00", false, false);
        // inside
        tracker.store.seed("a", "2024-06-02 09:00:00", true, false);
        tracker.store.seed("a", "2024-06-02 11:30:00", false, false);
        tracker.store.seed("a", "2024-06-08 09:00:00", true, false);
        tracker.store.seed("a", "2024-06-08 09:00:01", false, false);

        let report = tracker
            .weekly_summary_at(date("2024-06-09"), Some("trainer@example.org"))
            .unwrap();

        let totals: Vec<_> = report
            .rows
            .iter()
            .map(|row| (row.name.as_str(), row.total.as_str()))
            .collect();
        assert_eq!(totals, [("Ada", "2:31"), ("Bo", "0:00")]);
        assert_eq!(report.sent, 2);

        let sent = tracker.notifier().sent();
        assert_eq!(sent[0].recipient, "a");
        assert_eq!(sent[0].subject, PERSONAL_SUBJECT);
        assert!(sent[0].body.contains("checked in for 2:31 hours"));
        assert!(sent[0].body.contains("Sunday, 02.06.2024 until Saturday, 08.06.2024"));
        assert_eq!(sent[1].recipient, "trainer@example.org");
        assert!(sent[1].body.contains("Ada\t2:31\nBo\t0:00\n"));
    }

    #[test]
    fn without_trainer_only_personal_messages_go_out() {
        let tracker = tracker();
        enroll(&tracker, "a", "Ada");

        let report = tracker.weekly_summary_at(date("2024-06-09"), None).unwrap();
        assert_eq!(report.sent, 1);
        assert_eq!(tracker.notifier().sent().len(), 1);
    }

    #[test]
    fn delivery_failures_do_not_abort() {
        let tracker = tracker();
        enroll(&tracker, "a", "Ada");
        enroll(&tracker, "b", "Bo");
        tracker.notifier().failing.store(true, Ordering::SeqCst);

        let report = tracker
            .weekly_summary_at(date("2024-06-09"), Some("trainer@example.org"))
            .unwrap();
        assert_eq!(report.rows.len(), 2);
        assert_eq!(report.notify_failures, 3);
        assert_eq!(tracker.notifier().sent().len(), 3);
    }

    #[test]
    fn store_failure_for_one_person_does_not_stop_the_rest() {
        let tracker = tracker();
        enroll(&tracker, "a", "Ada");
        enroll(&tracker, "b", "Bo");
        *tracker.store.fail_reads_for.lock().unwrap() = Some(uid("a"));

        let report = tracker
            .weekly_summary_at(date("2024-06-09"), Some("trainer@example.org"))
            .unwrap();
        assert_eq!(report.failed, [uid("a")]);
        let names: Vec<_> = report.rows.iter().map(|row| row.name.as_str()).collect();
        assert_eq!(names, ["Bo"]);
        // Bo's personal message and the overall one
        assert_eq!(report.sent, 2);
        let sent = tracker.notifier().sent();
        assert!(sent.iter().all(|message| message.recipient != "a"));
        assert!(!sent[1].body.contains("Ada"));
    }
}
