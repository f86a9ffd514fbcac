//! Scheduler daemon: runs auto-checkout daily and the weekly summary weekly.
//!
//! Fire times are computed by pure functions of the current local time.
//! The loop sleeps until the earliest pending job, runs every job due at
//! that instant, then sweeps expired cache entries.

use std::thread;
use std::time::Instant;

use checkin_core::{local_now, weekly::summary_window};
use chrono::{Datelike, Duration, NaiveDateTime, NaiveTime, Weekday};

use super::App;
use crate::Config;

/// When the scheduled jobs fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub auto_checkout_at: NaiveTime,
    pub weekly_summary_day: Weekday,
    pub weekly_summary_at: NaiveTime,
}

impl Schedule {
    pub const fn from_config(config: &Config) -> Self {
        Self {
            auto_checkout_at: config.auto_checkout_at,
            weekly_summary_day: config.weekly_summary_day,
            weekly_summary_at: config.weekly_summary_at,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Job {
    AutoCheckout,
    WeeklySummary,
}

/// The first `at` strictly after `now`.
pub fn next_daily(now: NaiveDateTime, at: NaiveTime) -> NaiveDateTime {
    let today = now.date().and_time(at);
    if today > now {
        today
    } else {
        today + Duration::days(1)
    }
}

/// The first `day` at `at` strictly after `now`.
pub fn next_weekly(now: NaiveDateTime, day: Weekday, at: NaiveTime) -> NaiveDateTime {
    let ahead = (7 + day.num_days_from_monday() - now.weekday().num_days_from_monday()) % 7;
    let candidate = now.date().and_time(at) + Duration::days(i64::from(ahead));
    if candidate > now {
        candidate
    } else {
        candidate + Duration::days(7)
    }
}

/// The earliest fire time after `now` and every job due then.
pub fn next_jobs(now: NaiveDateTime, schedule: &Schedule) -> (NaiveDateTime, Vec<Job>) {
    let auto = next_daily(now, schedule.auto_checkout_at);
    let weekly = next_weekly(now, schedule.weekly_summary_day, schedule.weekly_summary_at);
    let fire_at = auto.min(weekly);

    let mut jobs = Vec::with_capacity(2);
    if auto == fire_at {
        jobs.push(Job::AutoCheckout);
    }
    if weekly == fire_at {
        jobs.push(Job::WeeklySummary);
    }
    (fire_at, jobs)
}

/// Runs one job at `now`, logging instead of propagating failures.
pub fn run_job_at(app: &App, job: Job, now: NaiveDateTime, trainer: Option<&str>) {
    match job {
        Job::AutoCheckout => match app.auto_checkout_at(now) {
            Ok(report) => tracing::info!(closed = report.closed.len(), "auto checkout ran"),
            Err(err) => tracing::error!(error = %err, "auto checkout failed"),
        },
        Job::WeeklySummary => {
            let (first_day, last_day) = summary_window(now.date());
            match app.weekly_summary_at(now.date(), trainer) {
                Ok(report) => tracing::info!(
                    %first_day,
                    %last_day,
                    sent = report.sent,
                    "weekly summary ran"
                ),
                Err(err) => tracing::error!(error = %err, "weekly summary failed"),
            }
        }
    }
}

/// Runs the scheduler until the process is stopped.
pub fn run(app: &App, schedule: &Schedule, trainer: Option<&str>) -> ! {
    tracing::info!(?schedule, "daemon started");
    let mut previous = NaiveDateTime::MIN;
    loop {
        // never fire the same slot twice if the clock steps back
        let now = local_now().max(previous);
        let (fire_at, jobs) = next_jobs(now, schedule);
        previous = fire_at;
        tracing::info!(%fire_at, ?jobs, "waiting for next job");
        thread::sleep((fire_at - now).to_std().unwrap_or_default());

        for job in jobs {
            run_job_at(app, job, fire_at, trainer);
        }
        let dropped = app.cache().sweep(Instant::now());
        tracing::debug!(dropped, stats = ?app.cache().stats(), "swept duration cache");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::util::testing::{app, at, check, register, uid};

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn schedule() -> Schedule {
        Schedule {
            auto_checkout_at: time(23, 59),
            weekly_summary_day: Weekday::Sun,
            weekly_summary_at: time(20, 0),
        }
    }

    #[test]
    fn daily_fires_later_today_or_tomorrow() {
        assert_eq!(next_daily(at("2024-06-03 10:00"), time(23, 59)), at("2024-06-03 23:59"));
        assert_eq!(next_daily(at("2024-06-03 23:59"), time(23, 59)), at("2024-06-04 23:59"));
    }

    #[test]
    fn weekly_fires_on_the_configured_day() {
        // 2024-06-05 is a Wednesday
        assert_eq!(
            next_weekly(at("2024-06-05 12:00"), Weekday::Sun, time(20, 0)),
            at("2024-06-09 20:00")
        );
        assert_eq!(
            next_weekly(at("2024-06-09 19:00"), Weekday::Sun, time(20, 0)),
            at("2024-06-09 20:00")
        );
        assert_eq!(
            next_weekly(at("2024-06-09 20:00"), Weekday::Sun, time(20, 0)),
            at("2024-06-16 20:00")
        );
        assert_eq!(
            next_weekly(at("2024-06-09 21:00"), Weekday::Mon, time(8, 0)),
            at("2024-06-10 08:00")
        );
    }

    #[test]
    fn next_jobs_picks_the_earliest() {
        assert_eq!(
            next_jobs(at("2024-06-09 12:00"), &schedule()),
            (at("2024-06-09 20:00"), vec![Job::WeeklySummary])
        );
        assert_eq!(
            next_jobs(at("2024-06-09 20:00"), &schedule()),
            (at("2024-06-09 23:59"), vec![Job::AutoCheckout])
        );
    }

    #[test]
    fn coinciding_jobs_fire_together() {
        let schedule = Schedule {
            weekly_summary_at: time(23, 59),
            ..schedule()
        };
        assert_eq!(
            next_jobs(at("2024-06-09 12:00"), &schedule),
            (
                at("2024-06-09 23:59"),
                vec![Job::AutoCheckout, Job::WeeklySummary]
            )
        );
    }

    #[test]
    fn auto_checkout_job_closes_sessions() {
        let app = app();
        register(&app, "a", "Ada");
        check(&app, "a", "2024-06-03 09:00");

        run_job_at(&app, Job::AutoCheckout, at("2024-06-03 23:59"), None);

        let latest = app.latest_check(&uid("a")).unwrap().unwrap();
        assert!(latest.auto);
        assert!(!latest.checked_in);
    }
}
