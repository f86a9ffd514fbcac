//! Weekly summary command.

use std::io::Write;

use anyhow::{Context, Result};
use checkin_core::{WeeklyReport, local_now};
use chrono::NaiveDate;

use super::App;

pub fn run<W: Write>(writer: &mut W, app: &App, trainer: Option<&str>) -> Result<()> {
    run_at(writer, app, local_now().date(), trainer)
}

pub fn run_at<W: Write>(
    writer: &mut W,
    app: &App,
    today: NaiveDate,
    trainer: Option<&str>,
) -> Result<()> {
    let report = app
        .weekly_summary_at(today, trainer)
        .context("weekly summary failed")?;
    write_report(writer, &report)
}

pub fn write_report<W: Write>(writer: &mut W, report: &WeeklyReport) -> Result<()> {
    writeln!(writer, "Week {} to {}", report.first_day, report.last_day)?;
    for row in &report.rows {
        writeln!(writer, "{:<20} {:>6}", row.name, row.total)?;
    }
    for uid in &report.failed {
        writeln!(writer, "Failed to summarize {uid}")?;
    }
    writeln!(
        writer,
        "Sent {} message(s), {} failed",
        report.sent, report.notify_failures
    )?;
    Ok(())
}
