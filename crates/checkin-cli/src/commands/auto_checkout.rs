//! Auto-checkout command: closes every open session now.

use std::io::Write;

use anyhow::{Context, Result};
use checkin_core::{AutoCheckoutReport, PersonUid, local_now};
use chrono::NaiveDateTime;

use super::App;

pub fn run<W: Write>(writer: &mut W, app: &App) -> Result<()> {
    run_at(writer, app, local_now())
}

pub fn run_at<W: Write>(writer: &mut W, app: &App, now: NaiveDateTime) -> Result<()> {
    let report = app.auto_checkout_at(now).context("auto checkout failed")?;
    write_report(writer, &report)
}

pub fn write_report<W: Write>(writer: &mut W, report: &AutoCheckoutReport) -> Result<()> {
    if report.closed.is_empty() {
        writeln!(writer, "Nobody was checked in.")?;
    } else {
        let closed: Vec<&str> = report.closed.iter().map(PersonUid::as_str).collect();
        writeln!(
            writer,
            "Checked out {} person(s): {}",
            closed.len(),
            closed.join(", ")
        )?;
    }
    for uid in &report.failed {
        writeln!(writer, "Failed to check out {uid}")?;
    }
    if report.notify_failures > 0 {
        writeln!(
            writer,
            "{} notification(s) could not be sent",
            report.notify_failures
        )?;
    }
    Ok(())
}
