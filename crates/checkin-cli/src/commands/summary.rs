//! Summary command: presence of every enabled person.

use std::io::Write;

use anyhow::{Context, Result};
use checkin_core::format::format_hours_minutes;
use checkin_core::{Summary, local_now};
use chrono::NaiveDateTime;

use super::App;
use super::util::{format_elapsed, state_label};

pub fn run<W: Write>(writer: &mut W, app: &App, json: bool) -> Result<()> {
    run_at(writer, app, json, local_now())
}

pub fn run_at<W: Write>(writer: &mut W, app: &App, json: bool, now: NaiveDateTime) -> Result<()> {
    let summaries = app
        .public_summaries_at(now)
        .context("failed to compute summaries")?;
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&summaries)?)?;
    } else {
        write_table(writer, &summaries)?;
    }
    Ok(())
}

fn write_table<W: Write>(writer: &mut W, summaries: &[Summary]) -> Result<()> {
    if summaries.is_empty() {
        writeln!(writer, "No enabled people.")?;
        return Ok(());
    }
    writeln!(writer, "{:<20} {:<10} {:>6} {:>6}", "NAME", "STATE", "SINCE", "WEEK")?;
    for summary in summaries {
        writeln!(
            writer,
            "{:<20} {:<10} {:>6} {:>6}",
            summary.name,
            state_label(summary.checked_in, summary.auto),
            format_elapsed(summary.last_duration),
            format_hours_minutes(summary.week_duration),
        )?;
    }
    Ok(())
}
