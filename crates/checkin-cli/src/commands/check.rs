//! Check command: toggles a person in or out.

use std::io::Write;

use anyhow::{Context, Result};
use checkin_core::{CheckEvent, PersonDirectory, PersonUid};
use chrono::NaiveDateTime;

use super::App;
use super::util::format_time;

pub fn run<W: Write>(writer: &mut W, app: &App, uid: &PersonUid) -> Result<()> {
    let event = app
        .record_check(uid, false)
        .context("failed to record check")?;
    render(writer, app, &event)
}

pub fn run_at<W: Write>(
    writer: &mut W,
    app: &App,
    uid: &PersonUid,
    now: NaiveDateTime,
) -> Result<()> {
    let event = app
        .record_check_at(uid, false, now)
        .context("failed to record check")?;
    render(writer, app, &event)
}

fn render<W: Write>(writer: &mut W, app: &App, event: &CheckEvent) -> Result<()> {
    let name = app
        .store()
        .find(&event.person)?
        .map_or_else(|| event.person.to_string(), |person| person.name);
    let direction = if event.checked_in { "in" } else { "out" };
    writeln!(
        writer,
        "{name} checked {direction} at {}",
        format_time(event.time)
    )?;
    Ok(())
}
