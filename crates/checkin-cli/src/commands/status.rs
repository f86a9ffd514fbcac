//! Status command: presence of a single person.

use std::io::Write;

use anyhow::Result;
use checkin_core::{PersonDirectory, PersonUid, local_now};
use chrono::NaiveDateTime;

use super::App;
use super::util::{format_elapsed, format_time, state_label};

pub fn run<W: Write>(writer: &mut W, app: &App, uid: &PersonUid) -> Result<()> {
    run_at(writer, app, uid, local_now())
}

/// Unknown ids fail with "person not found".
pub fn run_at<W: Write>(
    writer: &mut W,
    app: &App,
    uid: &PersonUid,
    now: NaiveDateTime,
) -> Result<()> {
    let status = app.status(uid)?;
    let name = app
        .store()
        .find(uid)?
        .map_or_else(|| uid.to_string(), |person| person.name);

    writeln!(
        writer,
        "{name}: checked {}",
        state_label(status.checked_in, status.auto)
    )?;
    match status.last_check {
        Some(last) => writeln!(
            writer,
            "Last check: {} ({} ago)",
            format_time(last),
            format_elapsed(status.since(now))
        )?,
        None => writeln!(writer, "Last check: never")?,
    }
    Ok(())
}
