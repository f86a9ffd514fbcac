//! Checks command: a person's check log for one month.

use std::io::Write;

use anyhow::Result;
use checkin_core::{PersonUid, YearMonth};

use super::App;
use super::util::{format_time, state_label};

pub fn run<W: Write>(writer: &mut W, app: &App, uid: &PersonUid, month: YearMonth) -> Result<()> {
    let checks = app.checks_in_month(uid, month)?;
    if checks.is_empty() {
        writeln!(writer, "No checks in {month}.")?;
        return Ok(());
    }
    for check in checks {
        writeln!(
            writer,
            "{}  {}",
            format_time(check.time),
            state_label(check.checked_in, check.auto)
        )?;
    }
    Ok(())
}
