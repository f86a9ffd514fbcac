//! Average checkout command.

use std::io::Write;

use anyhow::{Context, Result};
use checkin_core::format::format_clock;
use chrono::NaiveDate;

use super::App;

pub fn run<W: Write>(writer: &mut W, app: &App, day: NaiveDate) -> Result<()> {
    let average = app
        .average_checkout_time(day)
        .with_context(|| format!("failed to compute average checkout for {day}"))?;
    writeln!(writer, "{day} {}", format_clock(average))?;
    Ok(())
}
