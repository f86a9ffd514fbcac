//! Overview command: the month table as tab-separated values or JSON.

use std::io::Write;

use anyhow::{Context, Result};
use checkin_core::{Overview, YearMonth};

use super::App;

/// Label of the average checkout row.
const AVERAGE_ROW: &str = "avg checkout";

pub fn run<W: Write>(writer: &mut W, app: &App, month: YearMonth, json: bool) -> Result<()> {
    let overview = app
        .overview(month)
        .with_context(|| format!("failed to compute overview for {month}"))?;
    if json {
        writeln!(writer, "{}", serde_json::to_string_pretty(&overview)?)?;
    } else {
        write_tsv(writer, &overview)?;
    }
    Ok(())
}

fn write_tsv<W: Write>(writer: &mut W, overview: &Overview) -> Result<()> {
    writeln!(writer, "name\t{}", overview.columns.join("\t"))?;
    for attendance in &overview.attendances {
        writeln!(writer, "{}\t{}", attendance.name, attendance.durations.join("\t"))?;
    }
    let averages: Vec<&str> = overview
        .average_checkouts
        .iter()
        .map(|value| value.as_deref().unwrap_or(""))
        .collect();
    writeln!(writer, "{AVERAGE_ROW}\t{}", averages.join("\t"))?;
    Ok(())
}
