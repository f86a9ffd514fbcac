//! People commands: listing and administration.

use std::io::Write;

use anyhow::{Context, Result};
use checkin_core::{Contact, PersonDirectory, PersonUid};

use super::App;
use super::util::format_time;

pub fn list<W: Write>(writer: &mut W, app: &App) -> Result<()> {
    let people = app.list_people().context("failed to list people")?;
    if people.is_empty() {
        writeln!(writer, "No people registered.")?;
        return Ok(());
    }
    writeln!(writer, "{:<12} {:<30} {:<8} LAST SEEN", "UID", "NAME", "ENABLED")?;
    for person in people {
        let last_seen = app
            .last_seen(&person.uid)?
            .map_or_else(|| "-".to_string(), format_time);
        writeln!(
            writer,
            "{:<12} {:<30} {:<8} {last_seen}",
            person.uid.as_str(),
            person.name,
            if person.enabled { "yes" } else { "no" },
        )?;
    }
    Ok(())
}

pub fn add<W: Write>(
    writer: &mut W,
    app: &App,
    uid: &PersonUid,
    name: &str,
    contact: Contact,
) -> Result<()> {
    let person = app
        .register(uid.clone(), name, contact)
        .context("failed to register person")?;
    writeln!(writer, "Registered {} ({})", person.name, person.uid)?;
    Ok(())
}

/// Sets the enabled flag, or flips it when `enabled` is `None`.
pub fn set_enabled<W: Write>(
    writer: &mut W,
    app: &App,
    uid: &PersonUid,
    enabled: Option<bool>,
) -> Result<()> {
    let person = match enabled {
        Some(enabled) => app.set_enabled(uid, enabled)?,
        None => app.toggle_enabled(uid)?,
    };
    let state = if person.enabled { "enabled" } else { "disabled" };
    writeln!(writer, "{} is now {state}", person.name)?;
    Ok(())
}

pub fn delete<W: Write>(writer: &mut W, app: &App, uid: &PersonUid) -> Result<()> {
    let name = app.store().find(uid)?.map(|person| person.name);
    let removed = app.delete_person(uid)?;
    writeln!(
        writer,
        "Deleted {} ({uid}) and {removed} check(s)",
        name.as_deref().unwrap_or("person")
    )?;
    Ok(())
}
