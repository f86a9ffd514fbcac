//! Command-line argument definitions.

use std::path::PathBuf;

use checkin_core::{PersonUid, ValidationError, YearMonth};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};

/// Attendance check-in tracker.
///
/// Records check-ins and check-outs, closes forgotten sessions and reports
/// daily, weekly and monthly presence.
#[derive(Debug, Parser)]
#[command(name = "checkin", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

fn parse_uid(value: &str) -> Result<PersonUid, ValidationError> {
    PersonUid::new(value)
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Record a check for a person, toggling in and out.
    Check {
        /// The person's card or badge id.
        #[arg(value_parser = parse_uid)]
        uid: PersonUid,
    },

    /// Show whether a person is checked in.
    Status {
        #[arg(value_parser = parse_uid)]
        uid: PersonUid,
    },

    /// Show presence of all enabled people.
    Summary {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Manage people.
    #[command(subcommand)]
    People(PeopleAction),

    /// Show the month table of every enabled person.
    Overview {
        /// Month as YYYY-MM.
        month: YearMonth,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List a person's checks within a month, newest first.
    Checks {
        #[arg(value_parser = parse_uid)]
        uid: PersonUid,

        /// Month as YYYY-MM.
        month: YearMonth,
    },

    /// Show the average checkout time of a day.
    AvgCheckout {
        /// Day as YYYY-MM-DD.
        day: NaiveDate,
    },

    /// Check out everyone who is still checked in.
    AutoCheckout,

    /// Send last week's presence summary.
    WeeklySummary,

    /// Run auto-checkout and the weekly summary on schedule.
    Daemon,
}

/// People administration actions.
#[derive(Debug, Subcommand)]
pub enum PeopleAction {
    /// List all known people.
    List,

    /// Register a person, or complete a placeholder created by a check.
    Add {
        #[arg(value_parser = parse_uid)]
        uid: PersonUid,

        /// Display name.
        name: String,

        #[arg(long)]
        email: Option<String>,

        /// Handle mentioned in webhook messages.
        #[arg(long)]
        slack: Option<String>,
    },

    /// Include a person in overviews and averages.
    Enable {
        #[arg(value_parser = parse_uid)]
        uid: PersonUid,
    },

    /// Exclude a person from overviews and averages.
    Disable {
        #[arg(value_parser = parse_uid)]
        uid: PersonUid,
    },

    /// Flip a person's enabled state.
    Toggle {
        #[arg(value_parser = parse_uid)]
        uid: PersonUid,
    },

    /// Delete a person and all their checks.
    Delete {
        #[arg(value_parser = parse_uid)]
        uid: PersonUid,
    },
}
