//! CLI subcommand implementations.
//!
//! Every command writes to a caller-supplied writer so output can be
//! snapshot-tested. Commands that depend on the clock take `now` in an
//! `_at` variant.

use checkin_core::Tracker;
use checkin_db::Database;
use checkin_notify::AnyNotifier;

pub mod auto_checkout;
pub mod avg_checkout;
pub mod check;
pub mod checks;
pub mod daemon;
pub mod overview;
pub mod people;
pub mod status;
pub mod summary;
mod util;
pub mod weekly;

/// The engine as wired by the binary.
pub type App = Tracker<Database, AnyNotifier>;
