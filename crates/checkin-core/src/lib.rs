//! Attendance state and duration aggregation.
//!
//! This crate contains the domain logic of the check-in system:
//! - Toggling: one "check" action that alternates in and out per person
//! - Estimation: closing auto-checked-out sessions at the day's average checkout
//! - Aggregation: session, day, week and month totals behind a TTL cache
//! - Scheduled jobs: auto-checkout and the weekly summary
//!
//! Storage and message delivery are abstracted behind [`EventStore`],
//! [`PersonDirectory`] and [`Notifier`].

pub mod aggregate;
pub mod auto_checkout;
pub mod cache;
mod duration;
mod error;
pub mod estimate;
mod event;
pub mod format;
pub mod people;
mod store;
#[cfg(test)]
mod testing;
pub mod toggle;
mod tracker;
pub mod types;
pub mod weekly;

pub use aggregate::{Attendance, ClientStatus, Overview, Summary, overview_columns};
pub use auto_checkout::AutoCheckoutReport;
pub use cache::{CacheStats, DayTotal, DurationCache};
pub use duration::{SessionDuration, session_duration};
pub use error::AttendanceError;
pub use event::{CheckEvent, Person};
pub use people::Contact;
pub use store::{EventStore, Notifier, NotifyError, PersonDirectory, Recipient, StoreError};
pub use toggle::Status;
pub use tracker::{Tracker, TrackerConfig, local_now};
pub use types::{PersonUid, ValidationError, YearMonth};
pub use weekly::{WeeklyReport, WeeklyRow};
