//! Scheduled closing of sessions people forgot to end.
//!
//! The trigger appends an automatic checkout for every checked-in person
//! and tells them about it. Their session length is estimated later, when
//! the day is aggregated.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::store::{EventStore, Notifier, PersonDirectory, Recipient, StoreError};
use crate::tracker::{Tracker, local_now};
use crate::types::PersonUid;

pub const FORGOT_CHECKOUT_SUBJECT: &str = "Attendance - Forgot to check out?";

fn forgot_checkout_message(name: &str) -> String {
    format!(
        "Hello {name}!\n\n\
         Did you forget to check out today?\n\
         You have been checked out automatically.\n\n\
         Your refugees{{code}} team"
    )
}

/// Outcome of one auto-checkout run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AutoCheckoutReport {
    /// People who received an automatic checkout.
    pub closed: Vec<PersonUid>,
    /// People whose checkout could not be recorded.
    pub failed: Vec<PersonUid>,
    /// Notifications that could not be delivered.
    pub notify_failures: usize,
}

impl<S, N> Tracker<S, N>
where
    S: EventStore + PersonDirectory,
    N: Notifier,
{
    pub fn auto_checkout(&self) -> Result<AutoCheckoutReport, StoreError> {
        self.auto_checkout_at(local_now())
    }

    /// Closes every open session at `now` with an automatic checkout.
    ///
    /// A failure for one person is logged and does not stop the others.
    /// Only listing the people can fail the run as a whole.
    pub fn auto_checkout_at(&self, now: NaiveDateTime) -> Result<AutoCheckoutReport, StoreError> {
        let mut report = AutoCheckoutReport::default();
        for person in self.store.list_all()? {
            match self.close_open_session_at(&person.uid, now) {
                Ok(None) => {}
                Ok(Some(_)) => {
                    tracing::info!(uid = %person.uid, name = %person.name, "auto checked out");
                    let message = forgot_checkout_message(&person.name);
                    let recipient = Recipient::Person(person.clone());
                    if let Err(err) =
                        self.notifier
                            .send(&recipient, FORGOT_CHECKOUT_SUBJECT, &message)
                    {
                        tracing::warn!(uid = %person.uid, error = %err, "failed to notify about auto checkout");
                        report.notify_failures += 1;
                    }
                    report.closed.push(person.uid);
                }
                Err(err) => {
                    tracing::error!(uid = %person.uid, error = %err, "auto checkout failed");
                    report.failed.push(person.uid);
                }
            }
        }
        tracing::info!(
            closed = report.closed.len(),
            failed = report.failed.len(),
            "auto checkout finished"
        );
        Ok(report)
    }
}
