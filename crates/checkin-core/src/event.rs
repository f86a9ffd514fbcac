//! People and the check events they produce.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::types::PersonUid;

/// An identity record in the person directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// External identifier presented at the check-in terminal.
    pub uid: PersonUid,
    /// Display name.
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slack_handle: Option<String>,
    /// Disabled people are excluded from overviews and the checkout average.
    pub enabled: bool,
}

impl Person {
    /// Creates an enabled person without contact details.
    pub fn new(uid: PersonUid, name: impl Into<String>) -> Self {
        Self {
            uid,
            name: name.into(),
            email: None,
            slack_handle: None,
            enabled: true,
        }
    }
}

/// An immutable in/out toggle fact.
///
/// Events of one person ordered by `time` are expected to alternate
/// `checked_in` starting with `true`. Nothing downstream relies on that
/// for safety; aggregation treats each closing event on its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckEvent {
    /// Store-assigned identifier, increasing in insertion order.
    pub id: i64,
    pub person: PersonUid,
    /// Local wall-clock time of the check.
    pub time: NaiveDateTime,
    /// `true` opens a session, `false` closes one.
    pub checked_in: bool,
    /// Produced by the auto-checkout trigger rather than a real action.
    pub auto: bool,
}

impl CheckEvent {
    pub fn date(&self) -> NaiveDate {
        self.time.date()
    }
}
