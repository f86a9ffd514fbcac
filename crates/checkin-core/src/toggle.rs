//! Check-in / check-out toggling and current presence.
//!
//! There is a single "check" action. Whether it opens or closes a session
//! is decided here by inverting the person's latest event, never by the
//! caller. The read of the latest event and the append of the new one run
//! under a per-person lock, so two simultaneous checks of the same person
//! cannot both invert the same previous state.

use std::sync::PoisonError;

use chrono::{Duration, NaiveDateTime};
use serde::Serialize;

use crate::error::AttendanceError;
use crate::event::{CheckEvent, Person};
use crate::store::{EventStore, Notifier, PersonDirectory, StoreError};
use crate::tracker::{Tracker, local_now};
use crate::types::PersonUid;

/// Name prefix of people created on their first unknown check.
pub const PLACEHOLDER_PREFIX: &str = "new-user-";

/// Presence of a known person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    pub checked_in: bool,
    /// The latest event was produced by the auto-checkout trigger.
    pub auto: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_check: Option<NaiveDateTime>,
}

impl Status {
    /// Time elapsed since the latest event, `None` if there never was one.
    pub fn since(&self, now: NaiveDateTime) -> Option<Duration> {
        self.last_check.map(|last| now - last)
    }
}

impl<S, N> Tracker<S, N>
where
    S: EventStore + PersonDirectory,
    N: Notifier,
{
    /// Records a check for `uid` at the current local time.
    ///
    /// The clock is read after the person's lock is taken, so events of one
    /// person are appended in timestamp order.
    pub fn record_check(&self, uid: &PersonUid, auto: bool) -> Result<CheckEvent, StoreError> {
        self.record_check_with(uid, auto, local_now)
    }

    /// Records a check for `uid` at `now`.
    ///
    /// Unknown ids get a disabled placeholder person. The new event opens a
    /// session unless the latest event did. Every cached total of the
    /// person is evicted afterwards.
    pub fn record_check_at(
        &self,
        uid: &PersonUid,
        auto: bool,
        now: NaiveDateTime,
    ) -> Result<CheckEvent, StoreError> {
        self.record_check_with(uid, auto, || now)
    }

    fn record_check_with<F>(
        &self,
        uid: &PersonUid,
        auto: bool,
        clock: F,
    ) -> Result<CheckEvent, StoreError>
    where
        F: FnOnce() -> NaiveDateTime,
    {
        let lock = self.locks.handle(uid);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let now = clock();

        let person = self.resolve_or_register(uid, now)?;
        let latest = self.store.latest(uid)?;
        let event = self.append_toggle(uid, latest.as_ref(), auto, now)?;

        tracing::info!(
            uid = %uid,
            name = %person.name,
            checked_in = event.checked_in,
            auto,
            time = %event.time.format("%d.%m.%Y %H:%M"),
            "{} has checked {}",
            person.name,
            if event.checked_in { "in" } else { "out" },
        );
        Ok(event)
    }

    /// Appends a forced, automatic checkout if `uid` is currently checked in.
    ///
    /// The state check and the append happen under the person's lock, so a
    /// real checkout racing the trigger is never turned into a check-in.
    pub(crate) fn close_open_session_at(
        &self,
        uid: &PersonUid,
        now: NaiveDateTime,
    ) -> Result<Option<CheckEvent>, StoreError> {
        let lock = self.locks.handle(uid);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let latest = self.store.latest(uid)?;
        if !latest.as_ref().is_some_and(|event| event.checked_in) {
            return Ok(None);
        }
        self.append_toggle(uid, latest.as_ref(), true, now).map(Some)
    }

    /// Inverts `latest` and persists the result. Caller holds the lock.
    fn append_toggle(
        &self,
        uid: &PersonUid,
        latest: Option<&CheckEvent>,
        auto: bool,
        now: NaiveDateTime,
    ) -> Result<CheckEvent, StoreError> {
        if let Some(previous) = latest.filter(|previous| previous.time > now) {
            tracing::warn!(
                uid = %uid,
                previous = %previous.time,
                now = %now,
                "check recorded before the latest event; clock skew?"
            );
        }
        let checked_in = latest.is_none_or(|previous| !previous.checked_in);
        let event = self.store.append(uid, now, checked_in, auto)?;
        self.cache.evict_person(uid);
        Ok(event)
    }

    fn resolve_or_register(
        &self,
        uid: &PersonUid,
        now: NaiveDateTime,
    ) -> Result<Person, StoreError> {
        if let Some(person) = self.store.find(uid)? {
            return Ok(person);
        }
        let name = format!("{PLACEHOLDER_PREFIX}{}", now.format("%Y-%m-%dT%H:%M:%S%.f"));
        tracing::info!(uid = %uid, name = %name, "unknown person checked; creating placeholder");
        self.store.create_placeholder(uid, &name)
    }

    /// The most recent event of a person.
    pub fn latest_check(&self, uid: &PersonUid) -> Result<Option<CheckEvent>, StoreError> {
        self.store.latest(uid)
    }

    /// Whether the person's latest event opened a session.
    ///
    /// A person without events is not checked in.
    pub fn is_checked_in(&self, uid: &PersonUid) -> Result<bool, StoreError> {
        Ok(self.store.latest(uid)?.is_some_and(|event| event.checked_in))
    }

    /// Presence of an explicitly identified person.
    ///
    /// Unknown ids yield [`AttendanceError::PersonNotFound`]; a known person
    /// who never checked in yields a not-checked-in status without a last
    /// check.
    pub fn status(&self, uid: &PersonUid) -> Result<Status, AttendanceError> {
        if self.store.find(uid)?.is_none() {
            return Err(AttendanceError::PersonNotFound(uid.clone()));
        }
        let latest = self.store.latest(uid)?;
        Ok(Status {
            checked_in: latest.as_ref().is_some_and(|event| event.checked_in),
            auto: latest.as_ref().is_some_and(|event| event.auto),
            last_check: latest.map(|event| event.time),
        })
    }
}
