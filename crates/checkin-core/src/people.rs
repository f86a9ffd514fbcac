//! Person administration.

use chrono::NaiveDateTime;

use crate::error::AttendanceError;
use crate::event::Person;
use crate::store::{EventStore, Notifier, PersonDirectory, StoreError};
use crate::tracker::Tracker;
use crate::types::PersonUid;

/// Contact details for a newly registered person.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Contact {
    pub email: Option<String>,
    pub slack_handle: Option<String>,
}

impl<S, N> Tracker<S, N>
where
    S: EventStore + PersonDirectory,
    N: Notifier,
{
    /// Creates or replaces an enabled person.
    ///
    /// Registering an id that already exists (for instance a placeholder
    /// created by an unknown check) keeps its events and enables it.
    pub fn register(
        &self,
        uid: PersonUid,
        name: &str,
        contact: Contact,
    ) -> Result<Person, AttendanceError> {
        let person = Person {
            uid,
            name: name.to_string(),
            email: contact.email,
            slack_handle: contact.slack_handle,
            enabled: true,
        };
        self.store.save(&person)?;
        tracing::info!(uid = %person.uid, name = %person.name, "registered person");
        Ok(person)
    }

    /// Every known person.
    pub fn list_people(&self) -> Result<Vec<Person>, StoreError> {
        self.store.list_all()
    }

    fn find_person(&self, uid: &PersonUid) -> Result<Person, AttendanceError> {
        self.store
            .find(uid)?
            .ok_or_else(|| AttendanceError::PersonNotFound(uid.clone()))
    }

    pub fn set_enabled(&self, uid: &PersonUid, enabled: bool) -> Result<Person, AttendanceError> {
        let mut person = self.find_person(uid)?;
        if person.enabled != enabled {
            person.enabled = enabled;
            self.store.save(&person)?;
            // the checkout average depends on who is enabled
            self.cache.clear();
            tracing::info!(uid = %uid, enabled, "changed person state");
        }
        Ok(person)
    }

    pub fn toggle_enabled(&self, uid: &PersonUid) -> Result<Person, AttendanceError> {
        let enabled = self.find_person(uid)?.enabled;
        self.set_enabled(uid, !enabled)
    }

    /// Deletes a person and all their events.
    ///
    /// Events go first so a failure halfway leaves a person without
    /// history rather than history without a person.
    pub fn delete_person(&self, uid: &PersonUid) -> Result<usize, AttendanceError> {
        let lock = self.locks.handle(uid);
        let removed_events = {
            let _guard = lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            self.find_person(uid)?;
            let removed_events = self.store.delete_events(uid)?;
            if !self.store.remove(uid)? {
                return Err(AttendanceError::PersonNotFound(uid.clone()));
            }
            removed_events
        };
        drop(lock);
        self.locks.forget(uid);
        // their real checkouts may have shaped other people's estimates
        self.cache.clear();
        tracing::info!(uid = %uid, removed_events, "deleted person");
        Ok(removed_events)
    }

    /// Time of the latest event, for listing purposes.
    pub fn last_seen(&self, uid: &PersonUid) -> Result<Option<NaiveDateTime>, StoreError> {
        Ok(self.store.latest(uid)?.map(|event| event.time))
    }
}
