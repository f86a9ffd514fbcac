//! In-memory collaborators for unit tests.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::NaiveDateTime;

use crate::event::{CheckEvent, Person};
use crate::store::{EventStore, NotifyError, Notifier, PersonDirectory, Recipient, StoreError};
use crate::tracker::Tracker;
use crate::types::PersonUid;

#[derive(Debug, Default)]
pub struct MemoryStore {
    events: Mutex<Vec<CheckEvent>>,
    people: Mutex<BTreeMap<PersonUid, Person>>,
    /// Fail every append for this person.
    pub fail_appends_for: Mutex<Option<PersonUid>>,
    /// Fail every range query for this person.
    pub fail_reads_for: Mutex<Option<PersonUid>>,
}

impl MemoryStore {
    pub fn events(&self) -> Vec<CheckEvent> {
        self.events.lock().unwrap().clone()
    }

    /// Inserts an event directly, bypassing the toggle logic.
    pub fn seed(&self, person: &str, time: &str, checked_in: bool, auto: bool) {
        let person = uid(person);
        self.append(&person, at(time), checked_in, auto).unwrap();
    }
}

fn sorted(mut events: Vec<CheckEvent>) -> Vec<CheckEvent> {
    events.sort_by_key(|event| (event.time, event.id));
    events
}

impl EventStore for MemoryStore {
    fn append(
        &self,
        person: &PersonUid,
        time: NaiveDateTime,
        checked_in: bool,
        auto: bool,
    ) -> Result<CheckEvent, StoreError> {
        if self.fail_appends_for.lock().unwrap().as_ref() == Some(person) {
            return Err(StoreError::backend("append rejected"));
        }
        let mut events = self.events.lock().unwrap();
        let event = CheckEvent {
            id: i64::try_from(events.len()).unwrap() + 1,
            person: person.clone(),
            time,
            checked_in,
            auto,
        };
        events.push(event.clone());
        Ok(event)
    }

    fn latest(&self, person: &PersonUid) -> Result<Option<CheckEvent>, StoreError> {
        let events = self.events.lock().unwrap().clone();
        Ok(sorted(events)
            .into_iter()
            .filter(|event| &event.person == person)
            .next_back())
    }

    fn latest_before(
        &self,
        person: &PersonUid,
        before: NaiveDateTime,
    ) -> Result<Option<CheckEvent>, StoreError> {
        let events = self.events.lock().unwrap().clone();
        Ok(sorted(events)
            .into_iter()
            .filter(|event| &event.person == person && event.time < before)
            .next_back())
    }

    fn between(
        &self,
        person: &PersonUid,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<CheckEvent>, StoreError> {
        if self.fail_reads_for.lock().unwrap().as_ref() == Some(person) {
            return Err(StoreError::backend("read rejected"));
        }
        let events = self.events.lock().unwrap().clone();
        Ok(sorted(events)
            .into_iter()
            .filter(|event| &event.person == person && event.time >= start && event.time < end)
            .collect())
    }

    fn latest_real_checkouts(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<CheckEvent>, StoreError> {
        let enabled = self.list_enabled()?;
        let events = sorted(self.events.lock().unwrap().clone());
        Ok(enabled
            .iter()
            .filter_map(|person| {
                events
                    .iter()
                    .filter(|event| {
                        event.person == person.uid
                            && !event.checked_in
                            && !event.auto
                            && event.time >= start
                            && event.time < end
                    })
                    .next_back()
                    .cloned()
            })
            .collect())
    }

    fn delete_events(&self, person: &PersonUid) -> Result<usize, StoreError> {
        let mut events = self.events.lock().unwrap();
        let before = events.len();
        events.retain(|event| &event.person != person);
        Ok(before - events.len())
    }
}

impl PersonDirectory for MemoryStore {
    fn find(&self, uid: &PersonUid) -> Result<Option<Person>, StoreError> {
        Ok(self.people.lock().unwrap().get(uid).cloned())
    }

    fn create_placeholder(&self, uid: &PersonUid, name: &str) -> Result<Person, StoreError> {
        let mut person = Person::new(uid.clone(), name);
        person.enabled = false;
        self.people
            .lock()
            .unwrap()
            .insert(uid.clone(), person.clone());
        Ok(person)
    }

    fn save(&self, person: &Person) -> Result<(), StoreError> {
        self.people
            .lock()
            .unwrap()
            .insert(person.uid.clone(), person.clone());
        Ok(())
    }

    fn remove(&self, uid: &PersonUid) -> Result<bool, StoreError> {
        Ok(self.people.lock().unwrap().remove(uid).is_some())
    }

    fn list_enabled(&self) -> Result<Vec<Person>, StoreError> {
        Ok(self
            .people
            .lock()
            .unwrap()
            .values()
            .filter(|person| person.enabled)
            .cloned()
            .collect())
    }

    fn list_all(&self) -> Result<Vec<Person>, StoreError> {
        Ok(self.people.lock().unwrap().values().cloned().collect())
    }
}

/// A sent message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sent {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Sent>>,
    pub failing: AtomicBool,
}

impl RecordingNotifier {
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, recipient: &Recipient, subject: &str, body: &str) -> Result<(), NotifyError> {
        self.sent.lock().unwrap().push(Sent {
            recipient: recipient.label().to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        if self.failing.load(Ordering::SeqCst) {
            return Err(NotifyError::Delivery("smtp down".into()));
        }
        Ok(())
    }
}

pub type TestTracker = Tracker<MemoryStore, RecordingNotifier>;

pub fn tracker() -> TestTracker {
    Tracker::new(MemoryStore::default(), RecordingNotifier::default())
}

/// Registers an enabled person.
pub fn enroll(tracker: &TestTracker, id: &str, name: &str) {
    tracker.store.save(&Person::new(uid(id), name)).unwrap();
}

pub fn uid(id: &str) -> PersonUid {
    PersonUid::new(id).unwrap()
}

/// Parses `YYYY-MM-DD HH:MM:SS`.
pub fn at(time: &str) -> NaiveDateTime {
    NaiveDateTime::parse_from_str(time, "%Y-%m-%d %H:%M:%S").unwrap()
}
