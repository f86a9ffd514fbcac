//! Collaborator interfaces consumed by the engine.
//!
//! The engine never talks to storage or delivery channels directly. It is
//! generic over these traits so the SQLite store, the webhook notifier and
//! the in-memory test doubles are interchangeable.
//!
//! All timestamps are local wall-clock [`NaiveDateTime`]s. Range queries are
//! half-open: `start` inclusive, `end` exclusive.

use std::error::Error as StdError;

use chrono::NaiveDateTime;
use thiserror::Error;

use crate::event::{CheckEvent, Person};
use crate::types::PersonUid;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Failure of the event store or person directory.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store rejected or failed the operation.
    #[error("store backend failure: {0}")]
    Backend(#[source] BoxError),
    /// A stored row could not be turned back into a domain value.
    #[error("corrupt record {record}: {message}")]
    Corrupt { record: String, message: String },
}

impl StoreError {
    pub fn backend(source: impl Into<BoxError>) -> Self {
        Self::Backend(source.into())
    }
}

/// Failure to deliver a notification. Never fatal to the caller.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The recipient has no address the notifier can deliver to.
    #[error("no delivery address for {recipient}")]
    NoAddress { recipient: String },
    /// The delivery channel failed.
    #[error("delivery failed: {0}")]
    Delivery(#[source] BoxError),
}

/// Durable, time-ordered storage of check events.
pub trait EventStore: Send + Sync {
    /// Persists a new event and returns it with its assigned id.
    fn append(
        &self,
        person: &PersonUid,
        time: NaiveDateTime,
        checked_in: bool,
        auto: bool,
    ) -> Result<CheckEvent, StoreError>;

    /// The most recent event of a person.
    fn latest(&self, person: &PersonUid) -> Result<Option<CheckEvent>, StoreError>;

    /// The most recent event of a person strictly before `before`.
    fn latest_before(
        &self,
        person: &PersonUid,
        before: NaiveDateTime,
    ) -> Result<Option<CheckEvent>, StoreError>;

    /// A person's events in `[start, end)`, oldest first.
    fn between(
        &self,
        person: &PersonUid,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<CheckEvent>, StoreError>;

    /// For every enabled person, their latest real (non-auto) checkout in
    /// `[start, end)`. People without one are omitted.
    fn latest_real_checkouts(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<CheckEvent>, StoreError>;

    /// Removes every event of a person, returning how many were removed.
    fn delete_events(&self, person: &PersonUid) -> Result<usize, StoreError>;
}

/// Identity records.
pub trait PersonDirectory: Send + Sync {
    fn find(&self, uid: &PersonUid) -> Result<Option<Person>, StoreError>;

    /// Creates a disabled person so unknown check events never fail.
    fn create_placeholder(&self, uid: &PersonUid, name: &str) -> Result<Person, StoreError>;

    /// Inserts or replaces a person record.
    fn save(&self, person: &Person) -> Result<(), StoreError>;

    /// Removes a person record. Returns `false` if it did not exist.
    fn remove(&self, uid: &PersonUid) -> Result<bool, StoreError>;

    fn list_enabled(&self) -> Result<Vec<Person>, StoreError>;

    fn list_all(&self) -> Result<Vec<Person>, StoreError>;
}

/// Who a notification is addressed to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Recipient {
    /// A tracked person; the notifier picks the channel from their record.
    Person(Person),
    /// A bare address (e.g. the trainer's mailbox or a channel).
    Address(String),
}

impl Recipient {
    /// Name used in log lines.
    pub fn label(&self) -> &str {
        match self {
            Self::Person(person) => person.uid.as_str(),
            Self::Address(address) => address,
        }
    }
}

/// Outbound, best-effort message delivery.
pub trait Notifier: Send + Sync {
    fn send(&self, recipient: &Recipient, subject: &str, body: &str) -> Result<(), NotifyError>;
}
