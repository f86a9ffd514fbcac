//! The attendance engine handle.
//!
//! A [`Tracker`] bundles the collaborators (event store, person directory,
//! notifier) with the shared result cache and the per-person write locks.
//! Its operations are spread across the modules that own each concern:
//! toggling in [`crate::toggle`], aggregation in [`crate::aggregate`],
//! administration in [`crate::people`], and the scheduled jobs in
//! [`crate::auto_checkout`] and [`crate::weekly`].
//!
//! # Thread Safety
//!
//! `Tracker` is `Sync` whenever its collaborators are, and is meant to be
//! shared (e.g. behind an `Arc`) by concurrent requests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration as StdDuration;

use chrono::{Local, NaiveDateTime};

use crate::cache::{DEFAULT_TTL, DurationCache};
use crate::store::{EventStore, Notifier, PersonDirectory};
use crate::types::PersonUid;

/// Engine settings.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Sliding time-to-live of cached daily totals.
    pub cache_ttl: StdDuration,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            cache_ttl: DEFAULT_TTL,
        }
    }
}

/// The attendance engine.
pub struct Tracker<S, N> {
    pub(crate) store: S,
    pub(crate) notifier: N,
    pub(crate) cache: DurationCache,
    pub(crate) locks: PersonLocks,
}

impl<S, N> Tracker<S, N>
where
    S: EventStore + PersonDirectory,
    N: Notifier,
{
    pub fn new(store: S, notifier: N) -> Self {
        Self::with_config(store, notifier, &TrackerConfig::default())
    }

    pub fn with_config(store: S, notifier: N, config: &TrackerConfig) -> Self {
        Self {
            store,
            notifier,
            cache: DurationCache::new(config.cache_ttl),
            locks: PersonLocks::default(),
        }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    pub const fn notifier(&self) -> &N {
        &self.notifier
    }

    pub const fn cache(&self) -> &DurationCache {
        &self.cache
    }
}

/// Current local wall-clock time, the timeline all events live on.
pub fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// One mutex per person, serializing read-then-append toggles.
#[derive(Debug, Default)]
pub(crate) struct PersonLocks {
    locks: Mutex<HashMap<PersonUid, Arc<Mutex<()>>>>,
}

impl PersonLocks {
    /// Returns the lock for `uid`, creating it on first use.
    pub(crate) fn handle(&self, uid: &PersonUid) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(uid.clone()).or_default())
    }

    /// Drops the lock entry of a deleted person.
    ///
    /// An entry still shared with a caller waiting on it is kept, otherwise
    /// that caller and a later one would hold different mutexes for the same
    /// person.
    pub(crate) fn forget(&self, uid: &PersonUid) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        if locks.get(uid).is_some_and(|lock| Arc::strong_count(lock) == 1) {
            locks.remove(uid);
        }
    }

    #[cfg(test)]
    pub(crate) fn entry_count(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
