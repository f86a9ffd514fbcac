//! Memoized per-(person, day) duration totals.
//!
//! # Expiry
//!
//! Entries expire a fixed TTL after their last access; every hit refreshes
//! the deadline. Expired entries are dropped lazily on read or by
//! [`DurationCache::sweep`].
//!
//! # Invalidation
//!
//! Recording a check for a person evicts every cached day of that person.
//! Each person carries a generation counter bumped on eviction; a value
//! computed while an eviction happened is returned to its caller but never
//! stored, so a later read cannot observe a total from before the event.
//!
//! # Thread Safety
//!
//! All state sits behind one `Mutex`. The lock is never held while a value
//! is being computed, so concurrent misses on the same key may compute
//! twice; both results are equal and the second insert wins.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration as StdDuration, Instant};

use chrono::{Duration, NaiveDate};

use crate::types::PersonUid;

/// Default time-to-live, measured from last access.
pub const DEFAULT_TTL: StdDuration = StdDuration::from_secs(24 * 60 * 60);

/// A cached daily total.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayTotal {
    pub duration: Duration,
    /// Any contributing session was estimated.
    pub estimated: bool,
}

impl DayTotal {
    pub const ZERO: Self = Self {
        duration: Duration::zero(),
        estimated: false,
    };
}

#[derive(Debug)]
struct Entry {
    value: DayTotal,
    last_access: Instant,
}

#[derive(Debug, Default)]
struct PersonEntries {
    generation: u64,
    days: HashMap<NaiveDate, Entry>,
}

/// Hit and miss counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

/// Concurrent TTL cache keyed by person and calendar day.
#[derive(Debug)]
pub struct DurationCache {
    ttl: StdDuration,
    people: Mutex<HashMap<PersonUid, PersonEntries>>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for DurationCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl DurationCache {
    pub fn new(ttl: StdDuration) -> Self {
        Self {
            ttl,
            people: Mutex::new(HashMap::new()),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    pub const fn ttl(&self) -> StdDuration {
        self.ttl
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PersonUid, PersonEntries>> {
        self.people.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns the cached total for `(person, day)` or computes and stores it.
    pub fn get_or_compute<F, E>(
        &self,
        person: &PersonUid,
        day: NaiveDate,
        compute: F,
    ) -> Result<DayTotal, E>
    where
        F: FnOnce() -> Result<DayTotal, E>,
    {
        self.get_or_compute_at(person, day, Instant::now(), compute)
    }

    /// [`get_or_compute`](Self::get_or_compute) against an explicit clock.
    pub fn get_or_compute_at<F, E>(
        &self,
        person: &PersonUid,
        day: NaiveDate,
        now: Instant,
        compute: F,
    ) -> Result<DayTotal, E>
    where
        F: FnOnce() -> Result<DayTotal, E>,
    {
        let generation = {
            let mut people = self.lock();
            let entries = people.entry(person.clone()).or_default();
            let ttl = self.ttl;
            let live = entries
                .days
                .get_mut(&day)
                .filter(|entry| now.saturating_duration_since(entry.last_access) < ttl);
            if let Some(entry) = live {
                entry.last_access = now;
                self.hits.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(%person, %day, "duration cache hit");
                return Ok(entry.value);
            }
            entries.days.remove(&day);
            entries.generation
        };

        self.misses.fetch_add(1, Ordering::Relaxed);
        let value = compute()?;

        let mut people = self.lock();
        let entries = people.entry(person.clone()).or_default();
        if entries.generation == generation {
            entries.days.insert(
                day,
                Entry {
                    value,
                    last_access: now,
                },
            );
        } else {
            tracing::debug!(%person, %day, "discarding total computed across an eviction");
        }
        Ok(value)
    }

    /// Looks up a live entry without computing. Refreshes its TTL.
    pub fn get_at(&self, person: &PersonUid, day: NaiveDate, now: Instant) -> Option<DayTotal> {
        let mut people = self.lock();
        let entries = people.get_mut(person)?;
        let entry = entries.days.get_mut(&day)?;
        if now.saturating_duration_since(entry.last_access) >= self.ttl {
            entries.days.remove(&day);
            return None;
        }
        entry.last_access = now;
        Some(entry.value)
    }

    /// Stores a value directly.
    pub fn put_at(&self, person: &PersonUid, day: NaiveDate, value: DayTotal, now: Instant) {
        self.lock().entry(person.clone()).or_default().days.insert(
            day,
            Entry {
                value,
                last_access: now,
            },
        );
    }

    /// Evicts every cached day of a person.
    pub fn evict_person(&self, person: &PersonUid) {
        let mut people = self.lock();
        let entries = people.entry(person.clone()).or_default();
        entries.generation += 1;
        let evicted = entries.days.len();
        entries.days.clear();
        tracing::debug!(%person, evicted, "evicted cached durations");
    }

    /// Drops all entries.
    pub fn clear(&self) {
        let mut people = self.lock();
        for entries in people.values_mut() {
            entries.generation += 1;
            entries.days.clear();
        }
    }

    /// Removes expired entries and returns how many were dropped.
    pub fn sweep(&self, now: Instant) -> usize {
        let mut people = self.lock();
        let mut dropped = 0;
        for entries in people.values_mut() {
            let before = entries.days.len();
            entries
                .days
                .retain(|_, entry| now.saturating_duration_since(entry.last_access) < self.ttl);
            dropped += before - entries.days.len();
        }
        dropped
    }

    /// Live entries ordered by person and day.
    pub fn snapshot(&self) -> Vec<(PersonUid, NaiveDate, DayTotal)> {
        let people = self.lock();
        let mut entries: Vec<_> = people
            .iter()
            .flat_map(|(uid, entries)| {
                entries
                    .days
                    .iter()
                    .map(move |(day, entry)| (uid.clone(), *day, entry.value))
            })
            .collect();
        entries.sort_by(|a, b| (&a.0, a.1).cmp(&(&b.0, b.1)));
        entries
    }

    pub fn stats(&self) -> CacheStats {
        let entries = self.lock().values().map(|entries| entries.days.len()).sum();
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries,
        }
    }
}
