//! Storage layer for the check-in tracker.
//!
//! Implements [`EventStore`] and [`PersonDirectory`] on top of `rusqlite`.
//!
//! # Thread Safety
//!
//! A `rusqlite::Connection` is `Send` but not `Sync`. [`Database`] keeps it
//! behind a `Mutex` so a single instance can be shared by the engine's
//! worker threads; statements are serialized on that lock.
//!
//! # Schema
//!
//! ## Timestamp Format
//!
//! Check times are local wall-clock values stored as TEXT with a fixed
//! width, e.g. `2024-06-03T09:00:00.000000000`. Because every value has the
//! same shape:
//! - Lexicographic ordering matches chronological ordering
//! - Range queries can compare strings directly
//! - Values round-trip without losing precision
//!
//! Ties on `time` are broken by the autoincrement `id`, so "latest" always
//! means the most recently inserted of equal timestamps.

use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use checkin_core::{CheckEvent, EventStore, Person, PersonDirectory, PersonUid, StoreError};
use chrono::NaiveDateTime;
use rusqlite::{Connection, OptionalExtension, Row, params};
use thiserror::Error;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.9f";

/// Database errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// Failed to parse a stored check time.
    #[error("invalid timestamp for check {check_id}: {timestamp}")]
    TimestampParse {
        check_id: i64,
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
    /// A stored row holds a value the domain rejects.
    #[error("invalid record {record}: {message}")]
    InvalidRecord { record: String, message: String },
}

impl From<DbError> for StoreError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::Sqlite(source) => Self::backend(source),
            DbError::TimestampParse {
                check_id,
                timestamp,
                source,
            } => Self::Corrupt {
                record: format!("check {check_id}"),
                message: format!("{source}: {timestamp}"),
            },
            DbError::InvalidRecord { record, message } => Self::Corrupt { record, message },
        }
    }
}

/// Database connection wrapper.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct Database {
    conn: Mutex<Connection>,
}

/// A check row as stored, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
struct CheckRecord {
    id: i64,
    person_uid: String,
    time: String,
    checked_in: bool,
    auto: bool,
}

impl CheckRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            person_uid: row.get(1)?,
            time: row.get(2)?,
            checked_in: row.get(3)?,
            auto: row.get(4)?,
        })
    }

    fn into_event(self) -> Result<CheckEvent, DbError> {
        Ok(CheckEvent {
            id: self.id,
            person: parse_uid(self.person_uid)?,
            time: parse_timestamp(&self.time, self.id)?,
            checked_in: self.checked_in,
            auto: self.auto,
        })
    }
}

/// A person row as stored, before validation.
#[derive(Debug, Clone, PartialEq, Eq)]
struct PersonRecord {
    uid: String,
    name: String,
    email: Option<String>,
    slack_handle: Option<String>,
    enabled: bool,
}

impl PersonRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            uid: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            slack_handle: row.get(3)?,
            enabled: row.get(4)?,
        })
    }

    fn into_person(self) -> Result<Person, DbError> {
        Ok(Person {
            uid: parse_uid(self.uid)?,
            name: self.name,
            email: self.email,
            slack_handle: self.slack_handle,
            enabled: self.enabled,
        })
    }
}

const CHECK_COLUMNS: &str = "id, person_uid, time, checked_in, auto";
const PERSON_COLUMNS: &str = "uid, name, email, slack_handle, enabled";

impl Database {
    /// Opens a database at the given path, creating it if necessary.
    ///
    /// The database schema is automatically initialized on first open.
    pub fn open(path: &Path) -> Result<Self, DbError> {
        let conn = Connection::open(path)?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init()?;
        Ok(db)
    }

    /// Opens an in-memory database.
    ///
    /// Useful for testing. The database is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, DbError> {
        let conn = Connection::open_in_memory()?;
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.init()?;
        Ok(db)
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Initializes the database schema.
    ///
    /// This is idempotent - safe to call on an already-initialized database.
    fn init(&self) -> Result<(), DbError> {
        let conn = self.conn();
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS persons (
                uid TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT,
                slack_handle TEXT,
                enabled INTEGER NOT NULL DEFAULT 1
            );

            -- Checks table: one row per in/out toggle
            -- time: local wall-clock, fixed-width ISO 8601 without offset
            -- checked_in: 1 opens a session, 0 closes one
            -- auto: 1 if written by the auto-checkout trigger
            CREATE TABLE IF NOT EXISTS checks (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                person_uid TEXT NOT NULL,
                time TEXT NOT NULL,
                checked_in INTEGER NOT NULL,
                auto INTEGER NOT NULL DEFAULT 0,
                FOREIGN KEY (person_uid) REFERENCES persons(uid)
            );

            CREATE INDEX IF NOT EXISTS idx_checks_person_time ON checks(person_uid, time);
            CREATE INDEX IF NOT EXISTS idx_checks_time ON checks(time);
            ",
        )?;
        Ok(())
    }

    fn query_checks<P>(&self, sql: &str, params: P) -> Result<Vec<CheckEvent>, DbError>
    where
        P: rusqlite::Params,
    {
        let conn = self.conn();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, CheckRecord::from_row)?;
        let mut checks = Vec::new();
        for row in rows {
            checks.push(row?.into_event()?);
        }
        Ok(checks)
    }

    fn query_check<P>(&self, sql: &str, params: P) -> Result<Option<CheckEvent>, DbError>
    where
        P: rusqlite::Params,
    {
        let record = self
            .conn()
            .query_row(sql, params, CheckRecord::from_row)
            .optional()?;
        record.map(CheckRecord::into_event).transpose()
    }

    fn query_people(&self, sql: &str) -> Result<Vec<Person>, DbError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map([], PersonRecord::from_row)?;
        let mut people = Vec::new();
        for row in rows {
            people.push(row?.into_person()?);
        }
        Ok(people)
    }

    /// Total number of stored checks.
    pub fn count_checks(&self) -> Result<i64, DbError> {
        let count = self
            .conn()
            .query_row("SELECT COUNT(*) FROM checks", [], |row| row.get(0))?;
        Ok(count)
    }
}

impl EventStore for Database {
    fn append(
        &self,
        person: &PersonUid,
        time: NaiveDateTime,
        checked_in: bool,
        auto: bool,
    ) -> Result<CheckEvent, StoreError> {
        let conn = self.conn();
        conn.execute(
            "INSERT INTO checks (person_uid, time, checked_in, auto) VALUES (?, ?, ?, ?)",
            params![person.as_str(), format_timestamp(time), checked_in, auto],
        )
        .map_err(DbError::from)?;
        let id = conn.last_insert_rowid();
        tracing::debug!(id, person = %person, checked_in, auto, "stored check");
        Ok(CheckEvent {
            id,
            person: person.clone(),
            time,
            checked_in,
            auto,
        })
    }

    fn latest(&self, person: &PersonUid) -> Result<Option<CheckEvent>, StoreError> {
        let sql = format!(
            "SELECT {CHECK_COLUMNS} FROM checks
             WHERE person_uid = ?
             ORDER BY time DESC, id DESC
             LIMIT 1"
        );
        Ok(self.query_check(&sql, [person.as_str()])?)
    }

    fn latest_before(
        &self,
        person: &PersonUid,
        before: NaiveDateTime,
    ) -> Result<Option<CheckEvent>, StoreError> {
        let sql = format!(
            "SELECT {CHECK_COLUMNS} FROM checks
             WHERE person_uid = ? AND time < ?
             ORDER BY time DESC, id DESC
             LIMIT 1"
        );
        Ok(self.query_check(&sql, params![person.as_str(), format_timestamp(before)])?)
    }

    fn between(
        &self,
        person: &PersonUid,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<CheckEvent>, StoreError> {
        if end <= start {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {CHECK_COLUMNS} FROM checks
             WHERE person_uid = ? AND time >= ? AND time < ?
             ORDER BY time ASC, id ASC"
        );
        Ok(self.query_checks(
            &sql,
            params![
                person.as_str(),
                format_timestamp(start),
                format_timestamp(end)
            ],
        )?)
    }

    fn latest_real_checkouts(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<CheckEvent>, StoreError> {
        if end <= start {
            return Ok(Vec::new());
        }
        let sql = "
            SELECT c.id, c.person_uid, c.time, c.checked_in, c.auto
            FROM checks c
            JOIN persons p ON p.uid = c.person_uid
            WHERE p.enabled = 1
              AND c.id = (
                  SELECT last.id FROM checks last
                  WHERE last.person_uid = c.person_uid
                    AND last.checked_in = 0
                    AND last.auto = 0
                    AND last.time >= ?1 AND last.time < ?2
                  ORDER BY last.time DESC, last.id DESC
                  LIMIT 1
              )
            ORDER BY p.uid ASC
        ";
        Ok(self.query_checks(sql, params![format_timestamp(start), format_timestamp(end)])?)
    }

    fn delete_events(&self, person: &PersonUid) -> Result<usize, StoreError> {
        let removed = self
            .conn()
            .execute("DELETE FROM checks WHERE person_uid = ?", [person.as_str()])
            .map_err(DbError::from)?;
        Ok(removed)
    }
}

impl PersonDirectory for Database {
    fn find(&self, uid: &PersonUid) -> Result<Option<Person>, StoreError> {
        let sql = format!("SELECT {PERSON_COLUMNS} FROM persons WHERE uid = ?");
        let record = self
            .conn()
            .query_row(&sql, [uid.as_str()], PersonRecord::from_row)
            .optional()
            .map_err(DbError::from)?;
        Ok(record.map(PersonRecord::into_person).transpose()?)
    }

    fn create_placeholder(&self, uid: &PersonUid, name: &str) -> Result<Person, StoreError> {
        self.conn()
            .execute(
                "INSERT INTO persons (uid, name, enabled) VALUES (?, ?, 0)",
                params![uid.as_str(), name],
            )
            .map_err(DbError::from)?;
        let mut person = Person::new(uid.clone(), name);
        person.enabled = false;
        Ok(person)
    }

    fn save(&self, person: &Person) -> Result<(), StoreError> {
        self.conn()
            .execute(
                "
                INSERT INTO persons (uid, name, email, slack_handle, enabled)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT(uid) DO UPDATE SET
                    name = excluded.name,
                    email = excluded.email,
                    slack_handle = excluded.slack_handle,
                    enabled = excluded.enabled
                ",
                params![
                    person.uid.as_str(),
                    person.name,
                    person.email,
                    person.slack_handle,
                    person.enabled,
                ],
            )
            .map_err(DbError::from)?;
        Ok(())
    }

    fn remove(&self, uid: &PersonUid) -> Result<bool, StoreError> {
        let removed = self
            .conn()
            .execute("DELETE FROM persons WHERE uid = ?", [uid.as_str()])
            .map_err(DbError::from)?;
        Ok(removed > 0)
    }

    fn list_enabled(&self) -> Result<Vec<Person>, StoreError> {
        let sql = format!("SELECT {PERSON_COLUMNS} FROM persons WHERE enabled = 1 ORDER BY uid ASC");
        Ok(self.query_people(&sql)?)
    }

    fn list_all(&self) -> Result<Vec<Person>, StoreError> {
        let sql = format!("SELECT {PERSON_COLUMNS} FROM persons ORDER BY uid ASC");
        Ok(self.query_people(&sql)?)
    }
}

fn parse_uid(uid: String) -> Result<PersonUid, DbError> {
    PersonUid::new(uid).map_err(|err| DbError::InvalidRecord {
        record: "person".to_string(),
        message: err.to_string(),
    })
}

fn parse_timestamp(timestamp: &str, check_id: i64) -> Result<NaiveDateTime, DbError> {
    NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT).map_err(|source| {
        DbError::TimestampParse {
            check_id,
            timestamp: timestamp.to_string(),
            source,
        }
    })
}

fn format_timestamp(timestamp: NaiveDateTime) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}
