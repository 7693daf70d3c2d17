//! SQLite-backed durable storage.
//!
//! Provides:
//! - A key-value namespace holding settings, timer state and the countdown
//! - Completed session history and statistics
//! - The durable alarm table (see [`super::alarms`])

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};
use serde::{Deserialize, Serialize};

use super::data_dir;
use crate::error::{DatabaseError, Result};
use crate::timer::Phase;

/// How long a writer waits for a competing process before giving up.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    pub id: i64,
    pub phase: Phase,
    pub duration_min: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Stats {
    pub work_sessions: u64,
    pub work_min: u64,
    pub breaks: u64,
    pub large_breaks: u64,
    pub break_min: u64,
}

/// SQLite database for the timer's durable state.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Get a reference to the underlying SQLite connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Open the database at `<data_dir>/pomotime.db`.
    ///
    /// Creates the database file and schema if they don't exist.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened or migrated.
    pub fn open() -> Result<Self> {
        let path = data_dir()?.join("pomotime.db");
        Self::open_at(&path)
    }

    /// Open (or create) the database at an explicit path.
    pub fn open_at(path: &Path) -> Result<Self> {
        let conn = Connection::open(path).map_err(|source| DatabaseError::OpenFailed {
            path: path.to_path_buf(),
            source,
        })?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database (for tests).
    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<(), rusqlite::Error> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS kv (
                key   TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS sessions (
                id           INTEGER PRIMARY KEY AUTOINCREMENT,
                phase        TEXT NOT NULL,
                duration_min INTEGER NOT NULL,
                started_at   TEXT NOT NULL DEFAULT '',
                completed_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS alarms (
                name         TEXT PRIMARY KEY,
                period_min   INTEGER NOT NULL,
                next_fire_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_sessions_completed_at ON sessions(completed_at);",
        )?;

        // Databases created before sessions kept their start time.
        let has_started_at: bool = self.conn.query_row(
            "SELECT COUNT(*) FROM pragma_table_info('sessions') WHERE name = 'started_at'",
            [],
            |row| row.get::<_, i64>(0).map(|n| n > 0),
        )?;
        if !has_started_at {
            self.conn.execute(
                "ALTER TABLE sessions ADD COLUMN started_at TEXT NOT NULL DEFAULT ''",
                [],
            )?;
        }
        Ok(())
    }

    /// Run `f` inside an IMMEDIATE transaction.
    ///
    /// The write lock is taken up front, so a read-check-write sequence in `f`
    /// cannot interleave with another process doing the same. If `f` fails,
    /// nothing it wrote is kept.
    pub fn transaction<T>(&mut self, f: impl FnOnce(&Connection) -> Result<T>) -> Result<T> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        let out = f(&tx)?;
        tx.commit()?;
        Ok(out)
    }

    /// Get a value from the kv store.
    pub fn kv_get(&self, key: &str) -> Result<Option<String>, rusqlite::Error> {
        kv_get(&self.conn, key)
    }

    /// Set a value in the kv store.
    pub fn kv_set(&self, key: &str, value: &str) -> Result<(), rusqlite::Error> {
        kv_set(&self.conn, key, value)
    }

    /// Most recent sessions first.
    pub fn recent_sessions(&self, limit: usize) -> Result<Vec<SessionRecord>, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT id, phase, duration_min, started_at, completed_at
             FROM sessions ORDER BY id DESC LIMIT ?1",
        )?;
        let rows = stmt.query_map(params![limit as i64], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut sessions = Vec::new();
        for row in rows {
            let (id, phase, duration_min, started_at, completed_at) = row?;
            let Some(phase) = parse_phase(&phase) else {
                continue;
            };
            let completed_at = parse_timestamp(&completed_at).unwrap_or_default();
            // Rows written before the column existed have no start time.
            let started_at = parse_timestamp(&started_at).unwrap_or(completed_at);
            sessions.push(SessionRecord {
                id,
                phase,
                duration_min,
                started_at,
                completed_at,
            });
        }
        Ok(sessions)
    }

    pub fn stats_today(&self) -> Result<Stats, rusqlite::Error> {
        let today = Utc::now().format("%Y-%m-%d").to_string();
        self.stats_since(&format!("{today}T00:00:00+00:00"))
    }

    pub fn stats_all(&self) -> Result<Stats, rusqlite::Error> {
        self.stats_since("")
    }

    fn stats_since(&self, since: &str) -> Result<Stats, rusqlite::Error> {
        let mut stmt = self.conn.prepare(
            "SELECT phase, COUNT(*), COALESCE(SUM(duration_min), 0)
             FROM sessions
             WHERE completed_at >= ?1
             GROUP BY phase",
        )?;

        let mut stats = Stats::default();
        let rows = stmt.query_map(params![since], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, u64>(1)?,
                row.get::<_, u64>(2)?,
            ))
        })?;

        for row in rows {
            let (phase, count, minutes) = row?;
            match parse_phase(&phase) {
                Some(Phase::Work) => {
                    stats.work_sessions += count;
                    stats.work_min += minutes;
                }
                Some(Phase::Break) => {
                    stats.breaks += count;
                    stats.break_min += minutes;
                }
                Some(Phase::LargeBreak) => {
                    stats.large_breaks += count;
                    stats.break_min += minutes;
                }
                None => {}
            }
        }
        Ok(stats)
    }
}

pub(crate) fn kv_get(conn: &Connection, key: &str) -> Result<Option<String>, rusqlite::Error> {
    conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| {
        row.get::<_, String>(0)
    })
    .optional()
}

pub(crate) fn kv_set(conn: &Connection, key: &str, value: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
        params![key, value],
    )?;
    Ok(())
}

pub(crate) fn insert_session(
    conn: &Connection,
    phase: Phase,
    duration_min: u32,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO sessions (phase, duration_min, started_at, completed_at)
         VALUES (?1, ?2, ?3, ?4)",
        params![
            phase_str(phase),
            duration_min,
            started_at.to_rfc3339(),
            completed_at.to_rfc3339()
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn kv_delete(conn: &Connection, key: &str) -> Result<(), rusqlite::Error> {
    conn.execute("DELETE FROM kv WHERE key = ?1", params![key])?;
    Ok(())
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

fn phase_str(phase: Phase) -> &'static str {
    match phase {
        Phase::Work => "work",
        Phase::Break => "break",
        Phase::LargeBreak => "large_break",
    }
}

fn parse_phase(s: &str) -> Option<Phase> {
    match s {
        "work" => Some(Phase::Work),
        "break" => Some(Phase::Break),
        "large_break" => Some(Phase::LargeBreak),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kv_store() {
        let db = Database::open_memory().unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
        db.kv_set("test", "hello").unwrap();
        assert_eq!(db.kv_get("test").unwrap().unwrap(), "hello");
        kv_delete(db.conn(), "test").unwrap();
        assert!(db.kv_get("test").unwrap().is_none());
    }

    #[test]
    fn record_and_query() {
        let db = Database::open_memory().unwrap();
        let now = Utc::now();
        let started = now - chrono::Duration::minutes(25);
        insert_session(db.conn(), Phase::Work, 25, started, now).unwrap();
        insert_session(db.conn(), Phase::Break, 5, started, now).unwrap();
        insert_session(db.conn(), Phase::LargeBreak, 15, started, now).unwrap();

        let stats = db.stats_all().unwrap();
        assert_eq!(stats.work_sessions, 1);
        assert_eq!(stats.work_min, 25);
        assert_eq!(stats.breaks, 1);
        assert_eq!(stats.large_breaks, 1);
        assert_eq!(stats.break_min, 20);

        let recent = db.recent_sessions(2).unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].phase, Phase::LargeBreak);
        assert_eq!(recent[0].started_at.timestamp(), started.timestamp());
        assert_eq!(recent[0].completed_at.timestamp(), now.timestamp());
    }

    #[test]
    fn adds_started_at_to_older_sessions_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pomotime.db");
        {
            let conn = Connection::open(&path).unwrap();
            conn.execute_batch(
                "CREATE TABLE sessions (
                    id           INTEGER PRIMARY KEY AUTOINCREMENT,
                    phase        TEXT NOT NULL,
                    duration_min INTEGER NOT NULL,
                    completed_at TEXT NOT NULL
                );
                INSERT INTO sessions (phase, duration_min, completed_at)
                VALUES ('work', 25, '2026-01-05T09:25:00+00:00');",
            )
            .unwrap();
        }

        let db = Database::open_at(&path).unwrap();
        let recent = db.recent_sessions(1).unwrap();
        assert_eq!(recent[0].duration_min, 25);
        assert_eq!(recent[0].started_at, recent[0].completed_at);

        // Reopening does not try to add the column again.
        drop(db);
        Database::open_at(&path).unwrap();
    }

    #[test]
    fn failed_transaction_leaves_nothing_behind() {
        let mut db = Database::open_memory().unwrap();
        let result: Result<()> = db.transaction(|conn| {
            kv_set(conn, "a", "1")?;
            Err(crate::error::CoreError::NotRunning)
        });
        assert!(result.is_err());
        assert!(db.kv_get("a").unwrap().is_none());

        db.transaction(|conn| Ok(kv_set(conn, "a", "2")?)).unwrap();
        assert_eq!(db.kv_get("a").unwrap().as_deref(), Some("2"));
    }
}
