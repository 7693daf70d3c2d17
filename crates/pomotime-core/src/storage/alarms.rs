//! Durable recurring alarms.
//!
//! An alarm is a row `(name, period_min, next_fire_at)`. Nothing about it lives
//! in process memory: whichever process polls [`AlarmTable::due_at`] next picks
//! up every alarm whose fire time has passed, together with the number of whole
//! periods that elapsed while nobody was polling.

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, OptionalExtension};

use super::database::Database;
use crate::error::Result;
use crate::host::AlarmScheduler;

/// An alarm that came due, with the number of periods it covers (at least 1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueAlarm {
    pub name: String,
    pub elapsed: u32,
}

/// SQLite implementation of [`AlarmScheduler`].
pub struct AlarmTable {
    db: Database,
}

impl AlarmTable {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Register (or re-register) `name` to fire every `period_min` minutes,
    /// first one period after `now`.
    pub fn schedule_recurring_at(
        &mut self,
        name: &str,
        period_min: u32,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let period_min = period_min.max(1);
        let next = now + Duration::minutes(i64::from(period_min));
        self.db.conn().execute(
            "INSERT OR REPLACE INTO alarms (name, period_min, next_fire_at) VALUES (?1, ?2, ?3)",
            params![name, period_min, next.to_rfc3339()],
        )?;
        Ok(())
    }

    /// Collect every alarm due at `now` and move each one's next fire time
    /// past `now`, in one transaction.
    pub fn due_at(&mut self, now: DateTime<Utc>) -> Result<Vec<DueAlarm>> {
        self.db.transaction(|conn| {
            let mut stmt = conn.prepare("SELECT name, period_min, next_fire_at FROM alarms")?;
            let rows = stmt
                .query_map([], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, u32>(1)?,
                        row.get::<_, String>(2)?,
                    ))
                })?
                .collect::<Result<Vec<_>, _>>()?;

            let mut due = Vec::new();
            for (name, period_min, next_fire_at) in rows {
                // An unreadable fire time counts as due now.
                let next = DateTime::parse_from_rfc3339(&next_fire_at)
                    .map(|dt| dt.with_timezone(&Utc))
                    .unwrap_or(now);
                if next > now {
                    continue;
                }
                let period = Duration::minutes(i64::from(period_min.max(1)));
                let overdue = (now - next).num_milliseconds();
                let missed = overdue / period.num_milliseconds();
                let elapsed = u32::try_from(missed.saturating_add(1)).unwrap_or(u32::MAX);
                let advanced = next + period * elapsed as i32;
                conn.execute(
                    "UPDATE alarms SET next_fire_at = ?1 WHERE name = ?2",
                    params![advanced.to_rfc3339(), name],
                )?;
                due.push(DueAlarm { name, elapsed });
            }
            Ok(due)
        })
    }

    /// Push `name`'s next fire time back by `periods` periods, for ticks that
    /// were delivered by hand. Returns false if `name` is not registered.
    pub fn skip(&mut self, name: &str, periods: u32) -> Result<bool> {
        self.db.transaction(|conn| {
            let row: Option<(u32, String)> = conn
                .query_row(
                    "SELECT period_min, next_fire_at FROM alarms WHERE name = ?1",
                    params![name],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            let Some((period_min, next_fire_at)) = row else {
                return Ok(false);
            };

            let next = DateTime::parse_from_rfc3339(&next_fire_at)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now());
            let shift = Duration::minutes(i64::from(period_min.max(1)) * i64::from(periods));
            conn.execute(
                "UPDATE alarms SET next_fire_at = ?1 WHERE name = ?2",
                params![(next + shift).to_rfc3339(), name],
            )?;
            Ok(true)
        })
    }

    pub fn due(&mut self) -> Result<Vec<DueAlarm>> {
        self.due_at(Utc::now())
    }

    /// Next fire time of `name`, if registered.
    pub fn next_fire_at(&self, name: &str) -> Result<Option<DateTime<Utc>>> {
        let raw: Option<String> = self
            .db
            .conn()
            .query_row(
                "SELECT next_fire_at FROM alarms WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(raw
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|dt| dt.with_timezone(&Utc)))
    }
}

impl AlarmScheduler for AlarmTable {
    fn schedule_recurring(&mut self, name: &str, interval_min: u32) -> Result<()> {
        self.schedule_recurring_at(name, interval_min, Utc::now())
    }

    fn cancel(&mut self, name: &str) -> Result<bool> {
        let removed = self
            .db
            .conn()
            .execute("DELETE FROM alarms WHERE name = ?1", params![name])?;
        Ok(removed > 0)
    }

    fn is_scheduled(&self, name: &str) -> Result<bool> {
        let found: Option<i64> = self
            .db
            .conn()
            .query_row(
                "SELECT 1 FROM alarms WHERE name = ?1",
                params![name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> AlarmTable {
        AlarmTable::new(Database::open_memory().unwrap())
    }

    #[test]
    fn not_due_before_first_period() {
        let mut alarms = table();
        let t0 = Utc::now();
        alarms.schedule_recurring_at("tick", 1, t0).unwrap();
        assert!(alarms.due_at(t0 + Duration::seconds(30)).unwrap().is_empty());
    }

    #[test]
    fn fires_once_per_period() {
        let mut alarms = table();
        let t0 = Utc::now();
        alarms.schedule_recurring_at("tick", 1, t0).unwrap();

        let due = alarms.due_at(t0 + Duration::seconds(61)).unwrap();
        assert_eq!(due, vec![DueAlarm { name: "tick".into(), elapsed: 1 }]);

        // Already advanced: polling again right away finds nothing.
        assert!(alarms.due_at(t0 + Duration::seconds(62)).unwrap().is_empty());
        assert_eq!(
            alarms.next_fire_at("tick").unwrap(),
            Some(t0 + Duration::minutes(2))
        );
    }

    #[test]
    fn missed_periods_are_caught_up_in_one_delivery() {
        let mut alarms = table();
        let t0 = Utc::now();
        alarms.schedule_recurring_at("tick", 1, t0).unwrap();

        let due = alarms.due_at(t0 + Duration::seconds(3 * 60 + 10)).unwrap();
        assert_eq!(due[0].elapsed, 3);
        assert_eq!(
            alarms.next_fire_at("tick").unwrap(),
            Some(t0 + Duration::minutes(4))
        );
    }

    #[test]
    fn skip_moves_next_fire_time() {
        let mut alarms = table();
        let t0 = Utc::now();
        alarms.schedule_recurring_at("tick", 1, t0).unwrap();

        assert!(alarms.skip("tick", 2).unwrap());
        assert_eq!(
            alarms.next_fire_at("tick").unwrap(),
            Some(t0 + Duration::minutes(3))
        );
        assert!(alarms.due_at(t0 + Duration::seconds(150)).unwrap().is_empty());
        assert_eq!(alarms.due_at(t0 + Duration::seconds(181)).unwrap()[0].elapsed, 1);

        assert!(!alarms.skip("other", 1).unwrap());
    }

    #[test]
    fn cancel_removes_registration() {
        let mut alarms = table();
        alarms.schedule_recurring("tick", 1).unwrap();
        assert!(alarms.is_scheduled("tick").unwrap());
        assert!(alarms.cancel("tick").unwrap());
        assert!(!alarms.is_scheduled("tick").unwrap());
        assert!(!alarms.cancel("tick").unwrap());
        assert!(alarms.due_at(Utc::now() + Duration::hours(1)).unwrap().is_empty());
    }
}
