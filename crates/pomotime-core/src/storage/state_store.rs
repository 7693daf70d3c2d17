//! Durable timer state.
//!
//! Every read goes to SQLite; nothing is cached between calls. Writes that
//! touch both the [`TimerState`] and the [`ActiveCountdown`] happen in a single
//! transaction, so the two can never be observed out of step.
//!
//! Operations that decide on the current state (start, tick, stop) re-read it
//! inside an IMMEDIATE transaction. A CLI process and the tick daemon can then
//! race freely: whichever commits second sees the first one's result.

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use super::database::{insert_session, kv_delete, kv_get, kv_set, Database};
use super::{
    BADGE_KEY, COUNTDOWN_CONFIG_KEY, COUNTDOWN_DURATION_KEY, COUNTDOWN_START_KEY, SETTINGS_KEY,
    TIMER_STATE_KEY,
};
use crate::error::{CoreError, Result};
use crate::settings::{EffectiveSettings, SettingsProvider};
use crate::timer::{compute_next_phase, ActiveCountdown, Badge, Phase, TimerState};

/// What one tick did to the persisted timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Nothing is running; the alarm that fired is left over.
    Stale,
    /// The countdown moved but has time left.
    Ticked(ActiveCountdown),
    /// The countdown reached zero. The next state is committed and the
    /// session recorded.
    Completed {
        countdown: ActiveCountdown,
        next: Phase,
        state: TimerState,
        settings: EffectiveSettings,
    },
}

/// Start time and length of the armed countdown, stored beside the two
/// countdown keys.
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CountdownStart {
    duration_minutes: u32,
    started_at: DateTime<Utc>,
}

pub struct StateStore {
    db: Database,
}

impl StateStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn settings(&self) -> SettingsProvider<'_> {
        SettingsProvider::new(&self.db)
    }

    /// Persisted state, or the default if none was written yet.
    pub fn get_state(&self) -> Result<TimerState> {
        read_state(self.db.conn())
    }

    /// Overwrite the state record.
    pub fn save_state(&self, state: &TimerState) -> Result<()> {
        kv_set(self.db.conn(), TIMER_STATE_KEY, &serde_json::to_string(state)?)?;
        Ok(())
    }

    /// Write the default state unless a record already exists.
    /// Returns whether it wrote.
    pub fn initialize(&mut self) -> Result<bool> {
        self.db.transaction(|conn| {
            if kv_get(conn, TIMER_STATE_KEY)?.is_some() {
                return Ok(false);
            }
            kv_set(conn, TIMER_STATE_KEY, &serde_json::to_string(&TimerState::default())?)?;
            Ok(true)
        })
    }

    /// The armed countdown, if both of its keys are present and readable.
    pub fn countdown(&self) -> Result<Option<ActiveCountdown>> {
        read_countdown(self.db.conn())
    }

    /// Write state and countdown together. `None` clears the countdown.
    pub fn commit(
        &mut self,
        state: &TimerState,
        countdown: Option<&ActiveCountdown>,
    ) -> Result<()> {
        self.db.transaction(|conn| write_all(conn, state, countdown))
    }

    /// Atomically claim the timer for a new countdown of `phase`.
    ///
    /// Fails with [`CoreError::AlreadyRunning`] and writes nothing if a
    /// countdown is active. Otherwise marks the state running with
    /// `current_phase = phase` and stores the countdown, returning the new state.
    pub fn begin_countdown(
        &mut self,
        phase: Phase,
        minutes: u32,
        at: DateTime<Utc>,
    ) -> Result<TimerState> {
        self.db.transaction(|conn| {
            let mut state = read_state(conn)?;
            if state.is_running {
                return Err(CoreError::AlreadyRunning {
                    phase: state.current_phase,
                });
            }
            state.is_running = true;
            state.current_phase = phase;
            write_all(conn, &state, Some(&ActiveCountdown::new(phase, minutes, at)))?;
            Ok(state)
        })
    }

    /// Apply `elapsed` whole tick intervals to whatever is running now.
    ///
    /// When the countdown reaches zero the next phase is computed, the state
    /// committed with the countdown cleared, and the session appended to the
    /// history, in the same transaction as the read.
    pub fn apply_tick(&mut self, elapsed: u32, at: DateTime<Utc>) -> Result<TickOutcome> {
        self.db.transaction(|conn| {
            let state = read_state(conn)?;
            let mut countdown = match read_countdown(conn)? {
                Some(countdown) if state.is_running => countdown,
                _ => return Ok(TickOutcome::Stale),
            };

            if !countdown.advance(elapsed) {
                write_all(conn, &state, Some(&countdown))?;
                return Ok(TickOutcome::Ticked(countdown));
            }

            let settings = read_settings(conn)?;
            let (next, updated) = compute_next_phase(countdown.config_id, &state, &settings);
            write_all(conn, &updated, None)?;
            insert_session(
                conn,
                countdown.config_id,
                countdown.duration_minutes,
                countdown.started_at,
                at,
            )?;
            Ok(TickOutcome::Completed {
                countdown,
                next,
                state: updated,
                settings,
            })
        })
    }

    /// Atomically stop the running countdown, keeping the cycle counters.
    ///
    /// Fails with [`CoreError::NotRunning`] and writes nothing if the timer is
    /// idle. Returns the stopped state and the countdown that was cleared.
    pub fn end_countdown(&mut self) -> Result<(TimerState, Option<ActiveCountdown>)> {
        self.db.transaction(|conn| {
            let state = read_state(conn)?;
            if !state.is_running {
                return Err(CoreError::NotRunning);
            }
            let countdown = read_countdown(conn)?;
            let stopped = TimerState {
                is_running: false,
                ..state
            };
            write_all(conn, &stopped, None)?;
            Ok((stopped, countdown))
        })
    }

    /// Make state and countdown agree, in one transaction.
    ///
    /// A running state without a countdown is marked idle; a countdown left
    /// behind by an idle state is cleared. Returns the countdown that is
    /// running afterwards, if any.
    pub fn reconcile(&mut self) -> Result<Option<ActiveCountdown>> {
        self.db.transaction(|conn| {
            let state = read_state(conn)?;
            let countdown = read_countdown(conn)?;
            match (state.is_running, countdown) {
                (true, Some(countdown)) => Ok(Some(countdown)),
                (true, None) => {
                    warn!("timer marked running without a countdown, marking idle");
                    let idle = TimerState {
                        is_running: false,
                        ..state
                    };
                    write_all(conn, &idle, None)?;
                    Ok(None)
                }
                (false, leftover) => {
                    if leftover.is_some() {
                        debug!("clearing countdown left behind by an idle timer");
                        write_all(conn, &state, None)?;
                    }
                    Ok(None)
                }
            }
        })
    }

    /// Remember the last badge so other processes can show it.
    pub fn save_badge(&self, badge: &Badge) -> Result<()> {
        kv_set(self.db.conn(), BADGE_KEY, &serde_json::to_string(badge)?)?;
        Ok(())
    }

    pub fn badge(&self) -> Result<Badge> {
        Ok(read_json(self.db.conn(), BADGE_KEY)?.unwrap_or_else(Badge::cleared))
    }
}

fn read_state(conn: &Connection) -> Result<TimerState> {
    Ok(read_json(conn, TIMER_STATE_KEY)?.unwrap_or_default())
}

fn read_countdown(conn: &Connection) -> Result<Option<ActiveCountdown>> {
    let config: Option<Phase> = read_json(conn, COUNTDOWN_CONFIG_KEY)?;
    let remaining: Option<u32> = read_json(conn, COUNTDOWN_DURATION_KEY)?;
    let (Some(config_id), Some(remaining_minutes)) = (config, remaining) else {
        return Ok(None);
    };

    let start = match read_json::<CountdownStart>(conn, COUNTDOWN_START_KEY)? {
        Some(start) => start,
        None => {
            debug!("countdown has no start record, counting from now");
            CountdownStart {
                duration_minutes: remaining_minutes,
                started_at: Utc::now(),
            }
        }
    };
    Ok(Some(ActiveCountdown {
        config_id,
        remaining_minutes,
        duration_minutes: start.duration_minutes,
        started_at: start.started_at,
    }))
}

fn read_settings(conn: &Connection) -> Result<EffectiveSettings> {
    let blob: Value = read_json(conn, SETTINGS_KEY)?.unwrap_or(Value::Null);
    Ok(EffectiveSettings::from_blob(&blob))
}

fn write_all(
    conn: &Connection,
    state: &TimerState,
    countdown: Option<&ActiveCountdown>,
) -> Result<()> {
    write_json(conn, TIMER_STATE_KEY, state)?;
    match countdown {
        Some(countdown) => {
            write_json(conn, COUNTDOWN_CONFIG_KEY, &countdown.config_id)?;
            write_json(conn, COUNTDOWN_DURATION_KEY, &countdown.remaining_minutes)?;
            write_json(
                conn,
                COUNTDOWN_START_KEY,
                &CountdownStart {
                    duration_minutes: countdown.duration_minutes,
                    started_at: countdown.started_at,
                },
            )?;
        }
        None => {
            kv_delete(conn, COUNTDOWN_CONFIG_KEY)?;
            kv_delete(conn, COUNTDOWN_DURATION_KEY)?;
            kv_delete(conn, COUNTDOWN_START_KEY)?;
        }
    }
    Ok(())
}

/// A record that does not deserialize is treated as missing.
fn read_json<T: serde::de::DeserializeOwned>(conn: &Connection, key: &str) -> Result<Option<T>> {
    let Some(raw) = kv_get(conn, key)? else {
        return Ok(None);
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!(key, error = %e, "ignoring unreadable record");
            Ok(None)
        }
    }
}

fn write_json<T: Serialize + ?Sized>(conn: &Connection, key: &str, value: &T) -> Result<()> {
    kv_set(conn, key, &serde_json::to_string(value)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> StateStore {
        StateStore::new(Database::open_memory().unwrap())
    }

    fn at() -> DateTime<Utc> {
        "2026-03-02T09:00:00Z".parse().unwrap()
    }

    #[test]
    fn default_state_when_empty() {
        let store = store();
        assert_eq!(store.get_state().unwrap(), TimerState::default());
        assert!(store.countdown().unwrap().is_none());
    }

    #[test]
    fn initialize_does_not_clobber() {
        let mut store = store();
        assert!(store.initialize().unwrap());
        let progressed = TimerState {
            current_phase: Phase::Break,
            work_cycles_completed: 2,
            session_count: 2,
            ..TimerState::default()
        };
        store.save_state(&progressed).unwrap();
        assert!(!store.initialize().unwrap());
        assert_eq!(store.get_state().unwrap(), progressed);
    }

    #[test]
    fn begin_countdown_claims_once() {
        let mut store = store();
        let state = store.begin_countdown(Phase::Break, 5, at()).unwrap();
        assert!(state.is_running);
        assert_eq!(state.current_phase, Phase::Break);
        assert_eq!(
            store.countdown().unwrap(),
            Some(ActiveCountdown::new(Phase::Break, 5, at()))
        );

        let err = store.begin_countdown(Phase::Work, 25, Utc::now()).unwrap_err();
        assert!(matches!(err, CoreError::AlreadyRunning { phase: Phase::Break }));
        assert_eq!(
            store.countdown().unwrap(),
            Some(ActiveCountdown::new(Phase::Break, 5, at()))
        );
    }

    #[test]
    fn commit_without_countdown_clears_countdown_keys() {
        let mut store = store();
        store.begin_countdown(Phase::Work, 25, at()).unwrap();
        store.commit(&TimerState::default(), None).unwrap();
        assert!(store.countdown().unwrap().is_none());
        assert!(store.db().kv_get(COUNTDOWN_CONFIG_KEY).unwrap().is_none());
        assert!(store.db().kv_get(COUNTDOWN_DURATION_KEY).unwrap().is_none());
        assert!(store.db().kv_get(COUNTDOWN_START_KEY).unwrap().is_none());
    }

    #[test]
    fn countdown_keys_layout() {
        let mut store = store();
        store.begin_countdown(Phase::LargeBreak, 15, at()).unwrap();
        assert_eq!(
            store.db().kv_get(COUNTDOWN_CONFIG_KEY).unwrap().as_deref(),
            Some("\"largeBreak\"")
        );
        assert_eq!(
            store.db().kv_get(COUNTDOWN_DURATION_KEY).unwrap().as_deref(),
            Some("15")
        );
        let start: Value =
            serde_json::from_str(&store.db().kv_get(COUNTDOWN_START_KEY).unwrap().unwrap())
                .unwrap();
        assert_eq!(start["durationMinutes"], 15);
        assert_eq!(start["startedAt"], "2026-03-02T09:00:00Z");
    }

    #[test]
    fn countdown_without_start_record_counts_from_remaining() {
        let store = store();
        store.db().kv_set(COUNTDOWN_CONFIG_KEY, "\"work\"").unwrap();
        store.db().kv_set(COUNTDOWN_DURATION_KEY, "12").unwrap();
        let countdown = store.countdown().unwrap().unwrap();
        assert_eq!(countdown.remaining_minutes, 12);
        assert_eq!(countdown.duration_minutes, 12);
    }

    #[test]
    fn apply_tick_decrements_then_completes() {
        let mut store = store();
        store.begin_countdown(Phase::Work, 2, at()).unwrap();

        let outcome = store.apply_tick(1, Utc::now()).unwrap();
        assert!(matches!(
            outcome,
            TickOutcome::Ticked(ActiveCountdown { remaining_minutes: 1, .. })
        ));
        assert_eq!(store.countdown().unwrap().unwrap().remaining_minutes, 1);

        let done = at() + chrono::Duration::minutes(2);
        let TickOutcome::Completed { countdown, next, state, .. } =
            store.apply_tick(1, done).unwrap()
        else {
            panic!("expected completion");
        };
        assert_eq!(countdown.config_id, Phase::Work);
        assert_eq!(next, Phase::Break);
        assert_eq!(state, store.get_state().unwrap());
        assert!(!state.is_running);
        assert!(store.countdown().unwrap().is_none());

        let sessions = store.db().recent_sessions(5).unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(sessions[0].duration_min, 2);
        assert_eq!(sessions[0].started_at, at());
        assert_eq!(sessions[0].completed_at, done);
    }

    #[test]
    fn apply_tick_when_idle_writes_nothing() {
        let mut store = store();
        store.db().kv_set(COUNTDOWN_CONFIG_KEY, "\"break\"").unwrap();
        store.db().kv_set(COUNTDOWN_DURATION_KEY, "3").unwrap();

        assert_eq!(store.apply_tick(1, Utc::now()).unwrap(), TickOutcome::Stale);
        assert_eq!(store.db().kv_get(COUNTDOWN_DURATION_KEY).unwrap().as_deref(), Some("3"));
        assert!(store.db().kv_get(TIMER_STATE_KEY).unwrap().is_none());
    }

    #[test]
    fn end_countdown_keeps_counters() {
        let mut store = store();
        store
            .save_state(&TimerState {
                work_cycles_completed: 3,
                session_count: 7,
                ..TimerState::default()
            })
            .unwrap();
        store.begin_countdown(Phase::Work, 25, at()).unwrap();

        let (stopped, countdown) = store.end_countdown().unwrap();
        assert!(!stopped.is_running);
        assert_eq!(stopped.work_cycles_completed, 3);
        assert_eq!(stopped.session_count, 7);
        assert_eq!(countdown, Some(ActiveCountdown::new(Phase::Work, 25, at())));
        assert_eq!(store.get_state().unwrap(), stopped);
        assert!(store.countdown().unwrap().is_none());

        assert!(matches!(store.end_countdown(), Err(CoreError::NotRunning)));
    }

    #[test]
    fn unreadable_state_reads_as_default() {
        let store = store();
        store.db().kv_set(TIMER_STATE_KEY, "{\"currentPhase\":\"nap\"}").unwrap();
        assert_eq!(store.get_state().unwrap(), TimerState::default());
    }

    #[test]
    fn badge_round_trips_through_store() {
        let store = store();
        assert!(store.badge().unwrap().is_cleared());
        let badge = Badge::countdown(Phase::Work, 7);
        store.save_badge(&badge).unwrap();
        assert_eq!(store.badge().unwrap(), badge);
    }
}
