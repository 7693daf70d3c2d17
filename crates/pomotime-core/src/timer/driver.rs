//! Countdown driver.
//!
//! The driver holds no countdown in memory. Each call reads the store, acts,
//! and commits; the recurring tick is a durable alarm registration named
//! [`TICK_ALARM`]. A process can therefore be torn down between any two calls
//! and a fresh driver picks up exactly where the last one stopped.
//!
//! ```text
//! start(phase) --arm--> tick ... tick --0--> complete --> idle
//!       \                                   /
//!        `-------------- stop ------------'
//! ```

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::phase::{Badge, Notice, Phase};
use super::state::{ActiveCountdown, TimerState};
use crate::error::Result;
use crate::events::Event;
use crate::host::{AlarmScheduler, Host};
use crate::pages::Page;
use crate::settings::EffectiveSettings;
use crate::storage::{StateStore, TickOutcome};

/// Name of the durable recurring tick registration.
pub const TICK_ALARM: &str = "pomotime-tick";
/// Minutes between ticks; each tick removes this much from the countdown.
pub const TICK_INTERVAL_MIN: u32 = 1;

pub struct TimerDriver<H, A> {
    store: StateStore,
    host: H,
    alarms: A,
}

impl<H: Host, A: AlarmScheduler> TimerDriver<H, A> {
    pub fn new(store: StateStore, host: H, alarms: A) -> Self {
        Self {
            store,
            host,
            alarms,
        }
    }

    pub fn store(&self) -> &StateStore {
        &self.store
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn alarms(&self) -> &A {
        &self.alarms
    }

    pub fn alarms_mut(&mut self) -> &mut A {
        &mut self.alarms
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Start a countdown for `phase`.
    ///
    /// # Errors
    /// [`CoreError::AlreadyRunning`](crate::CoreError::AlreadyRunning) if a
    /// countdown is active; state is untouched.
    pub fn start(&mut self, phase: Phase) -> Result<Event> {
        let settings = self.store.settings().effective()?;
        let minutes = settings.duration_for(phase);

        self.store.begin_countdown(phase, minutes, Utc::now())?;
        self.alarms.schedule_recurring(TICK_ALARM, TICK_INTERVAL_MIN)?;
        self.render(Badge::countdown(phase, minutes))?;

        info!(%phase, minutes, "timer started");
        Ok(Event::TimerStarted {
            phase,
            duration_min: minutes,
            at: Utc::now(),
        })
    }

    /// Deliver one alarm firing covering `elapsed` whole tick intervals.
    ///
    /// Returns `None` when the alarm was stale (nothing running); the alarm is
    /// cancelled in that case.
    pub fn tick(&mut self, elapsed: u32) -> Result<Option<Event>> {
        let elapsed = elapsed.max(1);
        let at = Utc::now();

        let countdown = match self.store.apply_tick(elapsed, at)? {
            TickOutcome::Stale => {
                if self.alarms.cancel(TICK_ALARM)? {
                    debug!("cancelled tick alarm with no running countdown");
                }
                return Ok(None);
            }
            TickOutcome::Completed {
                countdown,
                next,
                state,
                settings,
            } => return self.complete(countdown, next, state, &settings, at).map(Some),
            TickOutcome::Ticked(countdown) => countdown,
        };

        self.render(Badge::countdown(
            countdown.config_id,
            countdown.remaining_minutes,
        ))?;

        debug!(
            phase = %countdown.config_id,
            elapsed,
            remaining = countdown.remaining_minutes,
            "tick"
        );
        Ok(Some(Event::TimerTicked {
            phase: countdown.config_id,
            elapsed,
            remaining_min: countdown.remaining_minutes,
            at: Utc::now(),
        }))
    }

    /// Route a fired alarm. Alarms this driver does not own are ignored.
    pub fn on_alarm(&mut self, name: &str, elapsed: u32) -> Result<Option<Event>> {
        if name != TICK_ALARM {
            debug!(name, "ignoring foreign alarm");
            return Ok(None);
        }
        self.tick(elapsed)
    }

    /// Stop the active countdown without completing it.
    ///
    /// # Errors
    /// [`CoreError::NotRunning`](crate::CoreError::NotRunning) if nothing is
    /// running; state is untouched.
    pub fn stop(&mut self) -> Result<Event> {
        // Cancel first: a crash before the commit leaves a running state with
        // no alarm, which `recover` re-arms.
        self.alarms.cancel(TICK_ALARM)?;
        let (stopped, countdown) = self.store.end_countdown()?;
        let phase = countdown.map_or(stopped.current_phase, |c| c.config_id);
        let remaining_min = countdown.map_or(0, |c| c.remaining_minutes);

        self.render(Badge::cleared())?;
        self.announce(&Notice::stopped());

        info!(%phase, remaining_min, "timer stopped");
        Ok(Event::TimerStopped {
            phase,
            remaining_min,
            at: Utc::now(),
        })
    }

    /// Cancel anything running and restore the default state. Idempotent.
    pub fn reset(&mut self) -> Result<Event> {
        self.alarms.cancel(TICK_ALARM)?;
        self.store.commit(&TimerState::default(), None)?;
        self.render(Badge::cleared())?;

        info!("timer reset");
        Ok(Event::TimerReset { at: Utc::now() })
    }

    /// Install defaults and reconcile the durable alarm with the persisted
    /// countdown. Runs at process startup and on every daemon poll.
    ///
    /// Returns an event only when a running countdown had lost its alarm and
    /// was re-armed.
    pub fn recover(&mut self) -> Result<Option<Event>> {
        if self.store.initialize()? {
            info!("initialized default timer state");
        }
        if self.store.settings().install_defaults()? {
            info!("installed default settings");
        }

        match self.store.reconcile()? {
            Some(countdown) => {
                if self.alarms.is_scheduled(TICK_ALARM)? {
                    return Ok(None);
                }
                self.alarms.schedule_recurring(TICK_ALARM, TICK_INTERVAL_MIN)?;
                self.render(Badge::countdown(
                    countdown.config_id,
                    countdown.remaining_minutes,
                ))?;
                info!(
                    phase = %countdown.config_id,
                    remaining = countdown.remaining_minutes,
                    "re-armed countdown"
                );
                Ok(Some(Event::TimerRecovered {
                    phase: countdown.config_id,
                    remaining_min: countdown.remaining_minutes,
                    at: Utc::now(),
                }))
            }
            None => {
                if self.alarms.cancel(TICK_ALARM)? {
                    debug!("cancelled leftover tick alarm");
                }
                if !self.store.badge()?.is_cleared() {
                    self.render(Badge::cleared())?;
                }
                Ok(None)
            }
        }
    }

    pub fn open_settings(&mut self) -> Event {
        self.host.open_page(Page::Settings);
        Event::SettingsOpened { at: Utc::now() }
    }

    /// Full view of the persisted timer.
    pub fn snapshot(&self) -> Result<Event> {
        Ok(Event::StateSnapshot {
            state: self.store.get_state()?,
            countdown: self.store.countdown()?,
            settings: self.store.settings().effective()?,
            badge: self.store.badge()?,
            at: Utc::now(),
        })
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Surface a completion the store has already committed.
    fn complete(
        &mut self,
        countdown: ActiveCountdown,
        next: Phase,
        updated: TimerState,
        settings: &EffectiveSettings,
        at: DateTime<Utc>,
    ) -> Result<Event> {
        // After the commit. If another process has already started the next
        // countdown this drops its alarm too; `recover` re-arms it.
        self.alarms.cancel(TICK_ALARM)?;

        let completed = countdown.config_id;
        self.render(Badge::cleared())?;
        self.announce(&Notice::for_completion(completed, next));

        info!(
            %completed,
            %next,
            minutes = countdown.duration_minutes,
            cycles = updated.work_cycles_completed,
            max_cycles = settings.max_cycles,
            "countdown complete"
        );
        Ok(Event::TimerCompleted {
            phase: completed,
            next_phase: next,
            work_cycles_completed: updated.work_cycles_completed,
            session_count: updated.session_count,
            at,
        })
    }

    fn render(&mut self, badge: Badge) -> Result<()> {
        self.store.save_badge(&badge)?;
        self.host.set_badge(&badge);
        Ok(())
    }

    pub(crate) fn announce(&mut self, notice: &Notice) {
        self.host.notify(&notice.title, &notice.message);
        if let Some(page) = notice.page {
            self.host.open_page(page);
        }
    }
}
