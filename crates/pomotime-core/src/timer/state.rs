use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::phase::Phase;

/// Durable cycle progress. Stored under [`TIMER_STATE_KEY`](crate::storage::TIMER_STATE_KEY).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    /// The phase that is running, or will run next.
    pub current_phase: Phase,
    pub is_running: bool,
    /// Work sessions finished since the last large break.
    #[serde(default)]
    pub work_cycles_completed: u32,
    /// Work sessions ever finished.
    #[serde(default)]
    pub session_count: u64,
}

impl Default for TimerState {
    fn default() -> Self {
        Self {
            current_phase: Phase::Work,
            is_running: false,
            work_cycles_completed: 0,
            session_count: 0,
        }
    }
}

/// The countdown currently armed, persisted so any process can pick it up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveCountdown {
    pub config_id: Phase,
    pub remaining_minutes: u32,
    /// Length the countdown was started with; later settings changes do not touch it.
    pub duration_minutes: u32,
    pub started_at: DateTime<Utc>,
}

impl ActiveCountdown {
    pub fn new(config_id: Phase, minutes: u32, started_at: DateTime<Utc>) -> Self {
        Self {
            config_id,
            remaining_minutes: minutes,
            duration_minutes: minutes,
            started_at,
        }
    }

    /// Apply `elapsed` whole intervals. Returns true once the countdown hits zero.
    pub fn advance(&mut self, elapsed: u32) -> bool {
        self.remaining_minutes = self.remaining_minutes.saturating_sub(elapsed);
        self.remaining_minutes == 0
    }
}
