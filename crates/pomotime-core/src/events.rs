use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::settings::EffectiveSettings;
use crate::timer::{ActiveCountdown, Badge, Phase, TimerState};

/// Every state change in the timer produces an Event.
/// Hosts print or forward them; nothing reads them back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    TimerStarted {
        phase: Phase,
        duration_min: u32,
        at: DateTime<Utc>,
    },
    TimerTicked {
        phase: Phase,
        elapsed: u32,
        remaining_min: u32,
        at: DateTime<Utc>,
    },
    TimerCompleted {
        phase: Phase,
        next_phase: Phase,
        work_cycles_completed: u32,
        session_count: u64,
        at: DateTime<Utc>,
    },
    TimerStopped {
        phase: Phase,
        remaining_min: u32,
        at: DateTime<Utc>,
    },
    TimerReset {
        at: DateTime<Utc>,
    },
    /// Startup reconciliation re-armed or repaired a countdown.
    TimerRecovered {
        phase: Phase,
        remaining_min: u32,
        at: DateTime<Utc>,
    },
    SettingsOpened {
        at: DateTime<Utc>,
    },
    StateSnapshot {
        state: TimerState,
        countdown: Option<ActiveCountdown>,
        settings: EffectiveSettings,
        badge: Badge,
        at: DateTime<Utc>,
    },
}
