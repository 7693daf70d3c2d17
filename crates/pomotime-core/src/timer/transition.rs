//! Phase transition rules for a Pomodoro cycle.
//!
//! ```text
//! Work -> Break -> Work -> ... -> Work (maxCycles-th) -> LargeBreak -> Work
//! ```
//!
//! The work-cycle counter is reset when the large break *completes*, not when
//! it starts, so "N of M" stays visible for the whole large break.

use super::phase::Phase;
use super::state::TimerState;
use crate::settings::EffectiveSettings;

/// Compute the phase that follows `completed` and the updated state.
///
/// Pure: persistence and notification are the caller's job.
pub fn compute_next_phase(
    completed: Phase,
    state: &TimerState,
    settings: &EffectiveSettings,
) -> (Phase, TimerState) {
    let mut updated = *state;
    let next = match completed {
        Phase::Work => {
            updated.work_cycles_completed = updated.work_cycles_completed.saturating_add(1);
            updated.session_count = updated.session_count.saturating_add(1);
            if updated.work_cycles_completed >= settings.max_cycles {
                Phase::LargeBreak
            } else {
                Phase::Break
            }
        }
        Phase::Break => Phase::Work,
        Phase::LargeBreak => {
            updated.work_cycles_completed = 0;
            Phase::Work
        }
    };
    updated.current_phase = next;
    updated.is_running = false;
    (next, updated)
}
