mod dispatcher;
mod driver;
mod phase;
mod state;
mod transition;

pub use dispatcher::{Command, Dispatcher};
pub use driver::{TimerDriver, TICK_ALARM, TICK_INTERVAL_MIN};
pub use phase::{Badge, Notice, Phase, PhaseProfile};
pub use state::{ActiveCountdown, TimerState};
pub use transition::compute_next_phase;
