//! # Pomotime Core Library
//!
//! The Pomodoro cycle state machine and its persistence/recovery protocol.
//! Hosts (the `pomotime` CLI and its tick daemon) are thin layers over this
//! crate.
//!
//! ## Architecture
//!
//! - **Settings**: effective durations and cycle count, defaults filled in
//! - **Storage**: SQLite key-value state, session history and durable alarms,
//!   plus TOML host configuration
//! - **Timer**: pure phase transitions, a countdown driver that keeps nothing
//!   in memory between calls, and a command dispatcher
//! - **Host**: the badge/notification/page surfaces the timer drives
//!
//! ## Key Components
//!
//! - [`Dispatcher`]: entry point for commands
//! - [`TimerDriver`]: start/tick/stop/reset/recover
//! - [`compute_next_phase`]: Work → Break/LargeBreak → Work
//! - [`StateStore`]: durable [`TimerState`] and [`ActiveCountdown`]
//! - [`AlarmTable`]: durable recurring tick registrations

pub mod error;
pub mod events;
pub mod host;
pub mod pages;
pub mod settings;
pub mod storage;
pub mod testing;
pub mod timer;

pub use error::{ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::Event;
pub use host::{AlarmScheduler, Host};
pub use pages::Page;
pub use settings::{EffectiveSettings, SettingsProvider};
pub use storage::{AlarmTable, Config, Database, DueAlarm, StateStore};
pub use timer::{
    compute_next_phase, ActiveCountdown, Badge, Command, Dispatcher, Notice, Phase, TimerDriver,
    TimerState,
};
