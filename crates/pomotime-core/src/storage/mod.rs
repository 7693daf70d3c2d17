pub mod alarms;
mod config;
pub mod database;
pub mod state_store;

pub use alarms::{AlarmTable, DueAlarm};
pub use config::{Config, DaemonConfig, NotificationsConfig, PagesConfig};
pub use database::{Database, SessionRecord, Stats};
pub use state_store::{StateStore, TickOutcome};

use std::path::PathBuf;

use crate::error::ConfigError;

/// Key of the timer settings blob.
pub const SETTINGS_KEY: &str = "settings";
/// Key of the durable [`TimerState`](crate::timer::TimerState).
pub const TIMER_STATE_KEY: &str = "timerState";
/// Key holding the phase of the armed countdown.
pub const COUNTDOWN_CONFIG_KEY: &str = "currentTimerConfig";
/// Key holding the remaining minutes of the armed countdown.
pub const COUNTDOWN_DURATION_KEY: &str = "currentTimerDuration";
/// Key holding when the armed countdown started and its original length.
pub const COUNTDOWN_START_KEY: &str = "currentTimerStart";
/// Key holding the last rendered badge.
pub const BADGE_KEY: &str = "badge";

/// Returns the data directory, creating it if needed.
///
/// `POMOTIME_DATA_DIR` wins when set. Otherwise `~/.config/pomotime[-dev]/`,
/// where `POMOTIME_ENV=dev` selects the development directory.
///
/// # Errors
/// Returns an error if creating the directory fails.
pub fn data_dir() -> Result<PathBuf, ConfigError> {
    let dir = match std::env::var_os("POMOTIME_DATA_DIR") {
        Some(dir) => PathBuf::from(dir),
        None => {
            let base_dir = dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join(".config");

            let env = std::env::var("POMOTIME_ENV").unwrap_or_else(|_| "production".to_string());
            if env == "dev" {
                base_dir.join("pomotime-dev")
            } else {
                base_dir.join("pomotime")
            }
        }
    };

    std::fs::create_dir_all(&dir)
        .map_err(|e| ConfigError::DataDir(format!("{}: {e}", dir.display())))?;
    Ok(dir)
}
