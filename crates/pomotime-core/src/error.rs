//! Core error types for pomotime-core.
//!
//! The timer reports two user-facing refusals (`AlreadyRunning`, `NotRunning`)
//! and otherwise only fails when the durable store is unavailable.

use std::path::PathBuf;
use thiserror::Error;

use crate::timer::Phase;

/// Core error type for pomotime-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// A countdown is already active; nothing was changed.
    #[error("A {phase} timer is already running")]
    AlreadyRunning { phase: Phase },

    /// Stop was requested with no active countdown; nothing was changed.
    #[error("No timer is running")]
    NotRunning,

    /// The durable store could not be read or written.
    #[error("Persistence unavailable: {0}")]
    Persistence(#[from] DatabaseError),

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// True for the refusals a user can trigger by issuing a command at the
    /// wrong time. These never mutate state.
    pub fn is_refusal(&self) -> bool {
        matches!(self, CoreError::AlreadyRunning { .. } | CoreError::NotRunning)
    }
}

/// Database-specific errors.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Failed to open database connection
    #[error("Failed to open database at {path}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// Query execution failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Database is locked
    #[error("Database is locked")]
    Locked,
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown configuration key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// The data directory could not be determined or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Validation errors.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Invalid value
    #[error("Invalid value for '{field}': {message}")]
    InvalidValue { field: String, message: String },

    /// Unrecognized command message
    #[error("Unrecognized command: {0}")]
    UnknownCommand(String),
}

impl From<rusqlite::Error> for DatabaseError {
    fn from(err: rusqlite::Error) -> Self {
        match &err {
            rusqlite::Error::SqliteFailure(code, _msg)
                if matches!(
                    code.code,
                    rusqlite::ErrorCode::DatabaseLocked | rusqlite::ErrorCode::DatabaseBusy
                ) =>
            {
                DatabaseError::Locked
            }
            _ => DatabaseError::QueryFailed(err.to_string()),
        }
    }
}

impl From<rusqlite::Error> for CoreError {
    fn from(err: rusqlite::Error) -> Self {
        CoreError::Persistence(err.into())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refusals_are_flagged() {
        assert!(CoreError::NotRunning.is_refusal());
        assert!(CoreError::AlreadyRunning { phase: Phase::Work }.is_refusal());
        assert!(!CoreError::Persistence(DatabaseError::Locked).is_refusal());
    }

    #[test]
    fn already_running_names_the_phase() {
        let err = CoreError::AlreadyRunning {
            phase: Phase::LargeBreak,
        };
        assert_eq!(err.to_string(), "A large break timer is already running");
    }

    #[test]
    fn busy_sqlite_maps_to_locked() {
        let err = rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            None,
        );
        assert!(matches!(DatabaseError::from(err), DatabaseError::Locked));
    }
}
