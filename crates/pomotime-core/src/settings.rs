//! Effective timer settings.
//!
//! The settings blob lives under the `settings` key as
//! `{"timerSettings": {"workTime": .., "breakTime": .., "largeBreakTime": .., "maxCycles": ..}}`.
//! Any field that is missing or not a positive integer falls back to its
//! default, so reading settings never fails on bad data.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::warn;

use crate::error::{Result, ValidationError};
use crate::storage::{Database, SETTINGS_KEY};
use crate::timer::Phase;

const TIMER_SETTINGS: &str = "timerSettings";

pub const DEFAULT_WORK_TIME: u32 = 25;
pub const DEFAULT_BREAK_TIME: u32 = 5;
pub const DEFAULT_LARGE_BREAK_TIME: u32 = 15;
pub const DEFAULT_MAX_CYCLES: u32 = 4;

/// Field names accepted by [`SettingsProvider::update`].
pub const FIELDS: [&str; 4] = ["workTime", "breakTime", "largeBreakTime", "maxCycles"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EffectiveSettings {
    /// Minutes.
    pub work_time: u32,
    /// Minutes.
    pub break_time: u32,
    /// Minutes.
    pub large_break_time: u32,
    /// Work sessions per cycle before a large break.
    pub max_cycles: u32,
}

impl Default for EffectiveSettings {
    fn default() -> Self {
        Self {
            work_time: DEFAULT_WORK_TIME,
            break_time: DEFAULT_BREAK_TIME,
            large_break_time: DEFAULT_LARGE_BREAK_TIME,
            max_cycles: DEFAULT_MAX_CYCLES,
        }
    }
}

impl EffectiveSettings {
    /// Countdown length of `phase` in minutes.
    pub fn duration_for(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Work => self.work_time,
            Phase::Break => self.break_time,
            Phase::LargeBreak => self.large_break_time,
        }
    }

    /// Resolve a raw settings blob, field by field.
    pub fn from_blob(blob: &Value) -> Self {
        let defaults = Self::default();
        let timer = blob.get(TIMER_SETTINGS);
        let field = |name: &str, fallback: u32| {
            timer
                .and_then(|t| t.get(name))
                .and_then(positive_int)
                .unwrap_or(fallback)
        };
        Self {
            work_time: field("workTime", defaults.work_time),
            break_time: field("breakTime", defaults.break_time),
            large_break_time: field("largeBreakTime", defaults.large_break_time),
            max_cycles: field("maxCycles", defaults.max_cycles),
        }
    }

    fn to_json(self) -> Value {
        json!({
            "workTime": self.work_time,
            "breakTime": self.break_time,
            "largeBreakTime": self.large_break_time,
            "maxCycles": self.max_cycles,
        })
    }
}

/// Accepts a JSON integer or a string of digits, greater than zero.
fn positive_int(value: &Value) -> Option<u32> {
    let n = match value {
        Value::Number(n) => n.as_u64()?,
        Value::String(s) => s.trim().parse::<u64>().ok()?,
        _ => return None,
    };
    u32::try_from(n).ok().filter(|n| *n > 0)
}

/// Reads and writes the settings blob.
pub struct SettingsProvider<'a> {
    db: &'a Database,
}

impl<'a> SettingsProvider<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Current settings, with defaults filled in.
    ///
    /// # Errors
    /// Only if the store itself cannot be read.
    pub fn effective(&self) -> Result<EffectiveSettings> {
        Ok(EffectiveSettings::from_blob(&self.blob()?))
    }

    /// Write the default blob unless one already exists. Returns whether it wrote.
    pub fn install_defaults(&self) -> Result<bool> {
        if self.db.kv_get(SETTINGS_KEY)?.is_some() {
            return Ok(false);
        }
        self.write_timer_settings(EffectiveSettings::default())?;
        Ok(true)
    }

    /// Set one field of `timerSettings`, keeping the rest of the blob intact.
    pub fn update(&self, field: &str, value: &str) -> Result<EffectiveSettings> {
        if !FIELDS.contains(&field) {
            return Err(ValidationError::InvalidValue {
                field: field.to_string(),
                message: format!("expected one of {}", FIELDS.join(", ")),
            }
            .into());
        }
        let parsed = positive_int(&Value::String(value.to_string())).ok_or_else(|| {
            ValidationError::InvalidValue {
                field: field.to_string(),
                message: format!("'{value}' is not a positive integer"),
            }
        })?;

        let mut root = into_object(self.blob()?);
        let mut timer = into_object(root.remove(TIMER_SETTINGS).unwrap_or_default());
        timer.insert(field.to_string(), Value::from(parsed));
        root.insert(TIMER_SETTINGS.to_string(), Value::Object(timer));

        let blob = Value::Object(root);
        self.db.kv_set(SETTINGS_KEY, &serde_json::to_string(&blob)?)?;
        Ok(EffectiveSettings::from_blob(&blob))
    }

    /// Restore default durations and cycle count.
    pub fn reset(&self) -> Result<()> {
        self.write_timer_settings(EffectiveSettings::default())
    }

    fn write_timer_settings(&self, settings: EffectiveSettings) -> Result<()> {
        let mut root = into_object(self.blob()?);
        root.insert(TIMER_SETTINGS.to_string(), settings.to_json());
        self.db.kv_set(SETTINGS_KEY, &serde_json::to_string(&root)?)?;
        Ok(())
    }

    fn blob(&self) -> Result<Value> {
        let Some(raw) = self.db.kv_get(SETTINGS_KEY)? else {
            return Ok(Value::Null);
        };
        Ok(serde_json::from_str(&raw).unwrap_or_else(|e| {
            warn!(error = %e, "settings record is not valid JSON, using defaults");
            Value::Null
        }))
    }
}

/// The map of an object value; anything else is replaced by an empty map.
fn into_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
