use std::fmt;

use serde::{Deserialize, Serialize};

use crate::pages::Page;

const WORK_BADGE_COLOR: &str = "#FB4141";
const BREAK_BADGE_COLOR: &str = "#5CB338";
const BADGE_TEXT_COLOR: &str = "#FFFFFF";

const NOTICE_TITLE: &str = "Pomotime";

/// One of the three countdown kinds in a Pomodoro cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Phase {
    Work,
    Break,
    LargeBreak,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Work, Phase::Break, Phase::LargeBreak];

    /// Badge colors for a countdown of this phase.
    pub fn profile(self) -> &'static PhaseProfile {
        match self {
            Phase::Work => &WORK_PROFILE,
            Phase::Break => &BREAK_PROFILE,
            Phase::LargeBreak => &LARGE_BREAK_PROFILE,
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::Work => "work",
            Phase::Break => "break",
            Phase::LargeBreak => "large break",
        })
    }
}

/// Static per-phase presentation data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhaseProfile {
    pub badge_color: &'static str,
    pub badge_text_color: &'static str,
}

static WORK_PROFILE: PhaseProfile = PhaseProfile {
    badge_color: WORK_BADGE_COLOR,
    badge_text_color: BADGE_TEXT_COLOR,
};

static BREAK_PROFILE: PhaseProfile = PhaseProfile {
    badge_color: BREAK_BADGE_COLOR,
    badge_text_color: BADGE_TEXT_COLOR,
};

static LARGE_BREAK_PROFILE: PhaseProfile = PhaseProfile {
    badge_color: BREAK_BADGE_COLOR,
    badge_text_color: BADGE_TEXT_COLOR,
};

/// What the badge surface should show.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Badge {
    pub text: String,
    pub text_color: String,
    pub background_color: String,
}

impl Badge {
    /// Badge for a running countdown with `remaining_min` minutes left.
    pub fn countdown(phase: Phase, remaining_min: u32) -> Self {
        let profile = phase.profile();
        Self {
            text: remaining_min.to_string(),
            text_color: profile.badge_text_color.to_string(),
            background_color: profile.badge_color.to_string(),
        }
    }

    /// Empty badge, shown when nothing is running.
    pub fn cleared() -> Self {
        Self {
            text: String::new(),
            text_color: BADGE_TEXT_COLOR.to_string(),
            background_color: WORK_BADGE_COLOR.to_string(),
        }
    }

    pub fn is_cleared(&self) -> bool {
        self.text.is_empty()
    }
}

/// A user-facing notification, optionally followed by opening a page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub title: String,
    pub message: String,
    pub page: Option<Page>,
}

impl Notice {
    fn new(message: &str, page: Option<Page>) -> Self {
        Self {
            title: NOTICE_TITLE.to_string(),
            message: message.to_string(),
            page,
        }
    }

    /// Completion notice for `completed`, given the phase that follows it.
    pub fn for_completion(completed: Phase, next: Phase) -> Self {
        match (completed, next) {
            (Phase::Work, Phase::LargeBreak) => Self::new(
                "Work session complete, Take a long break!",
                Some(Page::LargeBreak),
            ),
            (Phase::Work, _) => {
                Self::new("Work session complete, Take a break!", Some(Page::Complete))
            }
            (Phase::Break, _) => {
                Self::new("Break complete, Start working again!", Some(Page::Break))
            }
            (Phase::LargeBreak, _) => {
                Self::new("Long break complete, Start a new cycle!", Some(Page::Break))
            }
        }
    }

    pub fn stopped() -> Self {
        Self::new("Timer stopped", None)
    }

    pub fn already_running(phase: Phase) -> Self {
        Self::new(&format!("A {phase} timer is already running"), None)
    }

    pub fn not_running() -> Self {
        Self::new("No timer running", None)
    }
}
