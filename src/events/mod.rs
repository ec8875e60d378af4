//! Events module for session state changes
//!
//! Published after a transition is committed, for callers that render
//! or mirror the session state.

use serde::{Deserialize, Serialize};

use crate::state::Category;

/// Events emitted by the session state machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    /// Recording switched on
    RecordingStarted,

    /// Recording switched off
    RecordingPaused,

    /// A different category is active
    CategoryChanged { category: Category },

    /// Playback speed was set
    SpeedChanged { speed: f64 },

    /// The system screen reader was turned on or off
    AssistiveModeChanged { active: bool },
}

impl std::fmt::Display for SessionEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionEvent::RecordingStarted => write!(f, "RECORDING_STARTED"),
            SessionEvent::RecordingPaused => write!(f, "RECORDING_PAUSED"),
            SessionEvent::CategoryChanged { category } => {
                write!(f, "CATEGORY_CHANGED ({})", category)
            }
            SessionEvent::SpeedChanged { speed } => write!(f, "SPEED_CHANGED ({}x)", speed),
            SessionEvent::AssistiveModeChanged { active } => {
                write!(f, "ASSISTIVE_MODE_CHANGED ({})", active)
            }
        }
    }
}
