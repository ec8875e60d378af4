//! Session state module
//!
//! Provides the session state machine and the value types it owns:
//! - Category: fixed, circularly cycled recording labels
//! - Playback speed: any finite non-negative value, presets 0.5/1/2
//! - SessionStateMachine: serializes transitions and their announcements

mod context;
mod machine;
mod speed;

pub use context::{Category, Direction};
pub use machine::{Action, Command, SessionOptions, SessionSnapshot, SessionStateMachine};
pub use speed::SpeedPreset;
