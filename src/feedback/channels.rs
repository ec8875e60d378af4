//! Output channels the router dispatches to

use serde::{Deserialize, Serialize};

/// Neutral speaking rate on a 0.0 (slowest) to 1.0 (fastest) scale
pub const DEFAULT_SPEECH_RATE: f32 = 0.5;

/// A single piece of synthesized speech
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub text: String,
    /// 0.0 to 1.0, `DEFAULT_SPEECH_RATE` is neutral
    pub rate: f32,
    /// Ask the engine to deliver speech the way a screen reader would
    pub prefers_assistive_delivery: bool,
}

/// How the audio output should be set up before speaking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioSessionConfig {
    /// Lower other playing audio while speaking
    pub duck_others: bool,
    /// Keep speaking when the output is muted
    pub override_mute: bool,
}

impl Default for AudioSessionConfig {
    fn default() -> Self {
        Self {
            duck_others: true,
            override_mute: true,
        }
    }
}

/// System accessibility announcement channel (screen reader)
pub trait AnnouncementChannel: Send + Sync {
    /// Post an announcement that interrupts speech in progress
    fn post_interrupting(&self, text: &str) -> Result<(), FeedbackError>;
}

/// Speech synthesis engine
pub trait SpeechSynthesizer: Send + Sync {
    /// Start speaking. Returns once dispatched, not when finished.
    fn speak(&self, utterance: &Utterance) -> Result<(), FeedbackError>;
}

/// Audio output configuration
pub trait AudioSession: Send + Sync {
    /// Activate spoken-audio playback
    fn activate(&self, config: &AudioSessionConfig) -> Result<(), FeedbackError>;
}

/// Errors from feedback output channels
#[derive(Debug, thiserror::Error)]
pub enum FeedbackError {
    #[error("failed to configure audio session: {0}")]
    AudioSession(String),

    #[error("accessibility announcement failed: {0}")]
    Announcement(String),

    #[error("speech synthesis failed: {0}")]
    Speech(String),
}
