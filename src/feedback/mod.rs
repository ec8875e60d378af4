//! Spoken feedback routing
//!
//! Status messages go either to the screen reader or to the speech
//! synthesizer depending on whether assistive mode is active.

mod channels;
mod router;

pub use channels::{
    AnnouncementChannel, AudioSession, AudioSessionConfig, FeedbackError, SpeechSynthesizer,
    Utterance, DEFAULT_SPEECH_RATE,
};
pub use router::{Channels, FeedbackRouter, RouterOptions};
