//! Output channels backed by speech-dispatcher's `spd-say`
//!
//! Each dispatch spawns `spd-say` and returns without waiting for it.
//! The `important` priority cancels whatever speech-dispatcher is saying,
//! which gives the screen-reader channel its interrupting behaviour.

use std::process::Stdio;

use tokio::process::Command;
use tracing::debug;

use crate::feedback::{AnnouncementChannel, FeedbackError, SpeechSynthesizer, Utterance};

const SPD_SAY: &str = "spd-say";

/// Interrupting announcements, used while a screen reader is active
pub struct SpeechDispatcherAnnouncer {
    program: String,
}

impl SpeechDispatcherAnnouncer {
    pub fn new() -> Self {
        Self {
            program: SPD_SAY.to_string(),
        }
    }
}

impl Default for SpeechDispatcherAnnouncer {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnouncementChannel for SpeechDispatcherAnnouncer {
    fn post_interrupting(&self, text: &str) -> Result<(), FeedbackError> {
        spawn(&self.program, &announcement_args(text)).map_err(FeedbackError::Announcement)
    }
}

/// Synthesized speech for users without a screen reader
pub struct SpeechDispatcherSynthesizer {
    program: String,
}

impl SpeechDispatcherSynthesizer {
    pub fn new() -> Self {
        Self {
            program: SPD_SAY.to_string(),
        }
    }
}

impl Default for SpeechDispatcherSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl SpeechSynthesizer for SpeechDispatcherSynthesizer {
    fn speak(&self, utterance: &Utterance) -> Result<(), FeedbackError> {
        spawn(&self.program, &speech_args(utterance)).map_err(FeedbackError::Speech)
    }
}

fn announcement_args(text: &str) -> Vec<String> {
    vec![
        "--priority".to_string(),
        "important".to_string(),
        "--".to_string(),
        text.to_string(),
    ]
}

fn speech_args(utterance: &Utterance) -> Vec<String> {
    // "message" is the priority screen readers use for status messages
    let priority = if utterance.prefers_assistive_delivery {
        "message"
    } else {
        "text"
    };

    vec![
        "--rate".to_string(),
        spd_rate(utterance.rate).to_string(),
        "--priority".to_string(),
        priority.to_string(),
        "--".to_string(),
        utterance.text.clone(),
    ]
}

/// Map a 0.0..=1.0 rate onto speech-dispatcher's -100..=100
fn spd_rate(rate: f32) -> i32 {
    (rate.clamp(0.0, 1.0) * 200.0 - 100.0).round() as i32
}

fn spawn(program: &str, args: &[String]) -> Result<(), String> {
    // The runtime reaps the child once it exits
    Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| format!("failed to run {}: {}", program, e))?;

    debug!(program, "speech dispatched");
    Ok(())
}
