//! Backend that only logs, for machines without a speech stack

use std::sync::Mutex;

use tokio::sync::mpsc;
use tracing::info;

use crate::accessibility::{AccessibilityError, AccessibilityStatusSource};
use crate::feedback::{
    AnnouncementChannel, AudioSession, AudioSessionConfig, FeedbackError, SpeechSynthesizer,
    Utterance,
};

/// Logs every dispatch at info level
pub struct LogBackend;

impl AnnouncementChannel for LogBackend {
    fn post_interrupting(&self, text: &str) -> Result<(), FeedbackError> {
        info!(channel = "accessibility", text, "announcement");
        Ok(())
    }
}

impl SpeechSynthesizer for LogBackend {
    fn speak(&self, utterance: &Utterance) -> Result<(), FeedbackError> {
        info!(
            channel = "speech",
            text = %utterance.text,
            rate = utterance.rate,
            assistive_delivery = utterance.prefers_assistive_delivery,
            "announcement"
        );
        Ok(())
    }
}

impl AudioSession for LogBackend {
    fn activate(&self, config: &AudioSessionConfig) -> Result<(), FeedbackError> {
        info!(?config, "audio session activated");
        Ok(())
    }
}

/// Status source with a fixed value that never notifies
pub struct FixedStatusSource {
    active: bool,
    /// Senders kept so subscriptions stay open
    subscribers: Mutex<Vec<mpsc::Sender<()>>>,
}

impl FixedStatusSource {
    pub fn new(active: bool) -> Self {
        Self {
            active,
            subscribers: Mutex::new(Vec::new()),
        }
    }
}

impl AccessibilityStatusSource for FixedStatusSource {
    fn is_assistive_mode_active(&self) -> bool {
        self.active
    }

    fn subscribe(&self) -> Result<mpsc::Receiver<()>, AccessibilityError> {
        let (tx, rx) = mpsc::channel(1);
        self.subscribers
            .lock()
            .map_err(|_| AccessibilityError::Subscribe("subscriber list poisoned".to_string()))?
            .push(tx);
        Ok(rx)
    }
}
