//! Routes status messages to exactly one output channel
//!
//! When assistive mode is active the message goes to the screen reader as
//! an interrupting announcement, otherwise it is spoken by the synthesizer.
//! Never both.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::accessibility::AssistiveMode;

use super::channels::{
    AnnouncementChannel, AudioSession, AudioSessionConfig, SpeechSynthesizer, Utterance,
    DEFAULT_SPEECH_RATE,
};

/// Which channel an announcement was sent to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Accessibility,
    Speech,
}

/// Router tuning taken from configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouterOptions {
    pub speech_rate: f32,
    pub assistive_delivery_hints: bool,
    pub audio: AudioSessionConfig,
}

impl Default for RouterOptions {
    fn default() -> Self {
        Self {
            speech_rate: DEFAULT_SPEECH_RATE,
            assistive_delivery_hints: true,
            audio: AudioSessionConfig::default(),
        }
    }
}

/// Output channels the router owns
pub struct Channels {
    pub announcer: Arc<dyn AnnouncementChannel>,
    pub synthesizer: Arc<dyn SpeechSynthesizer>,
    pub audio_session: Arc<dyn AudioSession>,
}

pub struct FeedbackRouter {
    channels: Channels,
    mode: AssistiveMode,
    options: RouterOptions,
    configured: AtomicBool,
}

impl FeedbackRouter {
    pub fn new(channels: Channels, mode: AssistiveMode, options: RouterOptions) -> Self {
        Self {
            channels,
            mode,
            options,
            configured: AtomicBool::new(false),
        }
    }

    /// Set up the audio output for spoken feedback
    ///
    /// Only the first call touches the audio session. A failure is logged
    /// and announcements keep being dispatched, possibly inaudibly.
    pub fn configure(&self) {
        if self.configured.swap(true, Ordering::SeqCst) {
            debug!("audio session already configured");
            return;
        }

        match self.channels.audio_session.activate(&self.options.audio) {
            Ok(()) => {
                info!(
                    duck_others = self.options.audio.duck_others,
                    override_mute = self.options.audio.override_mute,
                    "audio session configured"
                );
            }
            Err(e) => {
                warn!(?e, "audio session setup failed, continuing with degraded audio");
            }
        }
    }

    /// Speak `message` through the channel matching the current assistive mode
    ///
    /// Returns once the dispatch is issued. Empty messages are ignored and
    /// channel failures are logged, never returned.
    pub fn announce(&self, message: &str) {
        if message.is_empty() {
            return;
        }

        let route = self.route();
        debug!(?route, text = message, "announcing");

        let result = match route {
            Route::Accessibility => self.channels.announcer.post_interrupting(message),
            Route::Speech => self.channels.synthesizer.speak(&Utterance {
                text: message.to_string(),
                rate: self.options.speech_rate,
                prefers_assistive_delivery: self.options.assistive_delivery_hints,
            }),
        };

        if let Err(e) = result {
            warn!(?e, ?route, "announcement dropped");
        }
    }

    /// Channel the next announcement would use
    pub fn route(&self) -> Route {
        if self.mode.is_active() {
            Route::Accessibility
        } else {
            Route::Speech
        }
    }
}
