//! Concrete backends for the accessibility source, output channels and
//! audio session

mod gsettings;
mod log;
mod pulse;
mod speech_dispatcher;

use std::sync::Arc;

use crate::accessibility::AccessibilityStatusSource;
use crate::config::{Backend, Config};
use crate::feedback::Channels;

use self::gsettings::GsettingsStatusSource;
use self::log::{FixedStatusSource, LogBackend};
use self::pulse::PulseAudioSession;
use self::speech_dispatcher::{SpeechDispatcherAnnouncer, SpeechDispatcherSynthesizer};

/// Build the status source and output channels selected by `config`
pub fn build(config: &Config) -> (Arc<dyn AccessibilityStatusSource>, Channels) {
    match config.backend {
        Backend::SpeechDispatcher => {
            let source: Arc<dyn AccessibilityStatusSource> = Arc::new(GsettingsStatusSource::new());
            let channels = Channels {
                announcer: Arc::new(SpeechDispatcherAnnouncer::new()),
                synthesizer: Arc::new(SpeechDispatcherSynthesizer::new()),
                audio_session: Arc::new(PulseAudioSession::new()),
            };
            (source, channels)
        }
        Backend::Log => {
            let source: Arc<dyn AccessibilityStatusSource> =
                Arc::new(FixedStatusSource::new(config.assistive_mode));
            let backend = Arc::new(LogBackend);
            let channels = Channels {
                announcer: backend.clone(),
                synthesizer: backend.clone(),
                audio_session: backend,
            };
            (source, channels)
        }
    }
}
