//! In-memory stand-ins for the external collaborators, used by tests

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use tokio::sync::{mpsc, watch};

use crate::accessibility::{AccessibilityError, AccessibilityStatusSource};
use crate::feedback::{
    AnnouncementChannel, AudioSession, AudioSessionConfig, FeedbackError, SpeechSynthesizer,
    Utterance,
};
use crate::state::SessionSnapshot;

/// Accessibility source whose condition and notifications are driven by the test
pub struct FakeStatusSource {
    active: AtomicBool,
    sender: Mutex<Option<mpsc::Sender<()>>>,
    fail_subscribe: bool,
    query_delay: Option<Duration>,
}

impl FakeStatusSource {
    pub fn new(active: bool) -> Self {
        Self {
            active: AtomicBool::new(active),
            sender: Mutex::new(None),
            fail_subscribe: false,
            query_delay: None,
        }
    }

    /// Make every point query block the calling thread for `delay`
    pub fn with_query_delay(self, delay: Duration) -> Self {
        Self {
            query_delay: Some(delay),
            ..self
        }
    }

    pub fn failing_subscribe(active: bool) -> Self {
        Self {
            fail_subscribe: true,
            ..Self::new(active)
        }
    }

    /// Change the true external condition without notifying
    pub fn set_active(&self, active: bool) {
        self.active.store(active, Ordering::SeqCst);
    }

    /// Emit a change notification to the subscriber, if any
    pub fn notify(&self) {
        if let Some(tx) = self.sender.lock().unwrap().as_ref() {
            tx.try_send(()).unwrap();
        }
    }

    /// Resolves once the subscriber has dropped its receiver
    pub async fn subscription_closed(&self) {
        let tx = self.sender.lock().unwrap().clone();
        if let Some(tx) = tx {
            tx.closed().await;
        }
    }
}

impl AccessibilityStatusSource for FakeStatusSource {
    fn is_assistive_mode_active(&self) -> bool {
        if let Some(delay) = self.query_delay {
            std::thread::sleep(delay);
        }
        self.active.load(Ordering::SeqCst)
    }

    fn subscribe(&self) -> Result<mpsc::Receiver<()>, AccessibilityError> {
        if self.fail_subscribe {
            return Err(AccessibilityError::Subscribe("no status source".to_string()));
        }
        let (tx, rx) = mpsc::channel(8);
        *self.sender.lock().unwrap() = Some(tx);
        Ok(rx)
    }
}

/// One successful dispatch to an output channel
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    Announcement(String),
    Speech(Utterance),
}

/// Both output channels in one, recording dispatches in call order
#[derive(Default)]
pub struct RecordingChannels {
    dispatches: Mutex<Vec<Dispatch>>,
    attempts: AtomicUsize,
    fail: AtomicBool,
    observer: Mutex<Option<watch::Receiver<SessionSnapshot>>>,
    observed: Mutex<Vec<SessionSnapshot>>,
}

impl RecordingChannels {
    /// Capture the published session snapshot at every dispatch
    pub fn observe(&self, snapshots: watch::Receiver<SessionSnapshot>) {
        *self.observer.lock().unwrap() = Some(snapshots);
    }

    pub fn fail_dispatches(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn dispatches(&self) -> Vec<Dispatch> {
        self.dispatches.lock().unwrap().clone()
    }

    /// Spoken or announced texts, in order
    pub fn texts(&self) -> Vec<String> {
        self.dispatches()
            .into_iter()
            .map(|d| match d {
                Dispatch::Announcement(text) => text,
                Dispatch::Speech(u) => u.text,
            })
            .collect()
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub fn observed(&self) -> Vec<SessionSnapshot> {
        self.observed.lock().unwrap().clone()
    }

    fn record(&self, dispatch: Dispatch) -> Result<(), FeedbackError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(rx) = self.observer.lock().unwrap().as_ref() {
            self.observed.lock().unwrap().push(rx.borrow().clone());
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(FeedbackError::Speech("engine busy".to_string()));
        }
        self.dispatches.lock().unwrap().push(dispatch);
        Ok(())
    }
}

impl AnnouncementChannel for RecordingChannels {
    fn post_interrupting(&self, text: &str) -> Result<(), FeedbackError> {
        self.record(Dispatch::Announcement(text.to_string()))
    }
}

impl SpeechSynthesizer for RecordingChannels {
    fn speak(&self, utterance: &Utterance) -> Result<(), FeedbackError> {
        self.record(Dispatch::Speech(utterance.clone()))
    }
}

/// Audio session that counts activations and can be told to fail
pub struct FakeAudioSession {
    activations: AtomicUsize,
    requested: Mutex<Vec<AudioSessionConfig>>,
    fail: bool,
}

impl FakeAudioSession {
    pub fn new(fail: bool) -> Self {
        Self {
            activations: AtomicUsize::new(0),
            requested: Mutex::new(Vec::new()),
            fail,
        }
    }

    pub fn activations(&self) -> usize {
        self.activations.load(Ordering::SeqCst)
    }

    /// Configurations passed to `activate`, in call order
    pub fn requested(&self) -> Vec<AudioSessionConfig> {
        self.requested.lock().unwrap().clone()
    }
}

impl AudioSession for FakeAudioSession {
    fn activate(&self, config: &AudioSessionConfig) -> Result<(), FeedbackError> {
        self.activations.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(*config);
        if self.fail {
            return Err(FeedbackError::AudioSession("device unavailable".to_string()));
        }
        Ok(())
    }
}
