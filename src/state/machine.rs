//! Session state machine
//!
//! Owns recording, category and playback speed. Every operation commits
//! the new state, publishes it, and then issues exactly one announcement.
//! All commands and assistive-mode refreshes are processed by one task in
//! `run`, so announcements never interleave.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::accessibility::{AccessibilityStatusMonitor, StatusChanged};
use crate::events::SessionEvent;
use crate::feedback::FeedbackRouter;

use super::context::{Category, ContextCycle, Direction};
use super::speed::{self, SpeedPreset, DEFAULT_SPEED};

pub const RECORDING_STARTED: &str = "Recording Started";
pub const RECORDING_PAUSED: &str = "Recording Paused";

/// User-facing session state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionState {
    pub is_recording: bool,
    pub category: Category,
    pub playback_speed: f64,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            is_recording: false,
            category: Category::default(),
            playback_speed: DEFAULT_SPEED,
        }
    }
}

/// Everything a caller can read about the session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub is_recording: bool,
    pub category: Category,
    pub playback_speed: f64,
    pub assistive_mode: bool,
}

/// Operations a caller can request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    ToggleRecording,
    SelectCategory(Direction),
    SetPlaybackSpeed(f64),
    SelectSpeedPreset(SpeedPreset),
}

/// An action plus an optional reply slot for the resulting snapshot
#[derive(Debug)]
pub struct Command {
    pub action: Action,
    pub reply: Option<oneshot::Sender<SessionSnapshot>>,
}

impl Command {
    /// Command whose caller wants the post-transition snapshot
    pub fn with_reply(action: Action) -> (Self, oneshot::Receiver<SessionSnapshot>) {
        let (tx, rx) = oneshot::channel();
        (
            Self {
                action,
                reply: Some(tx),
            },
            rx,
        )
    }
}

/// Session behaviour taken from configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionOptions {
    /// Ignore speeds that are not one of the presets
    pub restrict_speed_to_presets: bool,
}

pub struct SessionStateMachine {
    state: SessionState,
    router: FeedbackRouter,
    monitor: Arc<AccessibilityStatusMonitor>,
    options: SessionOptions,
    /// Channel for emitting session events
    event_tx: broadcast::Sender<SessionEvent>,
    /// Latest committed snapshot
    snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl SessionStateMachine {
    pub fn new(
        router: FeedbackRouter,
        monitor: Arc<AccessibilityStatusMonitor>,
        options: SessionOptions,
        event_tx: broadcast::Sender<SessionEvent>,
    ) -> Self {
        let state = SessionState::default();
        let (snapshot_tx, _) = watch::channel(Self::make_snapshot(&state, monitor.is_active()));

        Self {
            state,
            router,
            monitor,
            options,
            event_tx,
            snapshot_tx,
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        Self::make_snapshot(&self.state, self.monitor.is_active())
    }

    /// Receiver that always holds the latest committed snapshot
    pub fn subscribe_snapshots(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Run the session, processing commands and status notifications
    ///
    /// Returns when the command channel closes.
    pub async fn run(
        &mut self,
        mut command_rx: mpsc::Receiver<Command>,
        mut status_rx: mpsc::Receiver<StatusChanged>,
    ) {
        info!(
            category = %self.state.category,
            speed = self.state.playback_speed,
            "session started"
        );

        let mut status_open = true;

        loop {
            tokio::select! {
                // Pending flag updates are applied before the next command
                biased;

                changed = status_rx.recv(), if status_open => match changed {
                    Some(StatusChanged) => self.refresh_assistive_mode().await,
                    None => {
                        info!("accessibility listener closed, assistive mode frozen");
                        status_open = false;
                    }
                },

                command = command_rx.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
            }
        }

        info!("session stopped");
    }

    /// Apply one command and answer its reply slot
    pub fn handle(&mut self, command: Command) {
        match command.action {
            Action::ToggleRecording => self.toggle_recording(),
            Action::SelectCategory(direction) => self.select_category(direction),
            Action::SetPlaybackSpeed(value) => self.set_playback_speed(value),
            Action::SelectSpeedPreset(preset) => match preset.value() {
                Some(value) => self.set_playback_speed(value),
                None => debug!("ignoring unknown speed preset"),
            },
        }

        if let Some(reply) = command.reply {
            // Caller may have gone away
            let _ = reply.send(self.snapshot());
        }
    }

    pub fn toggle_recording(&mut self) {
        let is_recording = !self.state.is_recording;
        self.commit(SessionState {
            is_recording,
            ..self.state
        });

        let (event, message) = if is_recording {
            (SessionEvent::RecordingStarted, RECORDING_STARTED)
        } else {
            (SessionEvent::RecordingPaused, RECORDING_PAUSED)
        };
        self.emit(event);
        self.router.announce(message);
    }

    pub fn select_category(&mut self, direction: Direction) {
        let Some(category) = ContextCycle::step(self.state.category, direction) else {
            debug!(?direction, "ignoring unknown direction");
            return;
        };

        self.commit(SessionState {
            category,
            ..self.state
        });
        self.emit(SessionEvent::CategoryChanged { category });
        self.router.announce(category.label());
    }

    pub fn set_playback_speed(&mut self, value: f64) {
        if !speed::is_valid(value) {
            warn!(value, "ignoring invalid playback speed");
            return;
        }
        if self.options.restrict_speed_to_presets && !SpeedPreset::is_preset(value) {
            warn!(value, "ignoring playback speed outside presets");
            return;
        }

        self.commit(SessionState {
            playback_speed: value,
            ..self.state
        });
        self.emit(SessionEvent::SpeedChanged { speed: value });
        self.router.announce(&speed::announcement(value));
    }

    /// Re-read the accessibility status after a change notification
    ///
    /// The query runs off the runtime's worker threads. Commands wait for
    /// it, so routing never sees a half-applied flag.
    pub async fn refresh_assistive_mode(&mut self) {
        let before = self.monitor.is_active();
        let active = self.monitor.refresh().await;

        if before != active {
            self.snapshot_tx.send_replace(self.snapshot());
            self.emit(SessionEvent::AssistiveModeChanged { active });
        }
    }

    /// Install the new state and publish it
    fn commit(&mut self, new_state: SessionState) {
        let old_state = self.state;
        self.state = new_state;

        info!(from = ?old_state, to = ?new_state, "session transition");

        self.snapshot_tx.send_replace(self.snapshot());
    }

    fn emit(&self, event: SessionEvent) {
        debug!(%event, "emitting session event");
        // No subscribers is fine
        let _ = self.event_tx.send(event);
    }

    fn make_snapshot(state: &SessionState, assistive_mode: bool) -> SessionSnapshot {
        SessionSnapshot {
            is_recording: state.is_recording,
            category: state.category,
            playback_speed: state.playback_speed,
            assistive_mode,
        }
    }
}
