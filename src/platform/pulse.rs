//! Audio session setup through PulseAudio's `pactl`

use std::process::{Command, Stdio};

use tracing::{debug, info};

use crate::feedback::{AudioSession, AudioSessionConfig, FeedbackError};

const DUCKING_MODULE: &str = "module-role-ducking";

pub struct PulseAudioSession {
    program: String,
}

impl PulseAudioSession {
    pub fn new() -> Self {
        Self {
            program: "pactl".to_string(),
        }
    }

    fn pactl(&self, args: &[&str]) -> Result<String, FeedbackError> {
        let output = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .map_err(|e| FeedbackError::AudioSession(format!("failed to run pactl: {}", e)))?;

        if !output.status.success() {
            return Err(FeedbackError::AudioSession(format!(
                "pactl {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Default for PulseAudioSession {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioSession for PulseAudioSession {
    fn activate(&self, config: &AudioSessionConfig) -> Result<(), FeedbackError> {
        if config.duck_others {
            let modules = self.pactl(&["list", "short", "modules"])?;
            if has_module(&modules, DUCKING_MODULE) {
                debug!("role ducking already loaded");
            } else {
                self.pactl(&[
                    "load-module",
                    DUCKING_MODULE,
                    "trigger_roles=a11y,phone",
                    "ducking_roles=music,video,game",
                ])?;
                info!("role ducking enabled");
            }
        }

        if config.override_mute {
            self.pactl(&["set-sink-mute", "@DEFAULT_SINK@", "0"])?;
            info!("default sink unmuted for spoken feedback");
        }

        Ok(())
    }
}

/// Whether `pactl list short modules` output contains `name`
fn has_module(listing: &str, name: &str) -> bool {
    listing
        .lines()
        .any(|line| line.split_whitespace().nth(1) == Some(name))
}
