//! Configuration loading and management
//!
//! Defaults, then `<data_dir>/config.json` if present, then environment
//! overrides (`TACTILE_SOCKET`, `TACTILE_BACKEND`, `TACTILE_ASSISTIVE_MODE`).

use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::warn;

use crate::feedback::{AudioSessionConfig, RouterOptions, DEFAULT_SPEECH_RATE};
use crate::state::SessionOptions;

/// Which implementation backs the external collaborators
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Backend {
    /// speech-dispatcher, gsettings and PulseAudio
    SpeechDispatcher,
    /// Log every dispatch instead of speaking
    Log,
}

impl FromStr for Backend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "speech-dispatcher" => Ok(Backend::SpeechDispatcher),
            "log" => Ok(Backend::Log),
            other => bail!("unknown backend '{}'", other),
        }
    }
}

/// Feedback and session tuning
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default)]
pub struct FeedbackSettings {
    /// 0.0 to 1.0, 0.5 is neutral
    pub speech_rate: f32,
    pub assistive_delivery_hints: bool,
    pub duck_others: bool,
    pub override_mute: bool,
    pub restrict_speed_to_presets: bool,
}

impl Default for FeedbackSettings {
    fn default() -> Self {
        Self {
            speech_rate: DEFAULT_SPEECH_RATE,
            assistive_delivery_hints: true,
            duck_others: true,
            override_mute: true,
            restrict_speed_to_presets: false,
        }
    }
}

/// Contents of the optional config file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    socket_path: Option<PathBuf>,
    backend: Option<Backend>,
    assistive_mode: Option<bool>,
    feedback: FeedbackSettings,
}

/// Daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Path to the Unix domain socket for IPC
    pub socket_path: PathBuf,

    /// Directory for runtime data
    pub data_dir: PathBuf,

    pub backend: Backend,

    /// Fixed assistive-mode value for the log backend
    pub assistive_mode: bool,

    pub feedback: FeedbackSettings,
}

impl Config {
    /// Load configuration from defaults, config file and environment
    pub fn load() -> Result<Self> {
        let home = std::env::var("HOME").context("HOME is not set")?;
        let data_dir = PathBuf::from(&home)
            .join(".local")
            .join("share")
            .join("tactile");

        let file = read_file(&data_dir.join("config.json"))?;
        Self::resolve(data_dir, file, |key| std::env::var(key).ok())
    }

    fn resolve(
        data_dir: PathBuf,
        file: FileConfig,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let socket_path = env("TACTILE_SOCKET")
            .map(PathBuf::from)
            .or(file.socket_path)
            .unwrap_or_else(|| data_dir.join("daemon.sock"));

        let backend = match env("TACTILE_BACKEND") {
            Some(value) => value.parse::<Backend>().context("invalid TACTILE_BACKEND")?,
            None => file.backend.unwrap_or(Backend::SpeechDispatcher),
        };

        let assistive_mode = match env("TACTILE_ASSISTIVE_MODE") {
            Some(value) => value
                .parse::<bool>()
                .with_context(|| format!("invalid TACTILE_ASSISTIVE_MODE '{}'", value))?,
            None => file.assistive_mode.unwrap_or(false),
        };

        let mut feedback = file.feedback;
        if !(0.0..=1.0).contains(&feedback.speech_rate) {
            warn!(rate = feedback.speech_rate, "speech_rate out of range, clamping");
            feedback.speech_rate = feedback.speech_rate.clamp(0.0, 1.0);
        }

        Ok(Self {
            socket_path,
            data_dir,
            backend,
            assistive_mode,
            feedback,
        })
    }

    pub fn router_options(&self) -> RouterOptions {
        RouterOptions {
            speech_rate: self.feedback.speech_rate,
            assistive_delivery_hints: self.feedback.assistive_delivery_hints,
            audio: AudioSessionConfig {
                duck_others: self.feedback.duck_others,
                override_mute: self.feedback.override_mute,
            },
        }
    }

    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            restrict_speed_to_presets: self.feedback.restrict_speed_to_presets,
        }
    }

    /// Ensure data directory exists
    pub fn ensure_dirs(&self) -> Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        Ok(())
    }
}

fn read_file(path: &Path) -> Result<FileConfig> {
    match std::fs::read_to_string(path) {
        Ok(contents) => serde_json::from_str(&contents)
            .with_context(|| format!("failed to parse {}", path.display())),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(FileConfig::default()),
        Err(e) => Err(e).with_context(|| format!("failed to read {}", path.display())),
    }
}
