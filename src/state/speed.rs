//! Playback speed values and the presets offered to callers

use serde::{Deserialize, Serialize};

/// Speed the session starts with
pub const DEFAULT_SPEED: f64 = 1.0;

/// Speeds a caller's selector normally offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeedPreset {
    Half,
    Normal,
    Double,
    #[serde(other)]
    Unknown,
}

impl SpeedPreset {
    pub const ALL: [SpeedPreset; 3] = [SpeedPreset::Normal, SpeedPreset::Double, SpeedPreset::Half];

    /// Numeric value of the preset, `None` for an unknown preset
    pub fn value(self) -> Option<f64> {
        match self {
            SpeedPreset::Half => Some(0.5),
            SpeedPreset::Normal => Some(1.0),
            SpeedPreset::Double => Some(2.0),
            SpeedPreset::Unknown => None,
        }
    }

    /// Whether `value` is exactly one of the preset speeds
    pub fn is_preset(value: f64) -> bool {
        Self::ALL.iter().any(|p| p.value() == Some(value))
    }
}

/// Only finite, non-negative speeds are accepted by the session
pub fn is_valid(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

/// Announcement text for a speed, e.g. "Speed 2x" or "Speed 0.5x"
pub fn announcement(value: f64) -> String {
    format!("Speed {}x", value)
}
