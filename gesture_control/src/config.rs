//! Controller tuning constants.
//!
//! Everything here is fixed configuration: loaded once at startup, never
//! mutated at runtime. The defaults are the tuned values; a TOML override
//! file may replace any subset of them.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid control config: {0}")]
    Invalid(String),
}

/// All interaction tuning knobs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ControlConfig {
    /// Thumb-to-index planar distance below which the hand counts as
    /// pinching, in normalized units.
    pub pinch_threshold: f32,

    /// Camera-distance units per unit of vertical fingertip travel while
    /// pinch-dragging.
    pub zoom_sensitivity: f32,

    /// Horizontal deviation from screen centre below which rotation is
    /// exactly zero. Raw hand tremor near centre otherwise reads as spin.
    pub deadzone: f32,

    /// Width of the band over which the post-deadzone excess rescales to
    /// [0, 1).
    pub deadzone_span: f32,

    /// Multiplier applied to the rescaled deviation.
    pub rotation_speed: f32,

    /// Camera distance bounds and starting point.
    pub min_distance: f32,
    pub max_distance: f32,
    pub default_distance: f32,

    /// Debounce window length: a mode flips only when this many consecutive
    /// ticks agree on one label.
    pub history_capacity: usize,

    /// Downward wrist travel per tick (normalized units) that counts as a
    /// slam. A slow drift must stay below this.
    pub slam_velocity: f32,

    /// Minimum gap between power toggles.
    pub power_cooldown_ms: u64,

    /// Floor on the interval between detection runs (~20 Hz cap).
    pub detect_interval_ms: u64,

    /// Cursor exponential-smoothing factor per tick, 0–1 (1 = no smoothing).
    pub cursor_smoothing: f32,
}

impl Default for ControlConfig {
    fn default() -> Self {
        ControlConfig {
            pinch_threshold: 0.05,
            zoom_sensitivity: 20.0,
            deadzone: 0.1,
            deadzone_span: 0.4,
            rotation_speed: 1.5,
            min_distance: 5.0,
            max_distance: 30.0,
            default_distance: 12.0,
            history_capacity: 10,
            slam_velocity: 0.04,
            power_cooldown_ms: 2000,
            detect_interval_ms: 50,
            cursor_smoothing: 0.4,
        }
    }
}

impl ControlConfig {
    pub fn power_cooldown(&self) -> Duration {
        Duration::from_millis(self.power_cooldown_ms)
    }

    pub fn detect_interval(&self) -> Duration {
        Duration::from_millis(self.detect_interval_ms)
    }

    /// Reject configs that would make the controller misbehave silently.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.min_distance < self.max_distance) {
            return Err(ConfigError::Invalid(format!(
                "distance bounds inverted: [{}, {}]",
                self.min_distance, self.max_distance
            )));
        }
        if self.default_distance < self.min_distance || self.default_distance > self.max_distance {
            return Err(ConfigError::Invalid(format!(
                "default distance {} outside [{}, {}]",
                self.default_distance, self.min_distance, self.max_distance
            )));
        }
        if self.pinch_threshold <= 0.0 {
            return Err(ConfigError::Invalid(
                "pinch threshold must be positive".into(),
            ));
        }
        if self.deadzone < 0.0 || self.deadzone_span <= 0.0 {
            return Err(ConfigError::Invalid(
                "deadzone must be >= 0 and deadzone span > 0".into(),
            ));
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::Invalid(
                "history capacity must be at least 1".into(),
            ));
        }
        if !(0.0..=1.0).contains(&self.cursor_smoothing) {
            return Err(ConfigError::Invalid(
                "cursor smoothing must be in [0, 1]".into(),
            ));
        }
        Ok(())
    }
}

// ════════════════════════════════════════════════════════════════════════════
// Tests
// ════════════════════════════════════════════════════════════════════════════
