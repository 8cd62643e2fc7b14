use core::time::Duration;
use serde::{Deserialize, Serialize};

/// Smallest buffer that can contain a local maximum.
pub const MIN_CAPACITY: usize = 3;

/// Tunables of the estimation pipeline. The buffer capacity is a const
/// parameter of [`crate::Session`]; everything else lives here.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Number of neighbouring samples averaged into one smoothed value.
    pub smoothing_window: usize,
    /// Minimum prominence of a local maximum to count as a beat, in sample units.
    pub prominence_threshold: f32,
    /// Frames that have to be captured before estimates are trusted.
    pub frames_captured_threshold: usize,
    /// Minimum time between two recomputations of the displayed rate.
    pub min_refresh_interval_ms: u32,
    /// If set, the window duration is derived from this rate instead of
    /// frame timestamps.
    pub nominal_frame_rate: Option<f32>,
    /// Scale the red mean from 0..=255 to 0..=1 before buffering.
    pub normalize_intensity: bool,
    /// Length of the recording countdown started when a finger is placed.
    pub recording_duration_ms: u32,
    pub finger: FingerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            smoothing_window: 5,
            prominence_threshold: 0.05,
            frames_captured_threshold: 100,
            min_refresh_interval_ms: 1000,
            nominal_frame_rate: None,
            normalize_intensity: true,
            recording_duration_ms: 33_000,
            finger: FingerConfig::default(),
        }
    }
}

/// Colour limits (0..=255) under which the ROI is considered covered by a
/// lit finger.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FingerConfig {
    pub min_red: f32,
    pub max_green: f32,
    pub max_blue: f32,
    /// Presence changes closer together than this are ignored.
    pub toggle_interval_ms: u32,
}

impl Default for FingerConfig {
    fn default() -> Self {
        Self {
            min_red: 150.0,
            max_green: 100.0,
            max_blue: 100.0,
            toggle_interval_ms: 1000,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    #[error("buffer capacity {capacity} is too small, at least 3 samples are needed")]
    CapacityTooSmall { capacity: usize },
    #[error("smoothing window must cover at least one sample")]
    EmptySmoothingWindow,
    #[error("smoothing window {window} must be smaller than the buffer capacity {capacity}")]
    SmoothingWindowTooLarge { window: usize, capacity: usize },
    #[error("prominence threshold must be finite and non-negative, got {0}")]
    InvalidProminenceThreshold(f32),
    #[error("frames captured threshold must be at least 1")]
    ZeroFramesCapturedThreshold,
    #[error("nominal frame rate must be finite and positive, got {0}")]
    InvalidFrameRate(f32),
    #[error("finger colour limits must lie within 0..=255")]
    InvalidFingerLimits,
    #[error("finger toggle interval must be non-zero")]
    ZeroToggleInterval,
}

fn is_channel_value(v: f32) -> bool {
    (0.0..=255.0).contains(&v)
}

impl Config {
    /// Checks the tunables against a sample buffer of `capacity` entries.
    pub fn validate(&self, capacity: usize) -> Result<(), ConfigError> {
        if capacity < MIN_CAPACITY {
            return Err(ConfigError::CapacityTooSmall { capacity });
        }
        if self.smoothing_window == 0 {
            return Err(ConfigError::EmptySmoothingWindow);
        }
        if self.smoothing_window >= capacity {
            return Err(ConfigError::SmoothingWindowTooLarge {
                window: self.smoothing_window,
                capacity,
            });
        }
        // NaN fails the range check as well
        if !(self.prominence_threshold >= 0.0 && self.prominence_threshold.is_finite()) {
            return Err(ConfigError::InvalidProminenceThreshold(
                self.prominence_threshold,
            ));
        }
        if self.frames_captured_threshold == 0 {
            return Err(ConfigError::ZeroFramesCapturedThreshold);
        }
        if let Some(rate) = self.nominal_frame_rate {
            if !(rate > 0.0 && rate.is_finite()) {
                return Err(ConfigError::InvalidFrameRate(rate));
            }
        }
        self.finger.validate()
    }

    pub fn min_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.min_refresh_interval_ms.into())
    }

    pub fn recording_duration(&self) -> Duration {
        Duration::from_millis(self.recording_duration_ms.into())
    }
}

impl FingerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(is_channel_value(self.min_red)
            && is_channel_value(self.max_green)
            && is_channel_value(self.max_blue))
        {
            return Err(ConfigError::InvalidFingerLimits);
        }
        if self.toggle_interval_ms == 0 {
            return Err(ConfigError::ZeroToggleInterval);
        }
        Ok(())
    }

    pub fn toggle_interval(&self) -> Duration {
        Duration::from_millis(self.toggle_interval_ms.into())
    }
}
