use core::time::Duration;
use serde::{Deserialize, Serialize};

use crate::config::FingerConfig;

/// Mean colour over the region of interest, each channel in 0..=255.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorMeans {
    pub red: f32,
    pub green: f32,
    pub blue: f32,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FingerEvent {
    Placed,
    Removed,
}

/// Decides whether a finger covers the lens. A lit finger turns the whole
/// frame deep red, so all three channel means are checked. Presence changes
/// are rate limited to avoid flapping while the finger is being positioned.
pub struct FingerDetector {
    config: FingerConfig,
    present: bool,
    last_toggle: Option<Duration>,
}

impl FingerDetector {
    pub fn new(config: FingerConfig) -> Self {
        Self {
            config,
            present: false,
            last_toggle: None,
        }
    }

    pub fn covers_lens(&self, color: ColorMeans) -> bool {
        color.red >= self.config.min_red
            && color.green <= self.config.max_green
            && color.blue <= self.config.max_blue
    }

    pub fn is_present(&self) -> bool {
        self.present
    }

    /// Feeds one frame's colour and reports an accepted presence change.
    pub fn update(&mut self, color: ColorMeans, now: Duration) -> Option<FingerEvent> {
        let covered = self.covers_lens(color);
        if covered == self.present {
            return None;
        }
        if let Some(last) = self.last_toggle {
            if now.saturating_sub(last) < self.config.toggle_interval() {
                return None;
            }
        }

        self.present = covered;
        self.last_toggle = Some(now);
        let event = if covered {
            FingerEvent::Placed
        } else {
            FingerEvent::Removed
        };
        log::debug!("finger {:?} at {:?}", event, now);
        Some(event)
    }

    pub fn reset(&mut self) {
        self.present = false;
        self.last_toggle = None;
    }
}
