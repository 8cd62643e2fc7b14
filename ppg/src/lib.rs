#![cfg_attr(not(test), no_std)]

//! Heart rate from the brightness of a lit fingertip in front of a camera.
//!
//! Every camera frame contributes the mean red value of its region of
//! interest. The last [`DEFAULT_CAPACITY`] values are smoothed, peaks with
//! enough prominence are counted, and the count over the buffered time span
//! gives the rate. Nothing here allocates; all buffers are fixed arrays.

mod config;
pub mod finger;
pub mod monitor;
pub mod peaks;
pub mod reading;
pub mod session;
pub mod smooth;

pub use config::{Config, ConfigError, FingerConfig, MIN_CAPACITY};
pub use finger::{ColorMeans, FingerDetector, FingerEvent};
pub use monitor::{Frame, HeartRateMonitor};
pub use peaks::{count_peaks, peaks, Peak};
pub use reading::{Reading, ReadingCell, BPM};
pub use session::{Session, State};
pub use smooth::smooth_into;

/// Samples kept for one estimate, about three seconds of video at 30 fps.
pub const DEFAULT_CAPACITY: usize = 100;
