use arrform::ArrForm;
use core::time::Duration;
use util::{Countdown, COUNTDOWN_TEXT_LEN};

use crate::config::{Config, ConfigError};
use crate::finger::{ColorMeans, FingerDetector, FingerEvent};
use crate::reading::{Reading, ReadingCell};
use crate::session::{Session, State};
use crate::DEFAULT_CAPACITY;

/// What the capture pipeline delivers for one camera frame.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Frame {
    /// Capture time relative to the start of the capture session.
    pub timestamp: Duration,
    pub color: ColorMeans,
    /// False when the ROI could not be extracted from this frame.
    pub roi_valid: bool,
    /// Whether the torch was lit while the frame was exposed.
    pub flash_on: bool,
}

/// Per-frame bridge between the capture pipeline and the estimator.
///
/// Tracks finger placement, feeds trusted samples into the session, restarts
/// the session whenever the finger is placed or lifted and publishes the
/// debounced reading for the display.
pub struct HeartRateMonitor<'a, const N: usize = DEFAULT_CAPACITY> {
    session: Session<N>,
    finger: FingerDetector,
    countdown: Countdown,
    display: &'a ReadingCell,
}

impl<'a, const N: usize> HeartRateMonitor<'a, N> {
    pub fn new(config: Config, display: &'a ReadingCell) -> Result<Self, ConfigError> {
        let session = Session::new(config)?;
        display.publish(Reading::NotReady);
        Ok(Self {
            session,
            finger: FingerDetector::new(config.finger),
            countdown: Countdown::new(config.recording_duration()),
            display,
        })
    }

    pub fn session(&self) -> &Session<N> {
        &self.session
    }

    pub fn finger_present(&self) -> bool {
        self.finger.is_present()
    }

    /// Handles one frame. Returns the finger event, if any, so the caller
    /// can switch the torch.
    pub fn process_frame(&mut self, frame: Frame) -> Option<FingerEvent> {
        if !frame.roi_valid {
            return None;
        }

        let event = self.finger.update(frame.color, frame.timestamp);
        match event {
            Some(FingerEvent::Placed) => {
                self.restart_session();
                self.countdown.start(frame.timestamp);
            }
            Some(FingerEvent::Removed) => {
                self.restart_session();
                self.countdown.stop();
            }
            None => {}
        }

        if !self.finger.is_present() {
            return event;
        }
        if !frame.flash_on {
            // unlit frames carry no pulse
            if self.session.state() != State::Idle {
                log::debug!("torch off under finger at {:?}", frame.timestamp);
                self.restart_session();
            }
            return event;
        }

        let red = frame.color.red;
        let sample = if self.session.config().normalize_intensity {
            red / 255.0
        } else {
            red
        };
        self.session.on_new_sample(sample, frame.timestamp);
        event
    }

    /// Recomputes the reading if due and publishes it.
    pub fn refresh(&mut self, now: Duration) -> Reading {
        let reading = self.session.compute_heart_rate(now);
        self.display.publish(reading);
        reading
    }

    /// Whether at least one stable recording exists for the current finger
    /// placement.
    pub fn recorded(&self) -> bool {
        self.session.recorded()
    }

    pub fn recording_finished(&self, now: Duration) -> bool {
        self.countdown.is_finished(now)
    }

    pub fn countdown_text(&self, now: Duration) -> ArrForm<COUNTDOWN_TEXT_LEN> {
        self.countdown.text(now)
    }

    /// Forgets the finger and all samples, e.g. when the subject left the
    /// frame or acquisition restarts.
    pub fn reset(&mut self) {
        self.finger.reset();
        self.countdown.stop();
        self.restart_session();
    }

    fn restart_session(&mut self) {
        self.session.reset();
        self.display.publish(Reading::NotReady);
    }
}
