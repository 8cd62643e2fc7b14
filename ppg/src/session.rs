use core::time::Duration;
use util::RingBuffer;

use crate::config::{Config, ConfigError};
use crate::peaks::count_peaks;
use crate::reading::{Reading, BPM};
use crate::smooth::smooth_into;
use crate::DEFAULT_CAPACITY;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum State {
    /// No finger, nothing sampled since the last reset.
    Idle,
    /// Collecting frames, not enough of them to trust an estimate.
    Accumulating,
    /// Enough frames captured, estimates are produced.
    Stable,
}

/// Estimation state for one finger placement: the last `N` samples with
/// their capture times, plus the debounced display reading.
///
/// Timestamps are offsets from an arbitrary epoch shared by all calls, e.g.
/// the start of the capture session.
pub struct Session<const N: usize = DEFAULT_CAPACITY> {
    config: Config,
    samples: RingBuffer<N, f32>,
    timestamps: RingBuffer<N, Duration>,
    state: State,
    frame_count: usize,
    recorded: bool,
    last_estimate: Option<Duration>,
    last_refresh: Option<Duration>,
    last_peak_count: usize,
    reading: Reading,
}

impl<const N: usize> Session<N> {
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        if let Err(e) = config.validate(N) {
            log::warn!("rejecting session config: {}", e);
            return Err(e);
        }
        Ok(Self {
            config,
            samples: Default::default(),
            timestamps: Default::default(),
            state: State::Idle,
            frame_count: 0,
            recorded: false,
            last_estimate: None,
            last_refresh: None,
            last_peak_count: 0,
            reading: Reading::NotReady,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Whether the frame threshold has been reached since the last reset.
    pub fn recorded(&self) -> bool {
        self.recorded
    }

    pub fn frame_count(&self) -> usize {
        self.frame_count
    }

    pub fn samples(&self) -> &RingBuffer<N, f32> {
        &self.samples
    }

    /// Cached reading, as returned by the last `compute_heart_rate`.
    pub fn reading(&self) -> Reading {
        self.reading
    }

    /// Time of the last recomputation.
    pub fn last_estimate(&self) -> Option<Duration> {
        self.last_estimate
    }

    /// Time the cached reading last changed.
    pub fn last_refresh(&self) -> Option<Duration> {
        self.last_refresh
    }

    /// Peaks found by the last recomputation.
    pub fn last_peak_count(&self) -> usize {
        self.last_peak_count
    }

    /// Records one intensity sample taken at `now`. Non-finite samples are
    /// dropped.
    pub fn on_new_sample(&mut self, sample: f32, now: Duration) {
        if !sample.is_finite() {
            log::debug!("dropping non-finite sample at {:?}", now);
            return;
        }
        if self.state == State::Idle {
            log::debug!("session accumulating");
            self.state = State::Accumulating;
        }

        self.samples.push(sample);
        self.timestamps.push(now);
        self.frame_count += 1;

        if self.state == State::Accumulating
            && self.frame_count >= self.config.frames_captured_threshold
        {
            log::debug!("session stable after {} frames", self.frame_count);
            self.state = State::Stable;
            self.recorded = true;
        }
    }

    /// Debounced heart rate estimate.
    ///
    /// Before the session is stable this is always `NotReady`. Afterwards the
    /// estimate is recomputed at most once per `min_refresh_interval`; calls
    /// in between return the cached reading.
    pub fn compute_heart_rate(&mut self, now: Duration) -> Reading {
        if self.state != State::Stable {
            return Reading::NotReady;
        }
        if let Some(last) = self.last_estimate {
            if now.saturating_sub(last) < self.config.min_refresh_interval() {
                return self.reading;
            }
        }

        let reading = self.estimate();
        self.last_estimate = Some(now);
        if reading != self.reading {
            self.last_refresh = Some(now);
            self.reading = reading;
        }
        reading
    }

    /// Back to `Idle` with an empty buffer, e.g. after the finger was lifted.
    pub fn reset(&mut self) {
        if self.state != State::Idle {
            log::debug!("session reset after {} frames", self.frame_count);
        }
        self.samples.clear();
        self.timestamps.clear();
        self.state = State::Idle;
        self.frame_count = 0;
        self.recorded = false;
        self.last_estimate = None;
        self.last_refresh = None;
        self.last_peak_count = 0;
        self.reading = Reading::NotReady;
    }

    /// Wall-clock span covered by the buffered samples in seconds.
    ///
    /// `len` samples cover `len` frame intervals, so the span between the
    /// oldest and newest timestamp is scaled by `len / (len - 1)`.
    pub fn window_secs(&self) -> Option<f32> {
        let len = self.samples.num_valid();
        if let Some(rate) = self.config.nominal_frame_rate {
            return (len > 0).then(|| len as f32 / rate);
        }
        if len < 2 {
            return None;
        }
        let (oldest, newest) = (self.timestamps.oldest()?, self.timestamps.newest()?);
        let span = newest.saturating_sub(*oldest);
        if span.is_zero() {
            return None;
        }
        Some(span.as_secs_f32() * len as f32 / (len - 1) as f32)
    }

    fn estimate(&mut self) -> Reading {
        self.last_peak_count = 0;
        if !self.samples.is_full() {
            return Reading::NotReady;
        }
        let Some(window_secs) = self.window_secs() else {
            return Reading::NotReady;
        };

        let mut raw = [0.0; N];
        let raw = self.samples.snapshot(&mut raw);
        let mut smoothed = [0.0; N];
        let smoothed = &mut smoothed[..raw.len()];
        smooth_into(raw, self.config.smoothing_window, smoothed);

        let beats = count_peaks(smoothed, self.config.prominence_threshold);
        self.last_peak_count = beats;

        let bpm = BPM::from_beats(beats, window_secs);
        log::trace!(
            "{} peaks in {:.2}s window -> {:?}",
            beats,
            window_secs,
            bpm
        );
        bpm.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FPS: f32 = 30.0;

    fn frame_time(i: usize) -> Duration {
        Duration::from_secs_f32(i as f32 / FPS)
    }

    /// Normalized red intensity of a pulse at `bpm`.
    fn pulse(i: usize, bpm: f32) -> f32 {
        let t = i as f32 / FPS;
        (180.0 + 30.0 * (t * bpm / 60.0 * core::f32::consts::TAU).sin()) / 255.0
    }

    fn session(config: Config) -> Session<100> {
        Session::new(config).unwrap()
    }

    fn feed(s: &mut Session<100>, range: core::ops::Range<usize>, bpm: f32) {
        for i in range {
            s.on_new_sample(pulse(i, bpm), frame_time(i));
        }
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = Config {
            smoothing_window: 100,
            ..Config::default()
        };
        assert!(matches!(
            Session::<100>::new(config),
            Err(ConfigError::SmoothingWindowTooLarge { .. })
        ));
        assert!(matches!(
            Session::<2>::new(Config {
                smoothing_window: 1,
                ..Config::default()
            }),
            Err(ConfigError::CapacityTooSmall { capacity: 2 })
        ));
    }

    #[test]
    fn test_state_transitions() {
        let mut s = session(Config::default());
        assert_eq!(s.state(), State::Idle);
        assert!(!s.recorded());

        feed(&mut s, 0..1, 75.0);
        assert_eq!(s.state(), State::Accumulating);

        feed(&mut s, 1..99, 75.0);
        assert_eq!(s.state(), State::Accumulating);
        assert_eq!(s.compute_heart_rate(frame_time(99)), Reading::NotReady);
        assert_eq!(s.last_estimate(), None);

        feed(&mut s, 99..100, 75.0);
        assert_eq!(s.state(), State::Stable);
        assert!(s.recorded());

        s.reset();
        assert_eq!(s.state(), State::Idle);
        assert!(!s.recorded());
        assert_eq!(s.frame_count(), 0);
        assert!(s.samples().is_empty());
        assert_eq!(s.reading(), Reading::NotReady);
    }

    #[test]
    fn test_rate_matches_peak_formula() {
        let mut s = session(Config {
            nominal_frame_rate: Some(FPS),
            ..Config::default()
        });
        feed(&mut s, 0..130, 75.0);

        let mut raw = [0.0; 100];
        let raw = s.samples().snapshot(&mut raw);
        let mut smoothed = [0.0; 100];
        smooth_into(raw, 5, &mut smoothed);
        let beats = count_peaks(&smoothed, 0.05);
        assert!(beats > 0);

        let window_secs = 100.0 / FPS;
        let expected = beats as f32 * 60.0 / window_secs;
        assert_eq!(
            s.compute_heart_rate(frame_time(130)),
            Reading::Bpm(BPM(expected))
        );
        assert_eq!(s.last_peak_count(), beats);
    }

    #[test]
    fn test_stable_but_not_full_is_not_ready() {
        let mut s = session(Config {
            frames_captured_threshold: 10,
            ..Config::default()
        });
        feed(&mut s, 0..50, 75.0);
        assert_eq!(s.state(), State::Stable);
        assert_eq!(s.compute_heart_rate(frame_time(50)), Reading::NotReady);
        assert_eq!(s.last_estimate(), Some(frame_time(50)));
    }

    #[test]
    fn test_debounce() {
        let mut s = session(Config::default());
        feed(&mut s, 0..100, 75.0);

        let t0 = Duration::from_secs(10);
        let first = s.compute_heart_rate(t0);
        assert!(first.is_ready());
        assert_eq!(s.last_refresh(), Some(t0));

        // a flat signal would be NotReady, but the cache still answers
        for i in 100..200 {
            s.on_new_sample(0.5, frame_time(i));
        }
        assert_eq!(s.compute_heart_rate(t0 + Duration::from_millis(500)), first);
        assert_eq!(s.compute_heart_rate(t0 + Duration::from_millis(999)), first);
        assert_eq!(s.last_estimate(), Some(t0));

        let t1 = t0 + Duration::from_millis(1000);
        assert_eq!(s.compute_heart_rate(t1), Reading::NotReady);
        assert_eq!(s.last_estimate(), Some(t1));
        assert_eq!(s.last_refresh(), Some(t1));
    }

    #[test]
    fn test_zero_window_is_not_ready() {
        let mut s = session(Config::default());
        for i in 0..100 {
            s.on_new_sample(pulse(i, 75.0), Duration::from_secs(1));
        }
        assert_eq!(s.window_secs(), None);
        assert_eq!(s.compute_heart_rate(Duration::from_secs(2)), Reading::NotReady);
    }

    #[test]
    fn test_drops_non_finite_samples() {
        let mut s = session(Config::default());
        s.on_new_sample(f32::NAN, Duration::ZERO);
        s.on_new_sample(f32::INFINITY, Duration::ZERO);
        assert_eq!(s.state(), State::Idle);
        assert_eq!(s.frame_count(), 0);
    }

    #[test]
    fn test_window_from_timestamps() {
        let mut s = session(Config::default());
        for i in 0..100 {
            s.on_new_sample(0.5, Duration::from_millis(i * 40));
        }
        // 99 intervals of 40ms between oldest and newest, 100 frames covered
        let window = s.window_secs().unwrap();
        assert!((window - 4.0).abs() < 1e-4, "{}", window);
    }
}
