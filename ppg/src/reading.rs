use arrform::{arrform, ArrForm};
use core::fmt;
use core::sync::atomic::{AtomicU32, Ordering};

/// Heart rate in beats per minute. Always finite and positive.
#[derive(Copy, Clone, Debug, PartialEq, PartialOrd)]
pub struct BPM(pub f32);

impl BPM {
    /// Rate for `beats` peaks seen in a window of `window_secs` seconds.
    pub fn from_beats(beats: usize, window_secs: f32) -> Option<Self> {
        if beats == 0 || !(window_secs > 0.0) {
            return None;
        }
        let bpm = beats as f32 * 60.0 / window_secs;
        if bpm.is_finite() {
            Some(BPM(bpm))
        } else {
            None
        }
    }

    pub fn rounded(&self) -> u16 {
        libm::roundf(self.0) as u16
    }
}

/// What the display shows: a rate, or the placeholder while the signal is
/// missing, too short or flat.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub enum Reading {
    #[default]
    NotReady,
    Bpm(BPM),
}

pub const NOT_READY_TEXT: &str = "Not ready";

impl Reading {
    pub fn bpm(&self) -> Option<BPM> {
        match self {
            Reading::NotReady => None,
            Reading::Bpm(bpm) => Some(*bpm),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.bpm().is_some()
    }

    /// Display text as an owned fixed-capacity string.
    pub fn text(&self) -> ArrForm<16> {
        arrform!(16, "{}", self)
    }
}

impl From<Option<BPM>> for Reading {
    fn from(bpm: Option<BPM>) -> Self {
        bpm.map_or(Reading::NotReady, Reading::Bpm)
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::NotReady => f.write_str(NOT_READY_TEXT),
            Reading::Bpm(bpm) => write!(f, "{} BPM", bpm.rounded()),
        }
    }
}

// Quiet NaN, never produced by `BPM::from_beats`.
const NOT_READY_BITS: u32 = 0x7fc0_0000;

/// Single-slot handoff of the latest reading from the frame thread to a
/// display thread.
pub struct ReadingCell {
    bits: AtomicU32,
}

impl Default for ReadingCell {
    fn default() -> Self {
        Self::new()
    }
}

impl ReadingCell {
    pub const fn new() -> Self {
        Self {
            bits: AtomicU32::new(NOT_READY_BITS),
        }
    }

    pub fn publish(&self, reading: Reading) {
        let bits = match reading {
            Reading::NotReady => NOT_READY_BITS,
            Reading::Bpm(BPM(v)) => v.to_bits(),
        };
        self.bits.store(bits, Ordering::Release);
    }

    pub fn load(&self) -> Reading {
        let v = f32::from_bits(self.bits.load(Ordering::Acquire));
        if v.is_nan() {
            Reading::NotReady
        } else {
            Reading::Bpm(BPM(v))
        }
    }
}
