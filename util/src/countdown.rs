use arrform::{arrform, ArrForm};
use core::time::Duration;

/// Longest countdown text: 20 digits of `u64` seconds, `:` and hundredths.
pub const COUNTDOWN_TEXT_LEN: usize = 24;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum State {
    Stopped,
    Running { since: Duration },
}

/// Recording stopwatch counting down from a fixed total. Times are
/// offsets from an arbitrary epoch shared by all calls.
#[derive(Copy, Clone, Debug)]
pub struct Countdown {
    total: Duration,
    state: State,
}

impl Countdown {
    pub const fn new(total: Duration) -> Self {
        Self {
            total,
            state: State::Stopped,
        }
    }

    pub fn start(&mut self, now: Duration) {
        self.state = State::Running { since: now };
    }

    pub fn stop(&mut self) {
        self.state = State::Stopped;
    }

    pub fn is_running(&self) -> bool {
        matches!(self.state, State::Running { .. })
    }

    pub fn total(&self) -> Duration {
        self.total
    }

    /// A stopped countdown shows its full duration.
    pub fn remaining(&self, now: Duration) -> Duration {
        match self.state {
            State::Stopped => self.total,
            State::Running { since } => self.total.saturating_sub(now.saturating_sub(since)),
        }
    }

    pub fn is_finished(&self, now: Duration) -> bool {
        self.is_running() && self.remaining(now).is_zero()
    }

    /// Remaining time as `SS:hh` (seconds, hundredths). Sized for any
    /// `Duration`, seconds widen past two digits.
    pub fn text(&self, now: Duration) -> ArrForm<COUNTDOWN_TEXT_LEN> {
        let remaining = self.remaining(now);
        arrform!(
            COUNTDOWN_TEXT_LEN,
            "{:0>2}:{:0>2}",
            remaining.as_secs(),
            (remaining.as_millis() / 10) % 100,
        )
    }
}
