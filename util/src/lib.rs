#![cfg_attr(not(test), no_std)]

mod countdown;

pub use countdown::{Countdown, COUNTDOWN_TEXT_LEN};

/// Fixed-capacity circular store. Once `N` values have been added, every
/// further value overwrites the oldest one.
pub struct RingBuffer<const N: usize, T> {
    ring_buffer: [T; N],
    next: usize,
    num_total: usize,
}

impl<const N: usize, T: Default> Default for RingBuffer<N, T> {
    fn default() -> Self {
        Self {
            ring_buffer: core::array::from_fn(|_| Default::default()),
            next: 0,
            num_total: 0,
        }
    }
}

impl<const N: usize, T> RingBuffer<N, T> {
    pub const CAPACITY: usize = N;

    /// Stores `v` at the write cursor and returns the value it displaced.
    pub fn add(&mut self, mut v: T) -> T {
        self.num_total += 1;

        core::mem::swap(&mut self.ring_buffer[self.next], &mut v);
        self.next = (self.next + 1) % N;

        v
    }

    pub fn push(&mut self, v: T) {
        let _ = self.add(v);
    }

    /// `past_value(1)` is the newest value, `past_value(num_valid())` the oldest.
    pub fn past_value(&self, diff: usize) -> Option<&T> {
        if diff == 0 || diff > self.num_valid() {
            return None;
        }
        let i = (self.next + N - diff) % N;
        Some(&self.ring_buffer[i])
    }

    pub fn newest(&self) -> Option<&T> {
        self.past_value(1)
    }

    pub fn oldest(&self) -> Option<&T> {
        self.past_value(self.num_valid())
    }

    pub fn num_valid(&self) -> usize {
        self.num_total.min(N)
    }

    /// Number of values added since construction or the last `clear`,
    /// including overwritten ones.
    pub fn num_total(&self) -> usize {
        self.num_total
    }

    pub fn is_empty(&self) -> bool {
        self.num_total == 0
    }

    pub fn is_full(&self) -> bool {
        self.num_valid() == N
    }

    pub fn next(&self) -> usize {
        self.next
    }

    /// Valid values split at the wraparound point, oldest first.
    pub fn as_slices(&self) -> (&[T], &[T]) {
        if self.num_total < N {
            (&self.ring_buffer[..self.next], &[])
        } else {
            let (newer, older) = self.ring_buffer.split_at(self.next);
            (older, newer)
        }
    }

    /// Valid values in arrival order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &T> + '_ {
        let (first, second) = self.as_slices();
        first.iter().chain(second.iter())
    }

    /// Forgets all values. Storage is kept and overwritten by later adds.
    pub fn clear(&mut self) {
        self.next = 0;
        self.num_total = 0;
    }
}

impl<const N: usize, T: Copy> RingBuffer<N, T> {
    /// Copies the valid values into `out` in arrival order and returns the
    /// filled prefix.
    pub fn snapshot<'a>(&self, out: &'a mut [T; N]) -> &'a [T] {
        let (first, second) = self.as_slices();
        out[..first.len()].copy_from_slice(first);
        out[first.len()..first.len() + second.len()].copy_from_slice(second);
        &out[..self.num_valid()]
    }
}
