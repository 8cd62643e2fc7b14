//! Prominence based peak detection.
//!
//! A candidate is a local maximum: a sample strictly above both neighbours, or
//! a run of equal samples with strictly lower samples on both sides (reported
//! at the first index of the run). The ends of the sequence are never
//! candidates.
//!
//! Prominence is measured per flank: walk outward from the candidate until a
//! strictly higher sample or the end of the sequence, and take the lowest
//! sample passed as that flank's base. The prominence is the candidate value
//! minus the higher of the two bases. Small wiggles on the slope of a real
//! pulse end their flank at the pulse itself and therefore stay shallow.

#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Peak {
    pub index: usize,
    pub prominence: f32,
}

/// Iterator over the peaks of a sequence whose prominence reaches a threshold.
pub struct Peaks<'a> {
    values: &'a [f32],
    threshold: f32,
    pos: usize,
}

/// Peaks of `values` with a prominence of at least `threshold`, in index order.
pub fn peaks(values: &[f32], threshold: f32) -> Peaks<'_> {
    Peaks {
        values,
        threshold,
        pos: 1,
    }
}

pub fn count_peaks(values: &[f32], threshold: f32) -> usize {
    peaks(values, threshold).count()
}

impl Peaks<'_> {
    /// Next local maximum as the inclusive index range of its plateau.
    fn next_candidate(&mut self) -> Option<(usize, usize)> {
        let v = self.values;
        while self.pos + 1 < v.len() {
            let begin = self.pos;
            if v[begin] > v[begin - 1] {
                let mut end = begin;
                while end + 1 < v.len() && v[end + 1] == v[begin] {
                    end += 1;
                }
                self.pos = end + 1;
                if end + 1 < v.len() && v[end + 1] < v[begin] {
                    return Some((begin, end));
                }
            } else {
                self.pos += 1;
            }
        }
        None
    }
}

fn flank_base<'a>(flank: impl Iterator<Item = &'a f32>, peak: f32) -> f32 {
    let mut base = peak;
    for &v in flank {
        if v > peak {
            break;
        }
        if v < base {
            base = v;
        }
    }
    base
}

fn prominence(values: &[f32], begin: usize, end: usize) -> f32 {
    let peak = values[begin];
    let left = flank_base(values[..begin].iter().rev(), peak);
    let right = flank_base(values[end + 1..].iter(), peak);
    peak - left.max(right)
}

impl Iterator for Peaks<'_> {
    type Item = Peak;

    fn next(&mut self) -> Option<Peak> {
        while let Some((begin, end)) = self.next_candidate() {
            let prominence = prominence(self.values, begin, end);
            if prominence >= self.threshold {
                return Some(Peak {
                    index: begin,
                    prominence,
                });
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indices(values: &[f32], threshold: f32) -> Vec<usize> {
        peaks(values, threshold).map(|p| p.index).collect()
    }

    fn sine(periods: usize, samples_per_period: usize) -> Vec<f32> {
        (0..periods * samples_per_period)
            .map(|i| {
                let phase = i as f32 / samples_per_period as f32;
                (phase * core::f32::consts::TAU).sin()
            })
            .collect()
    }

    /// Deterministic noise in `-amplitude..amplitude`.
    fn noise(i: usize, amplitude: f32) -> f32 {
        let h = (i * 7919 + 13) % 101;
        (h as f32 / 100.0 * 2.0 - 1.0) * amplitude
    }

    #[test]
    fn test_short_sequences() {
        assert_eq!(count_peaks(&[], 0.0), 0);
        assert_eq!(count_peaks(&[1.0], 0.0), 0);
        assert_eq!(count_peaks(&[0.0, 1.0], 0.0), 0);
        assert_eq!(count_peaks(&[1.0, 0.0], 0.0), 0);
    }

    #[test]
    fn test_degenerate_sequences() {
        assert_eq!(count_peaks(&[0.5; 100], 0.0), 0);
        let rising = (0..50).map(|i| i as f32).collect::<Vec<_>>();
        assert_eq!(count_peaks(&rising, 0.0), 0);
        let falling = (0..50).map(|i| -(i as f32)).collect::<Vec<_>>();
        assert_eq!(count_peaks(&falling, 0.0), 0);
    }

    #[test]
    fn test_single_peak() {
        let p = peaks(&[0.0, 1.0, 0.0], 0.5).collect::<Vec<_>>();
        assert_eq!(
            p,
            [Peak {
                index: 1,
                prominence: 1.0
            }]
        );
    }

    #[test]
    fn test_plateau_counts_once_at_first_index() {
        assert_eq!(indices(&[0.0, 2.0, 2.0, 2.0, 0.0], 1.0), [1]);
        // a plateau rising into a higher sample is a shoulder, not a peak
        assert_eq!(indices(&[0.0, 2.0, 2.0, 3.0, 0.0], 0.0), [3]);
        // a plateau at the end has no lower right neighbour
        assert_eq!(indices(&[0.0, 2.0, 2.0], 0.0), Vec::<usize>::new());
    }

    #[test]
    fn test_prominence_uses_higher_base() {
        let values = [0.0, 5.0, 3.0, 4.0, 1.0];
        let p = peaks(&values, 0.0).collect::<Vec<_>>();
        assert_eq!(
            p,
            [
                // left base 0, right flank never exceeds 5 and bottoms at 1
                Peak {
                    index: 1,
                    prominence: 4.0
                },
                // left flank stops at 5 with base 3, right base 1
                Peak {
                    index: 3,
                    prominence: 1.0
                },
            ]
        );
        assert_eq!(indices(&values, 1.0), [1, 3]);
        assert_eq!(indices(&values, 2.0), [1]);
    }

    #[test]
    fn test_notch_on_slope_keeps_peak() {
        // the notch at 2 is the nearest minimum right of the pulse, but the
        // flank keeps going down to 0
        let values = [0.0, 5.0, 4.9, 4.95, 0.0];
        assert_eq!(
            peaks(&values, 0.5).collect::<Vec<_>>(),
            [Peak {
                index: 1,
                prominence: 5.0
            }]
        );
    }

    #[test]
    fn test_boundary_acts_as_base() {
        // nothing on the left goes below 2, so the boundary sample is the base
        assert_eq!(
            peaks(&[2.0, 3.0, -1.0], 0.0).next(),
            Some(Peak {
                index: 1,
                prominence: 1.0
            })
        );
    }

    #[test]
    fn test_sine_periods() {
        for k in 1..6 {
            assert_eq!(count_peaks(&sine(k, 20), 0.5), k);
        }
    }

    #[test]
    fn test_sine_with_noise_below_threshold() {
        // peak-to-peak noise of 0.16 stays below the threshold
        let threshold = 0.2;
        let noisy = sine(5, 20)
            .into_iter()
            .enumerate()
            .map(|(i, v)| v + noise(i, 0.08))
            .collect::<Vec<_>>();
        assert_eq!(count_peaks(&noisy, threshold), 5);
        for p in peaks(&noisy, threshold) {
            assert!(p.prominence > 0.8, "{:?}", p);
        }
    }

    #[test]
    fn test_nan_is_never_a_peak() {
        assert_eq!(count_peaks(&[0.0, f32::NAN, 0.0], 0.0), 0);
    }
}
