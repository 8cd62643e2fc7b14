//! Centered moving average used as a low-pass in front of the peak detector.
//!
//! Per-frame brightness carries flicker noise well above pulse frequencies
//! (roughly 0.7 Hz to 3 Hz). Averaging a handful of neighbouring frames keeps
//! the pulse oscillation and removes most of that noise.

/// Writes the moving average of `input` over `window` samples into `output`.
///
/// The window around index `i` covers `i - (window - 1) / 2 ..= i + window / 2`.
/// Near the ends of the sequence only the samples that exist are averaged, so
/// the edges are neither padded with zeros nor shortened. A window of 0 is
/// treated like 1, which copies the input.
pub fn smooth_into(input: &[f32], window: usize, output: &mut [f32]) {
    assert_eq!(input.len(), output.len());

    let window = window.max(1);
    let before = (window - 1) / 2;
    let after = window / 2;

    for (i, out) in output.iter_mut().enumerate() {
        let begin = i.saturating_sub(before);
        let end = (i + after + 1).min(input.len());
        let span = &input[begin..end];
        *out = span.iter().sum::<f32>() / span.len() as f32;
    }
}
