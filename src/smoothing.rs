//! Centered running mean with reflected edges
//!
//! Output `i` averages the `window` samples starting at `i - window / 2`.
//! Indices past either end are mirrored back into the series
//! (`-1 -> 0`, `-2 -> 1`, `n -> n - 1`), so the output has the input's length.

/// Smooth `values` with a centered moving average of `window` samples
///
/// A window of 0 or 1 returns the input unchanged. NaN propagates to every
/// output whose window touches it.
///
/// # Example
/// ```
/// use chorus_delay::smoothing::running_mean;
///
/// let smoothed = running_mean(&[0.0, 3.0, 6.0], 3);
/// assert_eq!(smoothed, vec![1.0, 3.0, 5.0]);
/// ```
pub fn running_mean(values: &[f64], window: usize) -> Vec<f64> {
    let n = values.len();
    if window <= 1 || n == 0 {
        return values.to_vec();
    }

    let left = (window / 2) as isize;
    let right = (window - window / 2 - 1) as isize;
    let scale = 1.0 / window as f64;

    (0..n as isize)
        .map(|i| {
            let sum: f64 = (i - left..=i + right)
                .map(|j| values[reflect(j, n)])
                .sum();
            sum * scale
        })
        .collect()
}

/// Map any index onto `0..n` by mirroring at both ends
fn reflect(index: isize, n: usize) -> usize {
    let period = 2 * n as isize;
    let m = index.rem_euclid(period) as usize;
    if m < n {
        m
    } else {
        2 * n - 1 - m
    }
}
