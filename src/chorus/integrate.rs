//! Composite Simpson's rule over non-uniformly spaced samples
//!
//! Pairs of intervals are integrated with the parabola through their three
//! points. With an even number of samples the final interval is closed with
//! Cartwright's correction (the parabola through the last three points,
//! integrated over the last interval only). Two samples fall back to the
//! trapezoid.

/// Integrate `y` over `x` with Simpson's rule
///
/// Returns `None` for fewer than two points or mismatched lengths.
///
/// # Example
/// ```
/// use chorus_delay::chorus::simpson;
///
/// let x = [0.0, 0.5, 2.0, 3.0, 4.0];
/// let y: Vec<f64> = x.iter().map(|v| v * v).collect();
/// let area = simpson(&y, &x).unwrap();
/// assert!((area - 64.0 / 3.0).abs() < 1e-9);
/// ```
pub fn simpson(y: &[f64], x: &[f64]) -> Option<f64> {
    let n = y.len();
    if n != x.len() || n < 2 {
        return None;
    }

    if n == 2 {
        return Some(0.5 * (x[1] - x[0]) * (y[0] + y[1]));
    }

    if n % 2 == 1 {
        return Some(simpson_pairs(y, x, n - 1));
    }

    // Even count: Simpson over the first n - 1 points, correction on the last interval
    let mut result = simpson_pairs(y, x, n - 2);

    let h0 = x[n - 2] - x[n - 3];
    let h1 = x[n - 1] - x[n - 2];
    let alpha = (2.0 * h1 * h1 + 3.0 * h0 * h1) / (6.0 * (h0 + h1));
    let beta = (h1 * h1 + 3.0 * h0 * h1) / (6.0 * h0);
    let eta = h1 * h1 * h1 / (6.0 * h0 * (h0 + h1));

    result += alpha * y[n - 1] + beta * y[n - 2] - eta * y[n - 3];
    Some(result)
}

/// Sum of parabolic panels over `x[0..=last]`; `last` must be even
fn simpson_pairs(y: &[f64], x: &[f64], last: usize) -> f64 {
    (0..last)
        .step_by(2)
        .map(|i| {
            let h0 = x[i + 1] - x[i];
            let h1 = x[i + 2] - x[i + 1];
            let hsum = h0 + h1;
            let hprod = h0 * h1;
            let ratio = h0 / h1;
            hsum / 6.0
                * (y[i] * (2.0 - 1.0 / ratio)
                    + y[i + 1] * (hsum * hsum / hprod)
                    + y[i + 2] * (2.0 - ratio))
        })
        .sum()
}
