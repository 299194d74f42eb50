// Bootstrap estimate of the uncertainty of a least-squares slope
//
// Resample (x, y) pairs with replacement, refit, and report the spread of the
// refitted slopes. Resamples whose x values are all identical have no defined
// slope and are left out of the spread.

use super::error::{Result, StatsError};
use super::estimator::mean_std;
use rand::Rng;

/// Ordinary least-squares fit `y = slope * x + intercept`
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

/// Fit a straight line by ordinary least squares
///
/// Returns `None` when `x` has no spread (vertical line).
pub fn linear_regression(x: &[f64], y: &[f64]) -> Result<Option<LinearFit>> {
    if x.len() != y.len() {
        return Err(StatsError::LengthMismatch {
            left: x.len(),
            right: y.len(),
        });
    }
    if x.len() < 2 {
        return Err(StatsError::InsufficientData {
            required: 2,
            actual: x.len(),
        });
    }

    let n = x.len() as f64;
    let x_mean = x.iter().sum::<f64>() / n;
    let y_mean = y.iter().sum::<f64>() / n;

    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - x_mean;
        sxx += dx * dx;
        sxy += dx * (yi - y_mean);
    }

    if sxx == 0.0 {
        return Ok(None);
    }

    let slope = sxy / sxx;
    Ok(Some(LinearFit {
        slope,
        intercept: y_mean - slope * x_mean,
    }))
}

/// Standard deviation of bootstrap-resampled regression slopes
///
/// Uses the thread-local RNG; see [`slope_stderr_with_rng`] for a seeded run.
pub fn slope_stderr(x: &[f64], y: &[f64], n_samples: usize) -> Result<f64> {
    slope_stderr_with_rng(x, y, n_samples, &mut rand::thread_rng())
}

/// Standard deviation of bootstrap-resampled regression slopes, explicit RNG
///
/// # Example
/// ```
/// use chorus_delay::stats::slope_stderr_with_rng;
/// use rand::{rngs::StdRng, SeedableRng};
///
/// let x = [0.0, 1.0, 2.0, 3.0, 4.0, 5.0];
/// let y = [0.1, 2.2, 3.9, 6.1, 8.2, 9.8];
/// let mut rng = StdRng::seed_from_u64(7);
/// let err = slope_stderr_with_rng(&x, &y, 500, &mut rng).unwrap();
/// assert!(err > 0.0 && err < 1.0);
/// ```
pub fn slope_stderr_with_rng<R: Rng>(
    x: &[f64],
    y: &[f64],
    n_samples: usize,
    rng: &mut R,
) -> Result<f64> {
    if x.len() != y.len() {
        return Err(StatsError::LengthMismatch {
            left: x.len(),
            right: y.len(),
        });
    }
    if x.len() < 2 {
        return Err(StatsError::InsufficientData {
            required: 2,
            actual: x.len(),
        });
    }
    if n_samples == 0 {
        return Err(StatsError::InvalidParameter(
            "n_samples must be at least 1".to_string(),
        ));
    }

    let n = x.len();
    let mut resampled_x = vec![0.0; n];
    let mut resampled_y = vec![0.0; n];
    let mut slopes = Vec::with_capacity(n_samples);

    for _ in 0..n_samples {
        for i in 0..n {
            let pick = rng.gen_range(0..n);
            resampled_x[i] = x[pick];
            resampled_y[i] = y[pick];
        }

        if let Some(fit) = linear_regression(&resampled_x, &resampled_y)? {
            slopes.push(fit.slope);
        }
    }

    if slopes.is_empty() {
        return Err(StatsError::InsufficientData {
            required: 1,
            actual: 0,
        });
    }

    let (_, std) = mean_std(&slopes);
    Ok(std)
}
