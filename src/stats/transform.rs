// Log-log normalization of skewed, strictly positive distributions
//
// Chorus power spans many decades and stays skewed after a single log10.
// Shifting the first log above 1 and taking a second log10 gives a
// distribution that is close enough to normal for a Gaussian fit.

use super::error::{Result, StatsError};

/// Forward/inverse log-log transform
///
/// # Example
/// ```
/// use chorus_delay::stats::DistributionTransform;
///
/// let (y, scale) = DistributionTransform::forward(&[1e-6, 1e-4, 1e-2]).unwrap();
/// assert_eq!(y.len(), 3);
/// let back = DistributionTransform::inverse(y[1], scale);
/// assert!((back - 1e-4).abs() / 1e-4 < 1e-9);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct DistributionTransform;

impl DistributionTransform {
    /// Transform `values` into log-log space
    ///
    /// Returns the transformed values and the shift `scale = |min(log10 x)| + 1`
    /// needed by [`DistributionTransform::inverse`].
    pub fn forward(values: &[f64]) -> Result<(Vec<f64>, f64)> {
        if values.is_empty() {
            return Err(StatsError::InsufficientData {
                required: 1,
                actual: 0,
            });
        }

        if let Some(bad) = values.iter().find(|v| !(v.is_finite() && **v > 0.0)) {
            return Err(StatsError::Domain(format!(
                "log-log transform requires finite values > 0, got {}",
                bad
            )));
        }

        let logs: Vec<f64> = values.iter().map(|v| v.log10()).collect();
        let min = logs.iter().copied().fold(f64::INFINITY, f64::min);
        let scale = min.abs() + 1.0;

        let transformed = logs.iter().map(|d| (d + scale).log10()).collect();
        Ok((transformed, scale))
    }

    /// Map a scalar from log-log space back to the original units
    pub fn inverse(value: f64, scale: f64) -> f64 {
        10f64.powf(10f64.powf(value) - scale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_scale_uses_smallest_log() {
        let (_, scale) = DistributionTransform::forward(&[1e-8, 1e-3, 10.0]).unwrap();
        assert!((scale - 9.0).abs() < 1e-12);
    }

    #[test]
    fn test_forward_values_positive() {
        let (y, _) = DistributionTransform::forward(&[1e-8, 1e-3, 10.0]).unwrap();
        // Smallest element maps to log10(1) = 0
        assert!(y[0].abs() < 1e-12);
        assert!(y.iter().all(|v| *v >= 0.0));
    }

    #[test]
    fn test_round_trip_every_element() {
        let values = [3.2e-9, 4.1e-7, 1.0, 250.0];
        let (y, scale) = DistributionTransform::forward(&values).unwrap();
        for (orig, t) in values.iter().zip(&y) {
            let back = DistributionTransform::inverse(*t, scale);
            assert!(
                ((back - orig) / orig).abs() < 1e-9,
                "{} round-tripped to {}",
                orig,
                back
            );
        }
    }

    #[test]
    fn test_rejects_zero() {
        let err = DistributionTransform::forward(&[1.0, 0.0]).unwrap_err();
        assert!(matches!(err, StatsError::Domain(_)));
    }

    #[test]
    fn test_rejects_negative_and_nan() {
        assert!(DistributionTransform::forward(&[-1.0, 2.0]).is_err());
        assert!(DistributionTransform::forward(&[f64::NAN, 2.0]).is_err());
    }

    #[test]
    fn test_rejects_empty() {
        assert!(DistributionTransform::forward(&[]).is_err());
    }
}
