// Robust central-value estimators
//
// One strategy call per distribution returns the center together with the
// spread that belongs to that estimator, so binning never has to recompute
// quartiles or standard deviations on the side.

use super::error::{Result, StatsError};
use super::transform::DistributionTransform;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Center plus an asymmetric low/high band
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub center: f64,
    pub low: f64,
    pub high: f64,
}

impl Estimate {
    /// The "undefined" marker used for empty or gated bins
    pub const UNDEFINED: Estimate = Estimate {
        center: f64::NAN,
        low: f64::NAN,
        high: f64::NAN,
    };

    pub fn is_defined(&self) -> bool {
        self.center.is_finite()
    }
}

/// Averaging method used to summarize a distribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AveragingMethod {
    /// Median with the medians of the lower and upper halves
    Median,
    /// Arithmetic mean ± population standard deviation
    Mean,
    /// Geometric mean ÷/× geometric standard deviation
    Gmean,
    /// Mode of a log-log-normal fit with standard-error bars
    #[default]
    Peak,
}

impl fmt::Display for AveragingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AveragingMethod::Median => "median",
            AveragingMethod::Mean => "mean",
            AveragingMethod::Gmean => "gmean",
            AveragingMethod::Peak => "peak",
        };
        f.write_str(name)
    }
}

impl AveragingMethod {
    /// Summarize `values` with this method
    ///
    /// Every method needs at least two samples.
    ///
    /// # Example
    /// ```
    /// use chorus_delay::stats::AveragingMethod;
    ///
    /// let est = AveragingMethod::Mean.estimate(&[1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
    /// assert_eq!(est.center, 3.0);
    /// assert!((est.high - est.center - 2f64.sqrt()).abs() < 1e-12);
    /// ```
    pub fn estimate(&self, values: &[f64]) -> Result<Estimate> {
        if values.len() < 2 {
            return Err(StatsError::InsufficientData {
                required: 2,
                actual: values.len(),
            });
        }

        match self {
            AveragingMethod::Median => Ok(median_estimate(values)),
            AveragingMethod::Mean => Ok(mean_estimate(values)),
            AveragingMethod::Gmean => gmean_estimate(values),
            AveragingMethod::Peak => peak_estimate(values),
        }
    }
}

/// Median of the non-NaN values, NaN when none remain
pub fn nan_median(values: &[f64]) -> f64 {
    let mut sorted: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if sorted.is_empty() {
        return f64::NAN;
    }
    sorted.sort_by(|a, b| a.total_cmp(b));

    let n = sorted.len();
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}

/// Mean and population standard deviation (ddof = 0)
pub fn mean_std(values: &[f64]) -> (f64, f64) {
    if values.is_empty() {
        return (f64::NAN, f64::NAN);
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

fn median_estimate(values: &[f64]) -> Estimate {
    let center = nan_median(values);

    let below: Vec<f64> = values.iter().copied().filter(|v| *v < center).collect();
    let above: Vec<f64> = values.iter().copied().filter(|v| *v > center).collect();

    Estimate {
        center,
        low: nan_median(&below),
        high: nan_median(&above),
    }
}

fn mean_estimate(values: &[f64]) -> Estimate {
    let finite: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    let (mean, std) = mean_std(&finite);

    Estimate {
        center: mean,
        low: mean - std,
        high: mean + std,
    }
}

fn ln_values(values: &[f64]) -> Result<Vec<f64>> {
    values
        .iter()
        .map(|v| {
            if v.is_finite() && *v > 0.0 {
                Ok(v.ln())
            } else {
                Err(StatsError::Domain(format!(
                    "geometric statistics require finite values > 0, got {}",
                    v
                )))
            }
        })
        .collect()
}

fn gmean_estimate(values: &[f64]) -> Result<Estimate> {
    let logs = ln_values(values)?;
    let n = logs.len() as f64;

    let log_mean = logs.iter().sum::<f64>() / n;
    // Geometric standard deviation uses the sample (ddof = 1) spread of the logs
    let log_var = logs.iter().map(|l| (l - log_mean).powi(2)).sum::<f64>() / (n - 1.0);

    let center = log_mean.exp();
    let gstd = log_var.sqrt().exp();

    Ok(Estimate {
        center,
        low: center / gstd,
        high: center * gstd,
    })
}

fn peak_estimate(values: &[f64]) -> Result<Estimate> {
    let (transformed, scale) = DistributionTransform::forward(values)?;

    // Maximum-likelihood normal fit: sample mean, population standard deviation
    let (mu, sigma) = mean_std(&transformed);
    let stderr = sigma / (transformed.len() as f64).sqrt();

    Ok(Estimate {
        center: DistributionTransform::inverse(mu, scale),
        low: DistributionTransform::inverse(mu - stderr, scale),
        high: DistributionTransform::inverse(mu + stderr, scale),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_METHODS: [AveragingMethod; 4] = [
        AveragingMethod::Median,
        AveragingMethod::Mean,
        AveragingMethod::Gmean,
        AveragingMethod::Peak,
    ];

    #[test]
    fn test_mean_one_to_five() {
        let est = AveragingMethod::Mean
            .estimate(&[1.0, 2.0, 3.0, 4.0, 5.0])
            .unwrap();
        assert_eq!(est.center, 3.0);
        assert!((est.low - (3.0 - std::f64::consts::SQRT_2)).abs() < 1e-12);
        assert!((est.high - (3.0 + std::f64::consts::SQRT_2)).abs() < 1e-12);
    }

    #[test]
    fn test_mean_ignores_nan() {
        let est = AveragingMethod::Mean
            .estimate(&[1.0, f64::NAN, 3.0])
            .unwrap();
        assert_eq!(est.center, 2.0);
        assert_eq!(est.high, 3.0);
    }

    #[test]
    fn test_median_uses_half_medians() {
        // Below 4: [1, 2, 3] -> 2. Above 4: [5, 6, 100] -> 6
        let est = AveragingMethod::Median
            .estimate(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 100.0])
            .unwrap();
        assert_eq!(est.center, 4.0);
        assert_eq!(est.low, 2.0);
        assert_eq!(est.high, 6.0);
    }

    #[test]
    fn test_median_even_length() {
        let est = AveragingMethod::Median
            .estimate(&[1.0, 2.0, 3.0, 4.0])
            .unwrap();
        assert_eq!(est.center, 2.5);
        assert_eq!(est.low, 1.5);
        assert_eq!(est.high, 3.5);
    }

    #[test]
    fn test_median_constant_has_undefined_spread() {
        let est = AveragingMethod::Median.estimate(&[7.0, 7.0, 7.0]).unwrap();
        assert_eq!(est.center, 7.0);
        assert!(est.low.is_nan());
        assert!(est.high.is_nan());
    }

    #[test]
    fn test_gmean_powers_of_ten() {
        let est = AveragingMethod::Gmean.estimate(&[1.0, 100.0]).unwrap();
        assert!((est.center - 10.0).abs() < 1e-9);

        // ln spread with ddof = 1: values ln1 = 0, ln100 = 4.605; std = 3.2567
        let gstd = (100f64.ln() / 2f64.sqrt()).exp();
        assert!((est.low - 10.0 / gstd).abs() < 1e-9);
        assert!((est.high - 10.0 * gstd).abs() < 1e-9);
    }

    #[test]
    fn test_gmean_rejects_non_positive() {
        let err = AveragingMethod::Gmean.estimate(&[1.0, 0.0]).unwrap_err();
        assert!(matches!(err, StatsError::Domain(_)));
    }

    #[test]
    fn test_peak_band_is_ordered() {
        let values = [2e-7, 5e-7, 1e-6, 3e-6, 8e-6, 4e-5, 1e-4];
        let est = AveragingMethod::Peak.estimate(&values).unwrap();
        assert!(est.low < est.center);
        assert!(est.center < est.high);
        assert!(est.center > 2e-7 && est.center < 1e-4);
    }

    #[test]
    fn test_peak_identical_values() {
        let est = AveragingMethod::Peak.estimate(&[1e-5, 1e-5, 1e-5]).unwrap();
        assert!((est.center - 1e-5).abs() / 1e-5 < 1e-9);
        assert_eq!(est.low, est.center);
        assert_eq!(est.high, est.center);
    }

    #[test]
    fn test_peak_rejects_negative() {
        let err = AveragingMethod::Peak.estimate(&[1.0, -2.0]).unwrap_err();
        assert!(matches!(err, StatsError::Domain(_)));
    }

    #[test]
    fn test_insufficient_data_every_method() {
        for method in ALL_METHODS {
            for values in [&[][..], &[1.0][..]] {
                let err = method.estimate(values).unwrap_err();
                assert!(
                    err.is_insufficient_data(),
                    "{} accepted {} samples",
                    method,
                    values.len()
                );
            }
        }
    }

    #[test]
    fn test_method_serde_names() {
        let json = serde_json::to_string(&AveragingMethod::Gmean).unwrap();
        assert_eq!(json, "\"gmean\"");
        let parsed: AveragingMethod = serde_json::from_str("\"peak\"").unwrap();
        assert_eq!(parsed, AveragingMethod::Peak);
    }
}
