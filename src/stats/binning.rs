// Delay binning after a reference event
//
// Delays (seconds since the event start) are partitioned into fixed-width
// bins inside a fixed analysis window. The last bin has no upper bound so the
// sparse tail after the window is pooled instead of dropped.

use super::error::{Result, StatsError};
use super::estimator::{AveragingMethod, Estimate};
use serde::{Deserialize, Serialize};

/// Default analysis window after the event (hours)
pub const DEFAULT_WINDOW_HOURS: u32 = 5;

/// Default bin width (minutes)
pub const DEFAULT_BIN_SIZE_MINUTES: u32 = 10;

/// Binning parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BinningConfig {
    /// Width of each delay bin in minutes
    pub bin_size_minutes: u32,
    /// Window covered by the bins, in hours
    pub window_hours: u32,
    /// Bins with fewer finite samples than this are marked undefined (0 disables)
    pub min_samples: usize,
    /// Estimator used for the bin center and spread
    pub method: AveragingMethod,
}

impl Default for BinningConfig {
    fn default() -> Self {
        Self {
            bin_size_minutes: DEFAULT_BIN_SIZE_MINUTES,
            window_hours: DEFAULT_WINDOW_HOURS,
            min_samples: 0,
            method: AveragingMethod::Peak,
        }
    }
}

impl BinningConfig {
    /// Validate configuration
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.bin_size_minutes == 0 {
            return Err("bin_size_minutes must be positive".to_string());
        }
        if self.window_hours == 0 {
            return Err("window_hours must be positive".to_string());
        }
        Ok(())
    }

    fn bin_width_seconds(&self) -> f64 {
        f64::from(self.bin_size_minutes) * 60.0
    }

    /// Number of bins in the window, i.e. the count of edges `k * width < window`
    pub fn bin_count(&self) -> usize {
        let window = u64::from(self.window_hours) * 3600;
        let width = u64::from(self.bin_size_minutes) * 60;
        window.div_ceil(width) as usize
    }
}

/// One delay bin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DelayBin {
    /// Lower edge in seconds after the event
    pub lower: f64,
    /// Upper edge in seconds, `None` for the open-ended last bin
    pub upper: Option<f64>,
    pub estimate: Estimate,
    /// Finite samples that fell in the bin (0 when the bin had fewer than 2 samples)
    pub count: usize,
}

impl DelayBin {
    pub fn contains(&self, delay: f64) -> bool {
        delay >= self.lower && self.upper.map_or(true, |upper| delay < upper)
    }

    pub fn is_defined(&self) -> bool {
        self.estimate.is_defined()
    }
}

/// Partitions (delay, value) samples into delay bins
#[derive(Debug, Clone, Default)]
pub struct DelayBinner {
    config: BinningConfig,
}

impl DelayBinner {
    pub fn new(config: BinningConfig) -> Self {
        Self { config }
    }

    /// Empty bins with edges laid out for this configuration
    fn edges(&self) -> Vec<DelayBin> {
        let width = self.config.bin_width_seconds();
        let n = self.config.bin_count();
        (0..n)
            .map(|k| {
                let lower = k as f64 * width;
                DelayBin {
                    lower,
                    upper: (k + 1 < n).then_some(lower + width),
                    estimate: Estimate::UNDEFINED,
                    count: 0,
                }
            })
            .collect()
    }

    /// Bin `values` by `delay` and summarize each bin
    ///
    /// Bins with fewer than two samples are undefined with count 0. Domain
    /// errors from the estimator (e.g. a non-positive value under `peak`)
    /// are returned to the caller.
    ///
    /// # Example
    /// ```
    /// use chorus_delay::stats::{AveragingMethod, BinningConfig, DelayBinner};
    ///
    /// let binner = DelayBinner::new(BinningConfig {
    ///     method: AveragingMethod::Median,
    ///     ..BinningConfig::default()
    /// });
    /// let bins = binner.bin(&[10.0, 20.0, 30.0], &[1.0, 2.0, 3.0]).unwrap();
    /// assert_eq!(bins.len(), 30);
    /// assert_eq!(bins[0].estimate.center, 2.0);
    /// assert_eq!(bins[0].count, 3);
    /// ```
    pub fn bin(&self, delay: &[f64], value: &[f64]) -> Result<Vec<DelayBin>> {
        self.config.validate().map_err(StatsError::InvalidParameter)?;

        if delay.len() != value.len() {
            return Err(StatsError::LengthMismatch {
                left: delay.len(),
                right: value.len(),
            });
        }

        let mut bins = self.edges();

        for bin in &mut bins {
            let selected: Vec<f64> = delay
                .iter()
                .zip(value)
                .filter(|(d, _)| bin.contains(**d))
                .map(|(_, v)| *v)
                .collect();

            if selected.len() < 2 {
                continue;
            }

            bin.count = selected.iter().filter(|v| v.is_finite()).count();
            if bin.count < self.config.min_samples {
                continue;
            }

            bin.estimate = match self.config.method.estimate(&selected) {
                Ok(estimate) => estimate,
                Err(e) if e.is_insufficient_data() => Estimate::UNDEFINED,
                Err(e) => return Err(e),
            };
        }

        Ok(bins)
    }
}
