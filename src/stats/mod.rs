// Robust statistics for delay-binned chorus power
//
// Chorus power is strictly positive and spans many decades, so the summary
// statistics here are built to cope with heavy right tails:
// - medians with half-medians as quartile estimates
// - geometric means with geometric standard deviations
// - a log-log-normal fit ("peak") whose error band is mapped back through the
//   nonlinear transform and therefore comes out asymmetric
//
// Delay binning partitions samples by seconds since the start of a quiet
// period; the bootstrap slope error quantifies trends across those bins.

mod binning;
mod bootstrap;
mod error;
mod estimator;
mod transform;

pub use binning::{
    BinningConfig, DelayBin, DelayBinner, DEFAULT_BIN_SIZE_MINUTES, DEFAULT_WINDOW_HOURS,
};
pub use bootstrap::{linear_regression, slope_stderr, slope_stderr_with_rng, LinearFit};
pub use error::{Result, StatsError};
pub use estimator::{mean_std, nan_median, AveragingMethod, Estimate};
pub use transform::DistributionTransform;
