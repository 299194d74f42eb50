//! Binned chorus series ready for plotting
//!
//! Combined, lower-band and upper-band power of one field component are
//! masked independently and binned by delay with the same configuration.

use crate::chorus::select;
use crate::flatten::{AnalysisData, Component};
use crate::models::{nan_as_null, LengthMismatch};
use crate::stats::{
    linear_regression, slope_stderr, BinningConfig, DelayBin, DelayBinner, StatsError,
};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlotError {
    #[error(transparent)]
    Stats(#[from] StatsError),

    #[error(transparent)]
    LengthMismatch(#[from] LengthMismatch),
}

/// Location constraints defining "good" samples; unset bounds are open
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocationFilter {
    pub min_l: Option<f64>,
    pub max_l: Option<f64>,
    /// MLT sector `[mlt_start, mlt_end)`, wrapping through midnight when
    /// start is after end
    pub mlt_start: Option<f64>,
    pub mlt_end: Option<f64>,
    pub max_abs_mlat: Option<f64>,
}

impl LocationFilter {
    pub fn validate(&self) -> Result<(), String> {
        if let (Some(lo), Some(hi)) = (self.min_l, self.max_l) {
            if lo > hi {
                return Err(format!("min_l ({lo}) exceeds max_l ({hi})"));
            }
        }
        Ok(())
    }

    pub fn accepts(&self, l: f64, mlt: f64, mlat: f64) -> bool {
        let l_ok = self.min_l.map_or(true, |lo| l >= lo) && self.max_l.map_or(true, |hi| l < hi);
        let mlat_ok = self.max_abs_mlat.map_or(true, |max| mlat.abs() < max);
        let mlt_ok = match (self.mlt_start, self.mlt_end) {
            (Some(start), Some(end)) if start > end => mlt >= start || mlt < end,
            (start, end) => start.map_or(true, |s| mlt >= s) && end.map_or(true, |e| mlt < e),
        };
        l_ok && mlt_ok && mlat_ok
    }

    /// Good-time mask over the flattened samples
    pub fn mask(&self, data: &AnalysisData) -> Vec<bool> {
        data.l
            .iter()
            .zip(&data.mlt)
            .zip(&data.mlat)
            .map(|((l, mlt), mlat)| self.accepts(*l, *mlt, *mlat))
            .collect()
    }
}

/// One binned series as parallel arrays
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BinnedSeries {
    /// Lower bin edges, seconds after the event
    pub delay: Vec<f64>,
    #[serde(with = "nan_as_null")]
    pub center: Vec<f64>,
    #[serde(with = "nan_as_null")]
    pub low: Vec<f64>,
    #[serde(with = "nan_as_null")]
    pub high: Vec<f64>,
    pub count: Vec<usize>,
}

impl From<&[DelayBin]> for BinnedSeries {
    fn from(bins: &[DelayBin]) -> Self {
        Self {
            delay: bins.iter().map(|b| b.lower).collect(),
            center: bins.iter().map(|b| b.estimate.center).collect(),
            low: bins.iter().map(|b| b.estimate.low).collect(),
            high: bins.iter().map(|b| b.estimate.high).collect(),
            count: bins.iter().map(|b| b.count).collect(),
        }
    }
}

/// Binned combined, lower-band and upper-band series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotData {
    pub component: Component,
    pub chorus: BinnedSeries,
    pub lbc: BinnedSeries,
    pub ubc: BinnedSeries,
}

impl PlotData {
    /// Fixed-width text table, one row per bin
    pub fn to_table(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "{:>8}  {:>11} {:>6}  {:>11} {:>6}  {:>11} {:>6}",
            "delay", "chorus", "n", "lbc", "n", "ubc", "n"
        );
        for k in 0..self.chorus.delay.len() {
            let _ = writeln!(
                out,
                "{:>6}m  {:>11.3e} {:>6}  {:>11.3e} {:>6}  {:>11.3e} {:>6}",
                self.chorus.delay[k] / 60.0,
                self.chorus.center[k],
                self.chorus.count[k],
                self.lbc.center[k],
                self.lbc.count[k],
                self.ubc.center[k],
                self.ubc.count[k],
            );
        }
        out
    }
}

fn bin_masked(
    binner: &DelayBinner,
    delay: &[f64],
    values: &[f64],
    mask: &[bool],
) -> Result<BinnedSeries, StatsError> {
    let (d, v): (Vec<f64>, Vec<f64>) = delay
        .iter()
        .zip(values)
        .zip(mask)
        .filter(|(_, keep)| **keep)
        .map(|((d, v), _)| (*d, *v))
        .unzip();
    let bins = binner.bin(&d, &v)?;
    Ok(BinnedSeries::from(bins.as_slice()))
}

/// Straight-line fit of `log10(center)` against delay in minutes
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DecayFit {
    /// Decades per minute
    pub slope: f64,
    pub intercept: f64,
    /// Bootstrap standard deviation of the slope, NaN if no resample fit
    pub slope_error: f64,
    /// Defined bins used in the fit
    pub bins: usize,
}

/// Fit the decay of a binned series over its defined, positive bins
///
/// Returns `Ok(None)` when fewer than two usable bins remain or they share
/// one delay.
pub fn decay_fit(series: &BinnedSeries, n_samples: usize) -> Result<Option<DecayFit>, StatsError> {
    let (x, y): (Vec<f64>, Vec<f64>) = series
        .delay
        .iter()
        .zip(&series.center)
        .filter(|(_, c)| c.is_finite() && **c > 0.0)
        .map(|(d, c)| (d / 60.0, c.log10()))
        .unzip();
    if x.len() < 2 {
        return Ok(None);
    }

    let Some(fit) = linear_regression(&x, &y)? else {
        return Ok(None);
    };
    let slope_error = match slope_stderr(&x, &y, n_samples) {
        Ok(err) => err,
        Err(e) if e.is_insufficient_data() => f64::NAN,
        Err(e) => return Err(e),
    };

    Ok(Some(DecayFit {
        slope: fit.slope,
        intercept: fit.intercept,
        slope_error,
        bins: x.len(),
    }))
}

/// Bin one component's combined, lower and upper series
pub fn plotting_data(
    data: &AnalysisData,
    component: Component,
    good_time: &[bool],
    binning: &BinningConfig,
) -> Result<PlotData, PlotError> {
    let series = data.component(component);
    if data.delay.len() != good_time.len() {
        return Err(LengthMismatch::new("delay", data.delay.len(), good_time.len()).into());
    }
    let masks = select(series.chorus, series.lbc, series.ubc, good_time)?;
    let binner = DelayBinner::new(binning.clone());

    Ok(PlotData {
        component,
        chorus: bin_masked(&binner, &data.delay, series.chorus, &masks.chorus)?,
        lbc: bin_masked(&binner, &data.delay, series.lbc, &masks.lbc)?,
        ubc: bin_masked(&binner, &data.delay, series.ubc, &masks.ubc)?,
    })
}
