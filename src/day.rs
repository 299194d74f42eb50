//! One probe's instrument data, for one day or several concatenated days

use crate::models::{check_lengths, LengthMismatch};
use crate::smoothing::running_mean;
use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error(transparent)]
    LengthMismatch(#[from] LengthMismatch),

    #[error("frequency axis differs between days ({existing} vs {incoming} channels)")]
    FrequencyAxisMismatch { existing: usize, incoming: usize },
}

/// Power spectral density laid out frequency-major: `rows[f][t]`
///
/// `None` marks a missing measurement.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PowerMatrix {
    rows: Vec<Vec<Option<f64>>>,
    n_time: usize,
}

impl PowerMatrix {
    /// Build from frequency rows; every row must have `n_time` entries
    pub fn from_rows(rows: Vec<Vec<Option<f64>>>, n_time: usize) -> Result<Self, LengthMismatch> {
        if let Some(row) = rows.iter().find(|row| row.len() != n_time) {
            return Err(LengthMismatch::new("power row", row.len(), n_time));
        }
        Ok(Self { rows, n_time })
    }

    /// Build from raw instrument rows, turning `sentinel` into missing
    pub fn from_raw(
        rows: Vec<Vec<f64>>,
        n_time: usize,
        sentinel: f64,
    ) -> Result<Self, LengthMismatch> {
        let rows = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|v| (v != sentinel).then_some(v))
                    .collect()
            })
            .collect();
        Self::from_rows(rows, n_time)
    }

    pub fn n_freq(&self) -> usize {
        self.rows.len()
    }

    pub fn n_time(&self) -> usize {
        self.n_time
    }

    pub fn get(&self, freq: usize, time: usize) -> Option<f64> {
        self.rows.get(freq)?.get(time).copied().flatten()
    }

    /// The spectrum at one time index
    pub fn column(&self, time: usize) -> Vec<Option<f64>> {
        self.rows
            .iter()
            .map(|row| row.get(time).copied().flatten())
            .collect()
    }

    /// Append later samples along the time axis
    pub fn append(&mut self, other: PowerMatrix) -> Result<(), DataError> {
        if other.n_freq() != self.n_freq() {
            return Err(DataError::FrequencyAxisMismatch {
                existing: self.n_freq(),
                incoming: other.n_freq(),
            });
        }
        for (row, extra) in self.rows.iter_mut().zip(other.rows) {
            row.extend(extra);
        }
        self.n_time += other.n_time;
        Ok(())
    }

    /// Keep the time samples where `keep` is true
    pub fn retain_times(&mut self, keep: &[bool]) {
        for row in &mut self.rows {
            let mut flags = keep.iter();
            row.retain(|_| flags.next().copied().unwrap_or(false));
        }
        self.n_time = keep.iter().take(self.n_time).filter(|k| **k).count();
    }

    /// Mark a whole frequency channel missing
    pub fn mask_channel(&mut self, freq: usize) {
        if let Some(row) = self.rows.get_mut(freq) {
            row.iter_mut().for_each(|v| *v = None);
        }
    }

    /// Running mean along time for every channel
    ///
    /// A missing sample makes every output whose window covers it missing.
    pub fn smooth_time(&mut self, window: usize) {
        for row in &mut self.rows {
            let values: Vec<f64> = row.iter().map(|v| v.unwrap_or(f64::NAN)).collect();
            *row = running_mean(&values, window)
                .into_iter()
                .map(|v| (!v.is_nan()).then_some(v))
                .collect();
        }
    }
}

/// Spectra, density, field magnitude and location for one probe
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DayData {
    pub time: Vec<DateTime<Utc>>,
    pub frequency: Vec<f64>,
    pub b_power: PowerMatrix,
    pub e_power: PowerMatrix,
    pub density: Vec<f64>,
    /// Field magnitude has its own time axis
    pub b_mag_time: Vec<DateTime<Utc>>,
    pub b_mag: Vec<f64>,
    pub l: Vec<f64>,
    pub mlt: Vec<f64>,
    pub mlat: Vec<f64>,
}

impl DayData {
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Check that all spectrum-time arrays are co-indexed
    pub fn validate(&self) -> Result<(), LengthMismatch> {
        let n = self.time.len();
        check_lengths(
            n,
            &[
                ("magnetic power time axis", self.b_power.n_time()),
                ("electric power time axis", self.e_power.n_time()),
                ("density", self.density.len()),
                ("l", self.l.len()),
                ("mlt", self.mlt.len()),
                ("mlat", self.mlat.len()),
            ],
        )?;
        check_lengths(
            self.frequency.len(),
            &[
                ("magnetic power channels", self.b_power.n_freq()),
                ("electric power channels", self.e_power.n_freq()),
            ],
        )?;
        check_lengths(self.b_mag_time.len(), &[("b_mag", self.b_mag.len())])
    }

    /// Concatenate a later day onto this one
    pub fn append(&mut self, other: DayData) -> Result<(), DataError> {
        other.validate()?;
        if other.frequency.len() != self.frequency.len()
            || other
                .frequency
                .iter()
                .zip(&self.frequency)
                .any(|(a, b)| a != b)
        {
            return Err(DataError::FrequencyAxisMismatch {
                existing: self.frequency.len(),
                incoming: other.frequency.len(),
            });
        }

        self.b_power.append(other.b_power)?;
        self.e_power.append(other.e_power)?;
        self.time.extend(other.time);
        self.density.extend(other.density);
        self.b_mag_time.extend(other.b_mag_time);
        self.b_mag.extend(other.b_mag);
        self.l.extend(other.l);
        self.mlt.extend(other.mlt);
        self.mlat.extend(other.mlat);
        Ok(())
    }

    /// Keep only samples with `start <= t <= end` on both time axes
    pub fn trim(&mut self, start: DateTime<Utc>, end: DateTime<Utc>) {
        let keep: Vec<bool> = self.time.iter().map(|t| *t >= start && *t <= end).collect();
        self.b_power.retain_times(&keep);
        self.e_power.retain_times(&keep);
        retain_by(&mut self.time, &keep);
        retain_by(&mut self.density, &keep);
        retain_by(&mut self.l, &keep);
        retain_by(&mut self.mlt, &keep);
        retain_by(&mut self.mlat, &keep);

        let keep_mag: Vec<bool> = self
            .b_mag_time
            .iter()
            .map(|t| *t >= start && *t <= end)
            .collect();
        retain_by(&mut self.b_mag_time, &keep_mag);
        retain_by(&mut self.b_mag, &keep_mag);
    }
}

fn retain_by<T>(values: &mut Vec<T>, keep: &[bool]) {
    let mut flags = keep.iter();
    values.retain(|_| flags.next().copied().unwrap_or(false));
}
