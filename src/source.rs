//! Day-data sources
//!
//! The compiler reads instrument data through [`DataSource`]. The bundled
//! [`JsonDaySource`] reads one JSON document per probe and day:
//!
//! ```text
//! <root>/<probe>/<YYYY-MM-DD>.json
//! <root>/<probe>/nodata-<YYYY-MM-DD>     (marker: day known to be missing)
//! ```

use crate::chorus::DEFAULT_SENTINEL;
use crate::day::{DataError, DayData, PowerMatrix};
use crate::models::nan_as_null;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("no data for {probe} on {date}")]
    NoData { probe: String, date: NaiveDate },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed day data: {0}")]
    Malformed(#[from] DataError),
}

impl SourceError {
    pub fn is_no_data(&self) -> bool {
        matches!(self, SourceError::NoData { .. })
    }
}

/// Loads one probe-day of instrument data
pub trait DataSource {
    fn load_day(&self, probe: &str, date: NaiveDate) -> Result<DayData, SourceError>;
}

/// Preprocessing applied by [`JsonDaySource`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Running-mean window along time for both spectra (0 or 1 disables)
    pub smoothing_window: usize,
    /// Electric channels at these frequencies (Hz) are instrument noise
    pub electric_noise_frequencies: Vec<f64>,
    /// Fill value for missing power
    pub sentinel: f64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            smoothing_window: 6,
            electric_noise_frequencies: vec![1781.0, 3555.0],
            sentinel: DEFAULT_SENTINEL,
        }
    }
}

/// On-disk layout of one day
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DayFile {
    pub time: Vec<DateTime<Utc>>,
    pub frequency: Vec<f64>,
    /// `[frequency][time]`; `null` or the sentinel marks missing
    pub b_power: Vec<Vec<Option<f64>>>,
    pub e_power: Vec<Vec<Option<f64>>>,
    #[serde(with = "nan_as_null")]
    pub density: Vec<f64>,
    pub b_mag_time: Vec<DateTime<Utc>>,
    #[serde(with = "nan_as_null")]
    pub b_mag: Vec<f64>,
    #[serde(with = "nan_as_null")]
    pub l: Vec<f64>,
    #[serde(with = "nan_as_null")]
    pub mlt: Vec<f64>,
    #[serde(with = "nan_as_null")]
    pub mlat: Vec<f64>,
}

/// Reads day files from a directory tree
#[derive(Debug, Clone)]
pub struct JsonDaySource {
    root: PathBuf,
    config: SourceConfig,
}

impl JsonDaySource {
    pub fn new(root: impl Into<PathBuf>, config: SourceConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    pub fn day_path(&self, probe: &str, date: NaiveDate) -> PathBuf {
        self.root.join(probe).join(format!("{date}.json"))
    }

    fn no_data_marker(&self, probe: &str, date: NaiveDate) -> PathBuf {
        self.root.join(probe).join(format!("nodata-{date}"))
    }

    fn build_day(&self, file: DayFile) -> Result<DayData, DataError> {
        let n = file.time.len();
        let sentinel = self.config.sentinel;
        let clean = |rows: Vec<Vec<Option<f64>>>| -> Vec<Vec<Option<f64>>> {
            rows.into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|v| v.filter(|p| *p != sentinel))
                        .collect()
                })
                .collect()
        };

        let b_power = PowerMatrix::from_rows(clean(file.b_power), n)?;
        let mut e_power = PowerMatrix::from_rows(clean(file.e_power), n)?;

        for (channel, freq) in file.frequency.iter().enumerate() {
            if self.config.electric_noise_frequencies.contains(freq) {
                e_power.mask_channel(channel);
            }
        }

        let mut day = DayData {
            time: file.time,
            frequency: file.frequency,
            b_power,
            e_power,
            density: file.density,
            b_mag_time: file.b_mag_time,
            b_mag: file.b_mag,
            l: file.l,
            mlt: file.mlt,
            mlat: file.mlat,
        };
        day.validate()?;

        if self.config.smoothing_window > 1 {
            day.b_power.smooth_time(self.config.smoothing_window);
            day.e_power.smooth_time(self.config.smoothing_window);
        }
        Ok(day)
    }
}

impl DataSource for JsonDaySource {
    fn load_day(&self, probe: &str, date: NaiveDate) -> Result<DayData, SourceError> {
        let no_data = || SourceError::NoData {
            probe: probe.to_string(),
            date,
        };

        if self.no_data_marker(probe, date).exists() {
            debug!(probe, %date, "no-data marker present");
            return Err(no_data());
        }

        let path = self.day_path(probe, date);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(no_data()),
            Err(source) => return Err(SourceError::Io { path, source }),
        };
        let file: DayFile =
            serde_json::from_str(&content).map_err(|source| SourceError::Parse {
                path: path.clone(),
                source,
            })?;

        let day = self.build_day(file)?;
        if day.density.is_empty() {
            return Err(no_data());
        }
        debug!(probe, %date, samples = day.len(), "loaded day");
        Ok(day)
    }
}
