//! Quiet-time and injection detection on an auroral index series
//!
//! A quiet period is a run of consecutive samples below the quiet threshold.
//! It is kept only when it lasts long enough and the index rose above the
//! injection threshold somewhere between the end of the previously accepted
//! quiet period and the end of this one.

use crate::models::{seconds_between, LengthMismatch, QuietTimeEvent};
use crate::smoothing::running_mean;
use anyhow::{bail, Context};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectionError {
    #[error("index series: {0}")]
    LengthMismatch(#[from] LengthMismatch),
}

/// Detection thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InjectionConfig {
    /// Index values below this are quiet (nT)
    pub quiet_threshold: f64,
    /// Index values at or above this indicate an injection (nT)
    pub high_threshold: f64,
    /// Shortest quiet run kept, in samples
    pub min_quiet_samples: usize,
    /// Running-mean window applied to the raw index
    pub smoothing_window: usize,
}

impl Default for InjectionConfig {
    fn default() -> Self {
        Self {
            quiet_threshold: 150.0,
            high_threshold: 250.0,
            min_quiet_samples: 10,
            smoothing_window: 6,
        }
    }
}

impl InjectionConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.high_threshold < self.quiet_threshold {
            return Err(format!(
                "high_threshold ({}) must not be below quiet_threshold ({})",
                self.high_threshold, self.quiet_threshold
            ));
        }
        if self.min_quiet_samples == 0 {
            return Err("min_quiet_samples must be at least 1".to_string());
        }
        Ok(())
    }
}

/// Smooth the raw index and find quiet times
pub fn detect(
    raw_index: &[f64],
    times: &[DateTime<Utc>],
    config: &InjectionConfig,
) -> Result<Vec<QuietTimeEvent>, DetectionError> {
    let smoothed = running_mean(raw_index, config.smoothing_window);
    find_quiet_times(&smoothed, times, config)
}

/// Find quiet periods that follow an injection
///
/// `index` is expected to be smoothed already. Events are returned in time
/// order; each one only looks back as far as the previous accepted event.
pub fn find_quiet_times(
    index: &[f64],
    times: &[DateTime<Utc>],
    config: &InjectionConfig,
) -> Result<Vec<QuietTimeEvent>, DetectionError> {
    if index.len() != times.len() {
        return Err(LengthMismatch::new("index times", times.len(), index.len()).into());
    }

    let runs = quiet_runs(index, config.quiet_threshold);
    debug!(runs = runs.len(), "found quiet runs");

    let scan = runs
        .into_iter()
        .filter(|run| run.len() >= config.min_quiet_samples)
        .fold(Scan::default(), |mut scan, run| {
            if let Some(event) = event_for_run(index, times, scan.prev_end, &run, config) {
                scan.prev_end = run.end - 1;
                scan.events.push(event);
            }
            scan
        });

    info!(events = scan.events.len(), "detected quiet times");
    Ok(scan.events)
}

#[derive(Default)]
struct Scan {
    /// Last index of the previously accepted quiet run
    prev_end: usize,
    events: Vec<QuietTimeEvent>,
}

/// Maximal runs of consecutive indices with `index < threshold`
fn quiet_runs(index: &[f64], threshold: f64) -> Vec<Range<usize>> {
    let mut runs: Vec<Range<usize>> = Vec::new();
    for (i, _) in index.iter().enumerate().filter(|(_, v)| **v < threshold) {
        match runs.last_mut() {
            Some(run) if run.end == i => run.end = i + 1,
            _ => runs.push(i..i + 1),
        }
    }
    runs
}

fn event_for_run(
    index: &[f64],
    times: &[DateTime<Utc>],
    prev_end: usize,
    run: &Range<usize>,
    config: &InjectionConfig,
) -> Option<QuietTimeEvent> {
    let first = run.start;
    let last = run.end - 1;
    if prev_end >= last {
        return None;
    }

    let window = &index[prev_end..last];
    let (peak, peak_value) = first_argmax(window)?;
    if peak_value < config.high_threshold {
        return None;
    }

    let start_offset = window[..peak]
        .iter()
        .rposition(|v| *v < config.high_threshold)
        .unwrap_or(0);
    let injection_start = times[prev_end + start_offset];

    Some(QuietTimeEvent {
        start: times[first],
        end: times[last],
        injection_start,
        injection_seconds: seconds_between(&injection_start, &times[first]),
        quiet_seconds: seconds_between(&times[first], &times[last]),
    })
}

/// Position and value of the first maximum, ignoring NaN
fn first_argmax(values: &[f64]) -> Option<(usize, f64)> {
    values
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .fold(None, |best, (i, v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((i, v)),
        })
}

/// Read a `timestamp,value` index series
///
/// Blank lines and `#` comments are skipped, as is a header line whose value
/// column does not parse. Timestamps are RFC 3339 or `YYYY-MM-DD HH:MM:SS`
/// in UTC.
pub fn load_index_csv(path: &Path) -> anyhow::Result<(Vec<DateTime<Utc>>, Vec<f64>)> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read index file: {}", path.display()))?;

    let mut times = Vec::new();
    let mut values = Vec::new();
    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((stamp, value)) = line.split_once(',') else {
            bail!("{}:{}: expected `timestamp,value`", path.display(), line_no + 1);
        };
        let value: f64 = match value.trim().parse() {
            Ok(v) => v,
            Err(_) if times.is_empty() => continue,
            Err(e) => bail!("{}:{}: bad value: {}", path.display(), line_no + 1, e),
        };
        let time = parse_timestamp(stamp.trim())
            .with_context(|| format!("{}:{}: bad timestamp", path.display(), line_no + 1))?;
        times.push(time);
        values.push(value);
    }
    Ok((times, values))
}

pub(crate) fn parse_timestamp(stamp: &str) -> anyhow::Result<DateTime<Utc>> {
    if let Ok(time) = DateTime::parse_from_rfc3339(stamp) {
        return Ok(time.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(stamp, format) {
            return Ok(naive.and_utc());
        }
    }
    bail!("unrecognized timestamp `{}`", stamp)
}
