//! Shared records: quiet-time events, probe passes and chorus measurements

use crate::chorus::SamplePower;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Two arrays that should be co-indexed are not
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{name} has length {actual}, expected {expected}")]
pub struct LengthMismatch {
    pub name: &'static str,
    pub actual: usize,
    pub expected: usize,
}

impl LengthMismatch {
    pub fn new(name: &'static str, actual: usize, expected: usize) -> Self {
        Self {
            name,
            actual,
            expected,
        }
    }
}

/// Check that every named length equals `expected`
pub(crate) fn check_lengths(
    expected: usize,
    lengths: &[(&'static str, usize)],
) -> Result<(), LengthMismatch> {
    match lengths.iter().find(|(_, len)| *len != expected) {
        Some((name, len)) => Err(LengthMismatch::new(*name, *len, expected)),
        None => Ok(()),
    }
}

/// ISO-8601 key used for event groups, e.g. `2015-03-17T04:12:00Z`
pub fn iso_key(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Seconds since the Unix epoch as a float
pub fn epoch_seconds(time: &DateTime<Utc>) -> f64 {
    time.timestamp() as f64 + f64::from(time.timestamp_subsec_nanos()) * 1e-9
}

/// Signed seconds from `from` to `to`
pub fn seconds_between(from: &DateTime<Utc>, to: &DateTime<Utc>) -> f64 {
    let delta = *to - *from;
    match delta.num_microseconds() {
        Some(us) => us as f64 * 1e-6,
        None => delta.num_milliseconds() as f64 * 1e-3,
    }
}

/// A quiet interval following a geomagnetic injection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuietTimeEvent {
    /// Start of the quiet period; the origin for delays
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Where the index first rose above the injection threshold before its peak
    pub injection_start: DateTime<Utc>,
    /// Seconds from injection start to quiet start
    pub injection_seconds: f64,
    /// Seconds from quiet start to quiet end
    pub quiet_seconds: f64,
}

/// Co-indexed location samples of one probe inside a quiet window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbePass {
    pub probe: String,
    pub time: Vec<DateTime<Utc>>,
    pub l: Vec<f64>,
    pub mlt: Vec<f64>,
    pub mlat: Vec<f64>,
}

impl ProbePass {
    pub fn validate(&self) -> Result<(), LengthMismatch> {
        check_lengths(
            self.time.len(),
            &[
                ("pass l", self.l.len()),
                ("pass mlt", self.mlt.len()),
                ("pass mlat", self.mlat.len()),
            ],
        )
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    /// Earliest and latest sample time
    pub fn span(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let start = self.time.iter().min()?;
        let end = self.time.iter().max()?;
        Some((*start, *end))
    }

    /// Distinct UTC dates covered by the pass, ascending
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.time.iter().map(|t| t.date_naive()).collect();
        dates.sort();
        dates.dedup();
        dates
    }
}

/// A quiet-time event with the probe passes that fall inside it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventPasses {
    pub event: QuietTimeEvent,
    pub passes: Vec<ProbePass>,
}

/// One accepted chorus sample
#[derive(Debug, Clone, PartialEq)]
pub struct ChorusMeasurement {
    pub probe: String,
    pub ut: DateTime<Utc>,
    pub l: f64,
    pub mlt: f64,
    pub mlat: f64,
    /// Seconds since the start of the quiet period
    pub delay: f64,
    pub power: SamplePower,
}

/// Measurements accumulated for one event
///
/// Built fresh for every event and handed to the store once complete.
#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub event_start: DateTime<Utc>,
    pub measurements: Vec<ChorusMeasurement>,
}

impl EventRecord {
    pub fn new(event_start: DateTime<Utc>) -> Self {
        Self {
            event_start,
            measurements: Vec::new(),
        }
    }

    /// Group key in the persisted store
    pub fn key(&self) -> String {
        iso_key(&self.event_start)
    }

    pub fn push(&mut self, measurement: ChorusMeasurement) {
        self.measurements.push(measurement);
    }

    pub fn len(&self) -> usize {
        self.measurements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measurements.is_empty()
    }
}

/// Serde adapter writing NaN as `null` and reading `null` back as NaN
///
/// JSON has no infinity, so any non-finite value is written as `null`;
/// infinities are not preserved and read back as NaN.
pub mod nan_as_null {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
        let options: Vec<Option<f64>> = values
            .iter()
            .map(|v| if v.is_finite() { Some(*v) } else { None })
            .collect();
        options.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
        let options = Vec::<Option<f64>>::deserialize(deserializer)?;
        Ok(options.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2015, 3, 17, h, m, s).unwrap()
    }

    #[test]
    fn test_iso_key_format() {
        assert_eq!(iso_key(&t(4, 12, 0)), "2015-03-17T04:12:00Z");
    }

    #[test]
    fn test_seconds_between() {
        assert_eq!(seconds_between(&t(4, 0, 0), &t(5, 0, 30)), 3630.0);
        assert_eq!(seconds_between(&t(5, 0, 0), &t(4, 0, 0)), -3600.0);
    }

    #[test]
    fn test_epoch_seconds() {
        let epoch = Utc.with_ymd_and_hms(1970, 1, 1, 0, 1, 0).unwrap();
        assert_eq!(epoch_seconds(&epoch), 60.0);
    }

    #[test]
    fn test_pass_dates_unique_sorted() {
        let day2 = Utc.with_ymd_and_hms(2015, 3, 18, 1, 0, 0).unwrap();
        let pass = ProbePass {
            probe: "rbspa".to_string(),
            time: vec![day2, t(23, 0, 0), t(22, 0, 0)],
            l: vec![5.0; 3],
            mlt: vec![1.0; 3],
            mlat: vec![0.0; 3],
        };
        assert_eq!(
            pass.dates(),
            vec![
                NaiveDate::from_ymd_opt(2015, 3, 17).unwrap(),
                NaiveDate::from_ymd_opt(2015, 3, 18).unwrap()
            ]
        );
        assert_eq!(pass.span(), Some((t(22, 0, 0), day2)));
    }

    #[test]
    fn test_pass_validate() {
        let pass = ProbePass {
            probe: "rbspb".to_string(),
            time: vec![t(1, 0, 0)],
            l: vec![],
            mlt: vec![1.0],
            mlat: vec![1.0],
        };
        assert_eq!(
            pass.validate().unwrap_err(),
            LengthMismatch::new("pass l", 0, 1)
        );
    }

    #[test]
    fn test_nan_as_null_round_trip() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            #[serde(with = "nan_as_null")]
            values: Vec<f64>,
        }

        let json = serde_json::to_string(&Wrapper {
            values: vec![1.5, f64::NAN],
        })
        .unwrap();
        assert_eq!(json, r#"{"values":[1.5,null]}"#);

        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(back.values[0], 1.5);
        assert!(back.values[1].is_nan());
    }

    #[test]
    fn test_nan_as_null_infinity_reads_back_as_nan() {
        #[derive(Serialize, Deserialize)]
        struct Wrapper {
            #[serde(with = "nan_as_null")]
            values: Vec<f64>,
        }

        let json = serde_json::to_string(&Wrapper {
            values: vec![f64::INFINITY, -2.0, f64::NEG_INFINITY],
        })
        .unwrap();
        assert_eq!(json, r#"{"values":[null,-2.0,null]}"#);

        let back: Wrapper = serde_json::from_str(&json).unwrap();
        assert!(back.values[0].is_nan());
        assert_eq!(back.values[1], -2.0);
        assert!(back.values[2].is_nan());
    }
}
