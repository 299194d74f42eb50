//! Match probe ephemerides to quiet-time events
//!
//! Keeps the samples of each probe that fall strictly inside an event's
//! quiet window and satisfy the location filter.

use crate::models::{check_lengths, EventPasses, LengthMismatch, ProbePass, QuietTimeEvent};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Location track of one probe
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProbeEphemeris {
    pub probe: String,
    pub time: Vec<DateTime<Utc>>,
    pub l: Vec<f64>,
    pub mlt: Vec<f64>,
    pub mlat: Vec<f64>,
}

impl ProbeEphemeris {
    pub fn validate(&self) -> Result<(), LengthMismatch> {
        check_lengths(
            self.time.len(),
            &[
                ("ephemeris l", self.l.len()),
                ("ephemeris mlt", self.mlt.len()),
                ("ephemeris mlat", self.mlat.len()),
            ],
        )
    }
}

/// Location constraints for usable samples
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EphemerisFilter {
    /// Samples must have `l > min_l`
    pub min_l: f64,
    /// Samples must have `|mlat| < max_abs_mlat` (degrees)
    pub max_abs_mlat: f64,
    /// MLT sector: `mlt > mlt_start || mlt < mlt_end` (hours)
    pub mlt_start: f64,
    pub mlt_end: f64,
    /// Fill value of the L-shell in the ephemeris files
    pub bad_value: f64,
}

impl Default for EphemerisFilter {
    fn default() -> Self {
        Self {
            min_l: 3.0,
            max_abs_mlat: 30.0,
            mlt_start: 0.0,
            mlt_end: 24.0,
            bad_value: -1e-31,
        }
    }
}

impl EphemerisFilter {
    pub fn validate(&self) -> Result<(), String> {
        if self.max_abs_mlat.is_nan() || self.max_abs_mlat <= 0.0 {
            return Err(format!(
                "max_abs_mlat must be positive, got {}",
                self.max_abs_mlat
            ));
        }
        Ok(())
    }

    fn accepts(&self, l: f64, mlt: f64, mlat: f64) -> bool {
        (mlt < self.mlt_end || mlt > self.mlt_start)
            && mlat.abs() < self.max_abs_mlat
            && l > self.min_l
            && l != self.bad_value
    }
}

/// Attach the matching probe samples to every event
///
/// Probes with no matching sample are left out of an event, and events with
/// no probe left are dropped.
pub fn match_passes(
    events: &[QuietTimeEvent],
    ephemerides: &[ProbeEphemeris],
    filter: &EphemerisFilter,
) -> Result<Vec<EventPasses>, LengthMismatch> {
    for ephemeris in ephemerides {
        ephemeris.validate()?;
    }

    let matched: Vec<EventPasses> = events
        .iter()
        .filter_map(|event| {
            let passes: Vec<ProbePass> = ephemerides
                .iter()
                .filter_map(|ephemeris| select_pass(event, ephemeris, filter))
                .collect();
            if passes.is_empty() {
                debug!(start = %event.start, "no probe inside quiet window");
                return None;
            }
            Some(EventPasses {
                event: event.clone(),
                passes,
            })
        })
        .collect();

    Ok(matched)
}

fn select_pass(
    event: &QuietTimeEvent,
    ephemeris: &ProbeEphemeris,
    filter: &EphemerisFilter,
) -> Option<ProbePass> {
    let mut pass = ProbePass {
        probe: ephemeris.probe.clone(),
        time: Vec::new(),
        l: Vec::new(),
        mlt: Vec::new(),
        mlat: Vec::new(),
    };

    for i in 0..ephemeris.time.len() {
        let t = ephemeris.time[i];
        let (l, mlt, mlat) = (ephemeris.l[i], ephemeris.mlt[i], ephemeris.mlat[i]);
        if t > event.start && t < event.end && filter.accepts(l, mlt, mlat) {
            pass.time.push(t);
            pass.l.push(l);
            pass.mlt.push(mlt);
            pass.mlat.push(mlat);
        }
    }

    (!pass.is_empty()).then_some(pass)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2014, 6, 1, 12, 0, 0).unwrap()
    }

    fn event(start_min: i64, end_min: i64) -> QuietTimeEvent {
        QuietTimeEvent {
            start: t0() + Duration::minutes(start_min),
            end: t0() + Duration::minutes(end_min),
            injection_start: t0(),
            injection_seconds: 0.0,
            quiet_seconds: ((end_min - start_min) * 60) as f64,
        }
    }

    fn track(probe: &str, n: i64, l: f64) -> ProbeEphemeris {
        ProbeEphemeris {
            probe: probe.to_string(),
            time: (0..n).map(|i| t0() + Duration::minutes(i)).collect(),
            l: vec![l; n as usize],
            mlt: vec![6.0; n as usize],
            mlat: vec![5.0; n as usize],
        }
    }

    #[test]
    fn test_window_is_strict() {
        let matched = match_passes(
            &[event(10, 20)],
            &[track("rbspa", 60, 5.0)],
            &EphemerisFilter::default(),
        )
        .unwrap();
        assert_eq!(matched.len(), 1);
        let pass = &matched[0].passes[0];
        // Minutes 11 ..= 19
        assert_eq!(pass.len(), 9);
        assert_eq!(pass.time[0], t0() + Duration::minutes(11));
    }

    #[test]
    fn test_low_l_probe_dropped() {
        let matched = match_passes(
            &[event(10, 20)],
            &[track("rbspa", 60, 5.0), track("rbspb", 60, 2.5)],
            &EphemerisFilter::default(),
        )
        .unwrap();
        assert_eq!(matched[0].passes.len(), 1);
        assert_eq!(matched[0].passes[0].probe, "rbspa");
    }

    #[test]
    fn test_event_without_probes_dropped() {
        let matched = match_passes(
            &[event(10, 20), event(120, 130)],
            &[track("rbspa", 60, 5.0)],
            &EphemerisFilter::default(),
        )
        .unwrap();
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].event.start, t0() + Duration::minutes(10));
    }

    #[test]
    fn test_location_filter() {
        let filter = EphemerisFilter::default();
        assert!(filter.accepts(4.0, 23.0, -29.0));
        assert!(!filter.accepts(4.0, 23.0, 30.0));
        assert!(!filter.accepts(3.0, 23.0, 0.0));
        assert!(!filter.accepts(-1e-31, 23.0, 0.0));
        assert!(!filter.accepts(f64::NAN, 1.0, 0.0));
    }

    #[test]
    fn test_mlt_sector_wraps() {
        let filter = EphemerisFilter {
            mlt_start: 21.0,
            mlt_end: 3.0,
            ..EphemerisFilter::default()
        };
        assert!(filter.accepts(5.0, 22.0, 0.0));
        assert!(filter.accepts(5.0, 2.0, 0.0));
        assert!(!filter.accepts(5.0, 12.0, 0.0));
    }

    #[test]
    fn test_mismatched_track_rejected() {
        let mut bad = track("rbspa", 5, 5.0);
        bad.mlat.pop();
        assert!(match_passes(&[event(0, 10)], &[bad], &EphemerisFilter::default()).is_err());
    }
}
