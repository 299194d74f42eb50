//! Event compilation
//!
//! For every quiet-time event and every probe pass inside it, load the
//! probe's day data, cut it to the pass, interpolate the field magnitude,
//! gate each spectrum on plasma density and extract band power. Each event
//! is compiled into a fresh record and handed to a sink once complete;
//! failures are contained to the probe or day they occur in.

use crate::chorus::{BandExtractor, ExtractionConfig, LinearInterpolator};
use crate::day::DayData;
use crate::models::{
    epoch_seconds, iso_key, seconds_between, ChorusMeasurement, EventPasses, EventRecord,
    ProbePass,
};
use crate::source::DataSource;
use crate::store::RecordSink;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Upper density limit for chorus generation, `min(c * (l_ref / L)^k, cap)`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DensityGate {
    pub coefficient: f64,
    pub reference_l: f64,
    pub exponent: f64,
    /// Absolute ceiling (cm^-3)
    pub cap: f64,
}

impl Default for DensityGate {
    fn default() -> Self {
        Self {
            coefficient: 10.0,
            reference_l: 6.6,
            exponent: 4.0,
            cap: 50.0,
        }
    }
}

impl DensityGate {
    pub fn validate(&self) -> Result<(), String> {
        if self.cap.is_nan() || self.cap <= 0.0 {
            return Err(format!("density cap must be positive, got {}", self.cap));
        }
        if self.reference_l.is_nan() || self.reference_l <= 0.0 {
            return Err(format!(
                "reference_l must be positive, got {}",
                self.reference_l
            ));
        }
        Ok(())
    }

    /// Density limit at L-shell `l`
    pub fn limit(&self, l: f64) -> f64 {
        (self.coefficient * (self.reference_l / l).powf(self.exponent)).min(self.cap)
    }

    /// True when `density` is low enough; NaN density or L is rejected
    ///
    /// # Example
    /// ```
    /// use chorus_delay::compiler::DensityGate;
    ///
    /// let gate = DensityGate::default();
    /// assert!(gate.accepts(10.0, 6.6));
    /// assert!(!gate.accepts(10.1, 6.6));
    /// assert!(gate.accepts(50.0, 3.0));
    /// ```
    pub fn accepts(&self, density: f64, l: f64) -> bool {
        !l.is_nan() && density <= self.limit(l)
    }
}

/// Compilation options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileConfig {
    /// Days after this date are never loaded
    pub mission_end: Option<NaiveDate>,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            mission_end: NaiveDate::from_ymd_opt(2019, 7, 16),
        }
    }
}

/// Counts reported after a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompileSummary {
    pub events_seen: usize,
    pub events_written: usize,
    /// Events with no usable sample from any probe
    pub events_empty: usize,
    pub write_failures: usize,
    pub measurements: usize,
}

/// Compiles events into per-event measurement records
pub struct EventCompiler<'a, S: DataSource> {
    source: &'a S,
    extractor: BandExtractor,
    gate: DensityGate,
    config: CompileConfig,
}

impl<'a, S: DataSource> EventCompiler<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            extractor: BandExtractor::default(),
            gate: DensityGate::default(),
            config: CompileConfig::default(),
        }
    }

    pub fn with_extraction(mut self, config: ExtractionConfig) -> Self {
        self.extractor = BandExtractor::new(config);
        self
    }

    pub fn with_density_gate(mut self, gate: DensityGate) -> Self {
        self.gate = gate;
        self
    }

    pub fn with_config(mut self, config: CompileConfig) -> Self {
        self.config = config;
        self
    }

    /// Compile every event and write the non-empty ones to `sink`
    ///
    /// A failed write is logged and counted; later events still run.
    pub fn run<W: RecordSink>(&self, events: &[EventPasses], sink: &mut W) -> CompileSummary {
        info!(events = events.len(), "starting compilation");
        let mut summary = CompileSummary::default();

        for event in events {
            summary.events_seen += 1;
            let Some(record) = self.compile_event(event) else {
                summary.events_empty += 1;
                continue;
            };
            match sink.write_record(&record) {
                Ok(()) => {
                    summary.events_written += 1;
                    summary.measurements += record.len();
                    info!(event = %record.key(), measurements = record.len(), "finished event");
                }
                Err(e) => {
                    summary.write_failures += 1;
                    warn!(event = %record.key(), error = %e, "unable to write event");
                }
            }
        }

        info!(
            written = summary.events_written,
            empty = summary.events_empty,
            failed = summary.write_failures,
            "compilation finished"
        );
        summary
    }

    /// Compile one event; `None` when no probe produced a measurement
    pub fn compile_event(&self, event: &EventPasses) -> Option<EventRecord> {
        let mut record = EventRecord::new(event.event.start);
        for pass in &event.passes {
            let added = self.compile_pass(event.event.start, pass, &mut record);
            debug!(probe = %pass.probe, added, "probe pass compiled");
        }

        if record.is_empty() {
            warn!(event = %iso_key(&event.event.start), "no usable data for event");
            return None;
        }
        Some(record)
    }

    /// Append the accepted samples of one pass; returns how many were added
    fn compile_pass(
        &self,
        event_start: DateTime<Utc>,
        pass: &ProbePass,
        record: &mut EventRecord,
    ) -> usize {
        let probe = pass.probe.as_str();
        if let Err(e) = pass.validate() {
            warn!(probe, error = %e, "malformed pass");
            return 0;
        }
        let Some((start, end)) = pass.span() else {
            return 0;
        };

        let Some(mut day) = self.load_days(probe, &pass.dates()) else {
            warn!(probe, event = %iso_key(&event_start), "no data for entire event");
            return 0;
        };
        day.trim(start, end);

        if day.b_mag_time.is_empty() {
            warn!(probe, event = %iso_key(&event_start), "not enough b_mag data");
            return 0;
        }
        if day.density.is_empty() {
            warn!(probe, event = %iso_key(&event_start), "not enough density data");
            return 0;
        }

        let mag_seconds: Vec<f64> = day.b_mag_time.iter().map(epoch_seconds).collect();
        let b_mag = match LinearInterpolator::new(&mag_seconds, &day.b_mag) {
            Ok(Some(f)) => f,
            Ok(None) => {
                warn!(probe, "no usable b_mag samples");
                return 0;
            }
            Err(e) => {
                warn!(probe, error = %e, "malformed b_mag data");
                return 0;
            }
        };

        let mut added = 0;
        for k in 0..day.len() {
            if !self.gate.accepts(day.density[k], day.l[k]) {
                continue;
            }

            let t = day.time[k];
            let fce = self
                .extractor
                .config()
                .gyrofrequency(b_mag.eval(epoch_seconds(&t)));
            let power = match self.extractor.extract(
                fce,
                &day.frequency,
                &day.b_power.column(k),
                &day.e_power.column(k),
            ) {
                Ok(power) => power,
                Err(e) => {
                    warn!(probe, error = %e, "skipping spectrum");
                    continue;
                }
            };

            record.push(ChorusMeasurement {
                probe: probe.to_string(),
                ut: t,
                l: day.l[k],
                mlt: day.mlt[k],
                mlat: day.mlat[k],
                delay: seconds_between(&event_start, &t),
                power,
            });
            added += 1;
        }
        added
    }

    /// Load and concatenate the days of a pass
    ///
    /// Days that fail to load are skipped. If nothing has been accumulated
    /// yet, the next good day starts the accumulation.
    fn load_days(&self, probe: &str, dates: &[NaiveDate]) -> Option<DayData> {
        let mut accumulated: Option<DayData> = None;

        for date in dates {
            if self.config.mission_end.is_some_and(|end| *date > end) {
                warn!(probe, %date, "date after end of mission");
                continue;
            }

            let day = match self.source.load_day(probe, *date) {
                Ok(day) => day,
                Err(e) if e.is_no_data() => {
                    warn!(probe, %date, "no data for day");
                    continue;
                }
                Err(e) => {
                    warn!(probe, %date, error = %e, "unable to read day");
                    continue;
                }
            };
            if let Err(e) = day.validate() {
                warn!(probe, %date, error = %e, "malformed day");
                continue;
            }

            match accumulated.as_mut() {
                Some(existing) => {
                    if let Err(e) = existing.append(day) {
                        warn!(probe, %date, error = %e, "unable to append day");
                    }
                }
                None => {
                    if date != &dates[0] {
                        warn!(probe, %date, "no data before this day, starting here");
                    }
                    accumulated = Some(day);
                }
            }
        }
        accumulated
    }
}
