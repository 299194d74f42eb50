//! Gyrofrequency band extraction
//!
//! For each spectrum the electron gyrofrequency `fce` splits the frequency
//! axis into a lower band `(fce/10, fce/2)` and an upper band `(fce/2, fce)`.
//! Both bounds are exclusive. A band is reported only when its strongest
//! magnetic power reaches the detection threshold; otherwise every output of
//! that band is NaN.

use super::integrate::simpson;
use crate::models::{check_lengths, LengthMismatch};
use serde::{Deserialize, Serialize};

/// Electron gyrofrequency per unit field strength (Hz / nT)
pub const GYRO_FACTOR_HZ_PER_NT: f64 = 28.0;

/// Minimum in-band magnetic power counted as chorus (nT^2/Hz)
pub const DEFAULT_CHORUS_THRESHOLD: f64 = 1e-7;

/// Fill value used by the instrument files for missing power
pub const DEFAULT_SENTINEL: f64 = -1e31;

/// Band extraction parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Magnetic power a band must reach somewhere to be reported
    pub threshold: f64,
    /// Gyrofrequency per nT of field magnitude
    pub gyro_factor: f64,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_CHORUS_THRESHOLD,
            gyro_factor: GYRO_FACTOR_HZ_PER_NT,
        }
    }
}

impl ExtractionConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(self.threshold.is_finite() && self.threshold >= 0.0) {
            return Err(format!(
                "threshold must be finite and non-negative, got {}",
                self.threshold
            ));
        }
        if !(self.gyro_factor.is_finite() && self.gyro_factor > 0.0) {
            return Err(format!(
                "gyro_factor must be positive, got {}",
                self.gyro_factor
            ));
        }
        Ok(())
    }

    /// Electron gyrofrequency for a field magnitude in nT
    pub fn gyrofrequency(&self, b_mag: f64) -> f64 {
        b_mag * self.gyro_factor
    }
}

/// An open frequency interval
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrequencyBand {
    pub low: f64,
    pub high: f64,
}

impl FrequencyBand {
    /// `(fce/10, fce/2)`
    pub fn lower(fce: f64) -> Self {
        Self {
            low: fce / 10.0,
            high: fce / 2.0,
        }
    }

    /// `(fce/2, fce)`
    pub fn upper(fce: f64) -> Self {
        Self {
            low: fce / 2.0,
            high: fce,
        }
    }

    pub fn contains(&self, frequency: f64) -> bool {
        frequency > self.low && frequency < self.high
    }
}

/// Integrated and peak power of one field component in one band
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ComponentPower {
    pub integrated: f64,
    pub max: f64,
}

impl ComponentPower {
    pub const UNDEFINED: Self = Self {
        integrated: f64::NAN,
        max: f64::NAN,
    };

    pub fn is_defined(&self) -> bool {
        !self.integrated.is_nan()
    }
}

/// Magnetic and electric power in one band
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BandPower {
    pub b: ComponentPower,
    pub e: ComponentPower,
}

impl BandPower {
    pub const UNDEFINED: Self = Self {
        b: ComponentPower::UNDEFINED,
        e: ComponentPower::UNDEFINED,
    };
}

/// Both bands of one spectrum
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplePower {
    pub lower: BandPower,
    pub upper: BandPower,
}

/// Splits spectra into gyrofrequency bands and integrates each band
#[derive(Debug, Clone, Default)]
pub struct BandExtractor {
    config: ExtractionConfig,
}

impl BandExtractor {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract both bands from one spectrum
    ///
    /// `b_power` and `e_power` hold one value per entry of `frequency`;
    /// `None` marks a missing measurement.
    ///
    /// # Example
    /// ```
    /// use chorus_delay::chorus::BandExtractor;
    ///
    /// let freq = [20.0, 30.0, 40.0, 60.0, 70.0, 80.0];
    /// let b = vec![Some(1e-6); 6];
    /// let e = vec![Some(1e-3); 6];
    /// let power = BandExtractor::default().extract(100.0, &freq, &b, &e).unwrap();
    /// assert!((power.lower.b.integrated - 2e-5).abs() < 1e-12);
    /// assert_eq!(power.upper.e.max, 1e-3);
    /// ```
    pub fn extract(
        &self,
        fce: f64,
        frequency: &[f64],
        b_power: &[Option<f64>],
        e_power: &[Option<f64>],
    ) -> Result<SamplePower, LengthMismatch> {
        check_lengths(
            frequency.len(),
            &[
                ("magnetic spectrum", b_power.len()),
                ("electric spectrum", e_power.len()),
            ],
        )?;

        Ok(SamplePower {
            lower: self.band(FrequencyBand::lower(fce), frequency, b_power, e_power),
            upper: self.band(FrequencyBand::upper(fce), frequency, b_power, e_power),
        })
    }

    fn band(
        &self,
        band: FrequencyBand,
        frequency: &[f64],
        b_power: &[Option<f64>],
        e_power: &[Option<f64>],
    ) -> BandPower {
        let in_band: Vec<usize> = frequency
            .iter()
            .enumerate()
            .filter(|(_, f)| band.contains(**f))
            .map(|(i, _)| i)
            .collect();

        // The magnetic spectrum gates both components
        let gate = max_present(in_band.iter().map(|&i| b_power[i]));
        match gate {
            Some(peak) if peak >= self.config.threshold => BandPower {
                b: component_power(&in_band, frequency, b_power),
                e: component_power(&in_band, frequency, e_power),
            },
            _ => BandPower::UNDEFINED,
        }
    }
}

/// Largest present value; NaN if any present value is NaN
fn max_present(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    values.flatten().fold(None, |acc, v| {
        Some(match acc {
            None => v,
            Some(a) if a.is_nan() || v.is_nan() => f64::NAN,
            Some(a) => a.max(v),
        })
    })
}

fn component_power(in_band: &[usize], frequency: &[f64], power: &[Option<f64>]) -> ComponentPower {
    let (x, y): (Vec<f64>, Vec<f64>) = in_band
        .iter()
        .filter_map(|&i| power[i].map(|p| (frequency[i], p)))
        .unzip();

    let integrated = match simpson(&y, &x) {
        Some(value) => value,
        None => return ComponentPower::UNDEFINED,
    };
    let max = max_present(y.iter().copied().map(Some)).unwrap_or(f64::NAN);
    ComponentPower { integrated, max }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FREQ: [f64; 9] = [5.0, 10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 80.0, 100.0];

    fn flat(value: f64) -> Vec<Option<f64>> {
        vec![Some(value); FREQ.len()]
    }

    #[test]
    fn test_band_bounds_are_exclusive() {
        let lower = FrequencyBand::lower(100.0);
        let upper = FrequencyBand::upper(100.0);
        assert!(!lower.contains(10.0));
        assert!(lower.contains(10.0001));
        assert!(!lower.contains(50.0));
        assert!(!upper.contains(50.0));
        assert!(upper.contains(99.9));
        assert!(!upper.contains(100.0));
    }

    #[test]
    fn test_in_band_selection() {
        // Lower band picks 20, 30, 40; upper picks 60, 80
        let b: Vec<Option<f64>> = FREQ.iter().map(|f| Some(f * 1e-6)).collect();
        let power = BandExtractor::default()
            .extract(100.0, &FREQ, &b, &flat(1.0))
            .unwrap();
        assert!((power.lower.b.max - 40e-6).abs() < 1e-15);
        assert!((power.upper.b.max - 80e-6).abs() < 1e-15);
        // Linear integrand over [20, 40], exact under Simpson
        assert!((power.lower.b.integrated - 600e-6).abs() < 1e-15);
        assert!((power.upper.e.integrated - 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_below_threshold_gives_nan() {
        let power = BandExtractor::default()
            .extract(100.0, &FREQ, &flat(1e-8), &flat(1.0))
            .unwrap();
        for band in [power.lower, power.upper] {
            assert!(band.b.integrated.is_nan());
            assert!(band.b.max.is_nan());
            assert!(band.e.integrated.is_nan());
            assert!(band.e.max.is_nan());
        }
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let power = BandExtractor::default()
            .extract(100.0, &FREQ, &flat(1e-7), &flat(1.0))
            .unwrap();
        assert!(power.lower.b.is_defined());
    }

    #[test]
    fn test_missing_values_are_skipped() {
        let mut b = flat(2e-6);
        b[3] = None; // 30 Hz
        let power = BandExtractor::default()
            .extract(100.0, &FREQ, &b, &flat(1.0))
            .unwrap();
        let expected = simpson(&[2e-6, 2e-6], &[20.0, 40.0]).unwrap();
        assert!((power.lower.b.integrated - expected).abs() < 1e-18);
        assert_eq!(power.lower.b.max, 2e-6);
    }

    #[test]
    fn test_missing_magnetic_band_fails_gate() {
        let mut b = flat(1e-5);
        for value in b.iter_mut().skip(2).take(3) {
            *value = None;
        }
        let power = BandExtractor::default()
            .extract(100.0, &FREQ, &b, &flat(1.0))
            .unwrap();
        assert_eq!(power.lower, BandPower::UNDEFINED);
        assert!(power.upper.b.is_defined());
    }

    #[test]
    fn test_electric_failure_is_contained() {
        let mut e = flat(1.0);
        e[2] = None;
        e[3] = None;
        let power = BandExtractor::default()
            .extract(100.0, &FREQ, &flat(1e-5), &e)
            .unwrap();
        // One electric point left in the lower band: too few to integrate
        assert!(power.lower.e.integrated.is_nan());
        assert!(power.lower.e.max.is_nan());
        assert!(power.lower.b.is_defined());
        assert!(power.upper.e.is_defined());
    }

    #[test]
    fn test_empty_band() {
        let power = BandExtractor::default()
            .extract(1.0, &FREQ, &flat(1e-5), &flat(1.0))
            .unwrap();
        assert_eq!(power.lower, BandPower::UNDEFINED);
        assert_eq!(power.upper, BandPower::UNDEFINED);
    }

    #[test]
    fn test_spectrum_length_checked() {
        let err = BandExtractor::default()
            .extract(100.0, &FREQ, &flat(1.0), &[Some(1.0)])
            .unwrap_err();
        assert_eq!(err.name, "electric spectrum");
    }

    #[test]
    fn test_config_validation() {
        assert!(ExtractionConfig::default().validate().is_ok());
        let bad = ExtractionConfig {
            gyro_factor: 0.0,
            ..ExtractionConfig::default()
        };
        assert!(bad.validate().is_err());
        assert_eq!(ExtractionConfig::default().gyrofrequency(100.0), 2800.0);
    }
}
