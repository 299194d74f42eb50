// Pipeline configuration
//
// One TOML file configures every stage. Every section and every field is
// optional; anything left out takes its default.

use crate::chorus::ExtractionConfig;
use crate::compiler::{CompileConfig, DensityGate};
use crate::ephemeris::EphemerisFilter;
use crate::injection::InjectionConfig;
use crate::plotting::LocationFilter;
use crate::source::SourceConfig;
use crate::stats::BinningConfig;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for all pipeline stages
///
/// # Example
/// ```
/// use chorus_delay::config::PipelineConfig;
///
/// let config: PipelineConfig = toml::from_str(
///     r#"
///     [binning]
///     bin_size_minutes = 15
///     method = "gmean"
///     "#,
/// )
/// .unwrap();
/// assert_eq!(config.binning.bin_size_minutes, 15);
/// assert_eq!(config.injection.quiet_threshold, 150.0);
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub binning: BinningConfig,
    pub extraction: ExtractionConfig,
    pub density: DensityGate,
    pub injection: InjectionConfig,
    pub ephemeris: EphemerisFilter,
    pub compile: CompileConfig,
    pub source: SourceConfig,
    /// Good-time filter applied before binning
    pub selection: LocationFilter,
}

impl PipelineConfig {
    /// Read a TOML configuration file
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        config
            .validate()
            .map_err(|e| anyhow::anyhow!("Invalid config {}: {}", path.display(), e))?;
        Ok(config)
    }

    /// Defaults when no path is given
    pub fn load_or_default(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Validate every section, reporting the first problem
    pub fn validate(&self) -> Result<(), String> {
        self.binning
            .validate()
            .map_err(|e| format!("[binning] {e}"))?;
        self.extraction
            .validate()
            .map_err(|e| format!("[extraction] {e}"))?;
        self.density
            .validate()
            .map_err(|e| format!("[density] {e}"))?;
        self.injection
            .validate()
            .map_err(|e| format!("[injection] {e}"))?;
        self.ephemeris
            .validate()
            .map_err(|e| format!("[ephemeris] {e}"))?;
        self.selection
            .validate()
            .map_err(|e| format!("[selection] {e}"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::AveragingMethod;
    use chrono::NaiveDate;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.binning.bin_size_minutes, 10);
        assert_eq!(config.binning.window_hours, 5);
        assert_eq!(config.binning.method, AveragingMethod::Peak);
        assert_eq!(config.extraction.threshold, 1e-7);
        assert_eq!(config.extraction.gyro_factor, 28.0);
        assert_eq!(config.density.cap, 50.0);
        assert_eq!(config.injection.high_threshold, 250.0);
        assert_eq!(config.ephemeris.min_l, 3.0);
        assert_eq!(
            config.compile.mission_end,
            NaiveDate::from_ymd_opt(2019, 7, 16)
        );
        assert_eq!(config.source.electric_noise_frequencies, vec![1781.0, 3555.0]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config: PipelineConfig = toml::from_str("").unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_partial_sections() {
        let config: PipelineConfig = toml::from_str(
            r#"
            [density]
            cap = 40.0

            [compile]
            mission_end = "2018-01-01"

            [selection]
            min_l = 4.0
            mlt_start = 22.0
            mlt_end = 6.0
            "#,
        )
        .unwrap();
        assert_eq!(config.density.cap, 40.0);
        assert_eq!(config.density.reference_l, 6.6);
        assert_eq!(
            config.compile.mission_end,
            NaiveDate::from_ymd_opt(2018, 1, 1)
        );
        assert_eq!(config.selection.min_l, Some(4.0));
        assert_eq!(config.selection.max_l, None);
    }

    #[test]
    fn test_validation_names_section() {
        let mut config = PipelineConfig::default();
        config.binning.bin_size_minutes = 0;
        let err = config.validate().unwrap_err();
        assert!(err.starts_with("[binning]"), "{err}");
    }

    #[test]
    fn test_load_rejects_invalid() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[injection]\nquiet_threshold = 300.0").unwrap();
        assert!(PipelineConfig::load(file.path()).is_err());
    }

    #[test]
    fn test_load_or_default() {
        let config = PipelineConfig::load_or_default(None).unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_serialize_round_trip() {
        let config = PipelineConfig::default();
        let text = toml::to_string(&config).unwrap();
        let back: PipelineConfig = toml::from_str(&text).unwrap();
        assert_eq!(back, config);
    }
}
