// Chorus spectra: band extraction, integration and sample selection
//
// Per-spectrum processing turns a wave power spectrum plus the local field
// magnitude into lower and upper band chorus power. Selection builds the
// inclusion masks used before binning.

mod bands;
mod integrate;
mod interpolate;
mod selector;

pub use bands::{
    BandExtractor, BandPower, ComponentPower, ExtractionConfig, FrequencyBand, SamplePower,
    DEFAULT_CHORUS_THRESHOLD, DEFAULT_SENTINEL, GYRO_FACTOR_HZ_PER_NT,
};
pub use integrate::simpson;
pub use interpolate::LinearInterpolator;
pub use selector::{select, ChorusMasks};
