// Error taxonomy for the numeric transforms and estimators

use thiserror::Error;

/// Errors raised by the statistics engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    /// A value outside the domain of a transform (e.g. log of a non-positive number)
    #[error("domain error: {0}")]
    Domain(String),

    /// Not enough samples to compute a statistic
    #[error("insufficient data: need at least {required} samples, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// Paired arrays that are not co-indexed
    #[error("length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    /// A parameter that makes the computation meaningless (e.g. zero bin width)
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Result type for statistics operations
pub type Result<T> = std::result::Result<T, StatsError>;

impl StatsError {
    /// Whether the error only means "too few samples here"
    ///
    /// Binning and extraction downgrade these to NaN markers instead of
    /// propagating them.
    pub fn is_insufficient_data(&self) -> bool {
        matches!(self, StatsError::InsufficientData { .. })
    }
}
