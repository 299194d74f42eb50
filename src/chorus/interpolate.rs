//! Piecewise-linear interpolation with linear extrapolation

use crate::models::LengthMismatch;

/// Linear interpolant over (x, y) samples
///
/// Samples are sorted by `x` on construction. Outside the sampled range the
/// first or last segment is extended. A single sample gives a constant.
#[derive(Debug, Clone)]
pub struct LinearInterpolator {
    x: Vec<f64>,
    y: Vec<f64>,
}

impl LinearInterpolator {
    /// Build an interpolant; non-finite abscissae are discarded
    ///
    /// Returns `Ok(None)` when no usable sample remains.
    pub fn new(x: &[f64], y: &[f64]) -> Result<Option<Self>, LengthMismatch> {
        if x.len() != y.len() {
            return Err(LengthMismatch::new("interpolant y", y.len(), x.len()));
        }

        let mut pairs: Vec<(f64, f64)> = x
            .iter()
            .copied()
            .zip(y.iter().copied())
            .filter(|(xi, _)| xi.is_finite())
            .collect();
        if pairs.is_empty() {
            return Ok(None);
        }
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        let (x, y) = pairs.into_iter().unzip();
        Ok(Some(Self { x, y }))
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    /// Evaluate at `t`
    ///
    /// # Example
    /// ```
    /// use chorus_delay::chorus::LinearInterpolator;
    ///
    /// let f = LinearInterpolator::new(&[0.0, 10.0], &[100.0, 200.0]).unwrap().unwrap();
    /// assert_eq!(f.eval(5.0), 150.0);
    /// assert_eq!(f.eval(20.0), 300.0);
    /// ```
    pub fn eval(&self, t: f64) -> f64 {
        let n = self.x.len();
        if n == 1 {
            return self.y[0];
        }

        // Index of the segment [x[i], x[i + 1]] used for t, clamped to the ends
        let upper = self.x.partition_point(|xi| *xi <= t);
        let i = upper.saturating_sub(1).min(n - 2);

        let (x0, x1) = (self.x[i], self.x[i + 1]);
        let (y0, y1) = (self.y[i], self.y[i + 1]);
        if x1 == x0 {
            return y0;
        }
        y0 + (t - x0) * (y1 - y0) / (x1 - x0)
    }
}
