//! Inclusion masks for chorus samples
//!
//! Lower and upper band validity differ per sample, so three independent
//! masks are produced rather than one joint mask.

use crate::models::LengthMismatch;

/// Per-component inclusion masks
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChorusMasks {
    pub chorus: Vec<bool>,
    pub lbc: Vec<bool>,
    pub ubc: Vec<bool>,
}

fn component_mask(values: &[f64], good_time: &[bool]) -> Vec<bool> {
    values
        .iter()
        .zip(good_time)
        .map(|(v, good)| v.is_finite() && *v > 0.0 && *good)
        .collect()
}

/// Build the combined, lower-band and upper-band masks
///
/// Each mask is `finite(c) && c > 0 && good_time`. All inputs must share one
/// length.
///
/// # Example
/// ```
/// use chorus_delay::chorus::select;
///
/// let chorus = [1.0, -1.0, f64::NAN, 2.0];
/// let good = [true, true, true, false];
/// let masks = select(&chorus, &chorus, &chorus, &good).unwrap();
/// assert_eq!(masks.chorus, vec![true, false, false, false]);
/// ```
pub fn select(
    chorus: &[f64],
    lbc: &[f64],
    ubc: &[f64],
    good_time: &[bool],
) -> Result<ChorusMasks, LengthMismatch> {
    let n = good_time.len();
    for (name, len) in [("chorus", chorus.len()), ("lbc", lbc.len()), ("ubc", ubc.len())] {
        if len != n {
            return Err(LengthMismatch::new(name, len, n));
        }
    }

    Ok(ChorusMasks {
        chorus: component_mask(chorus, good_time),
        lbc: component_mask(lbc, good_time),
        ubc: component_mask(ubc, good_time),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combined_mask_example() {
        let chorus = [1.0, -1.0, f64::NAN, 2.0];
        let good = [true, true, true, false];
        let masks = select(&chorus, &[1.0; 4], &[1.0; 4], &good).unwrap();
        assert_eq!(masks.chorus, vec![true, false, false, false]);
    }

    #[test]
    fn test_masks_are_independent() {
        let chorus = [3.0, 3.0, 3.0];
        let lbc = [3.0, 0.0, f64::NAN];
        let ubc = [0.0, 3.0, f64::INFINITY];
        let good = [true; 3];
        let masks = select(&chorus, &lbc, &ubc, &good).unwrap();
        assert_eq!(masks.chorus, vec![true, true, true]);
        assert_eq!(masks.lbc, vec![true, false, false]);
        assert_eq!(masks.ubc, vec![false, true, false]);
    }

    #[test]
    fn test_zero_is_excluded() {
        let masks = select(&[0.0], &[0.0], &[0.0], &[true]).unwrap();
        assert_eq!(masks.chorus, vec![false]);
    }

    #[test]
    fn test_length_mismatch_names_component() {
        let err = select(&[1.0], &[1.0, 2.0], &[1.0], &[true]).unwrap_err();
        assert_eq!(err.name, "lbc");
    }
}
