//! Flatten a compiled store into analysis arrays
//!
//! All event groups are concatenated into one set of co-indexed arrays.
//! Missing values become 0 and the two bands are combined into a total
//! chorus series, either by summing integrated power or by taking the
//! larger peak power.

use crate::store::{read_groups, EventGroup};
use anyhow::Context;
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::info;

/// Which power datasets to flatten
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum PsdSelection {
    /// Band-integrated power, bands summed
    #[default]
    Integrated,
    /// In-band peak power, elementwise maximum of the bands
    Max,
}

impl PsdSelection {
    pub fn units(&self) -> &'static str {
        match self {
            PsdSelection::Integrated => "B: nT^2, E: mV^2/m^2, delay: s, mlt: hr, mlat: deg",
            PsdSelection::Max => "B: nT^2/Hz, E: mV^2/m^2/Hz, delay: s, mlt: hr, mlat: deg",
        }
    }

    fn combine(&self, lower: f64, upper: f64) -> f64 {
        match self {
            PsdSelection::Integrated => lower + upper,
            PsdSelection::Max => lower.max(upper),
        }
    }
}

impl fmt::Display for PsdSelection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PsdSelection::Integrated => write!(f, "integrated"),
            PsdSelection::Max => write!(f, "max"),
        }
    }
}

/// Field component of a chorus series
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    /// Magnetic
    B,
    /// Electric
    E,
}

/// Borrowed view of one component's three chorus series
#[derive(Debug, Clone, Copy)]
pub struct ComponentSeries<'a> {
    pub chorus: &'a [f64],
    pub lbc: &'a [f64],
    pub ubc: &'a [f64],
}

/// Flattened, co-indexed analysis arrays
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AnalysisData {
    pub psd_selection: PsdSelection,
    pub units: String,
    pub ubc_b: Vec<f64>,
    pub lbc_b: Vec<f64>,
    pub chorus_b: Vec<f64>,
    pub ubc_e: Vec<f64>,
    pub lbc_e: Vec<f64>,
    pub chorus_e: Vec<f64>,
    pub delay: Vec<f64>,
    pub mlt: Vec<f64>,
    pub l: Vec<f64>,
    pub mlat: Vec<f64>,
}

impl AnalysisData {
    pub fn len(&self) -> usize {
        self.delay.len()
    }

    pub fn is_empty(&self) -> bool {
        self.delay.is_empty()
    }

    pub fn component(&self, component: Component) -> ComponentSeries<'_> {
        match component {
            Component::B => ComponentSeries {
                chorus: &self.chorus_b,
                lbc: &self.lbc_b,
                ubc: &self.ubc_b,
            },
            Component::E => ComponentSeries {
                chorus: &self.chorus_e,
                lbc: &self.lbc_e,
                ubc: &self.ubc_e,
            },
        }
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let json = serde_json::to_string(self).context("Failed to encode analysis data")?;
        std::fs::write(path, json)
            .with_context(|| format!("Failed to write analysis data: {}", path.display()))?;
        Ok(())
    }

    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read analysis data: {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse analysis data: {}", path.display()))
    }
}

/// Replace NaN with 0 and infinities with the largest finite values
pub fn nan_to_num(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else if value == f64::INFINITY {
        f64::MAX
    } else if value == f64::NEG_INFINITY {
        f64::MIN
    } else {
        value
    }
}

fn extend_clean(target: &mut Vec<f64>, values: &[f64]) {
    target.extend(values.iter().copied().map(nan_to_num));
}

/// Concatenate groups into analysis arrays
pub fn flatten<'a>(
    groups: impl IntoIterator<Item = &'a EventGroup>,
    selection: PsdSelection,
) -> AnalysisData {
    let mut data = AnalysisData {
        psd_selection: selection,
        units: selection.units().to_string(),
        ..AnalysisData::default()
    };

    for (n, group) in groups.into_iter().enumerate() {
        let (ubc_b, lbc_b, ubc_e, lbc_e) = match selection {
            PsdSelection::Integrated => (&group.b_ubc, &group.b_lbc, &group.e_ubc, &group.e_lbc),
            PsdSelection::Max => (
                &group.b_ubc_max,
                &group.b_lbc_max,
                &group.e_ubc_max,
                &group.e_lbc_max,
            ),
        };
        extend_clean(&mut data.ubc_b, ubc_b);
        extend_clean(&mut data.lbc_b, lbc_b);
        extend_clean(&mut data.ubc_e, ubc_e);
        extend_clean(&mut data.lbc_e, lbc_e);
        extend_clean(&mut data.delay, &group.delay);
        extend_clean(&mut data.mlt, &group.mlt);
        extend_clean(&mut data.l, &group.l);
        extend_clean(&mut data.mlat, &group.mlat);

        if n % 100 == 0 {
            info!(groups = n, "flattening");
        }
    }

    data.chorus_b = combine(&data.lbc_b, &data.ubc_b, selection);
    data.chorus_e = combine(&data.lbc_e, &data.ubc_e, selection);
    data
}

fn combine(lower: &[f64], upper: &[f64], selection: PsdSelection) -> Vec<f64> {
    lower
        .iter()
        .zip(upper)
        .map(|(l, u)| selection.combine(*l, *u))
        .collect()
}

/// Read a store and flatten all of its groups
pub fn flatten_store(path: &Path, selection: PsdSelection) -> anyhow::Result<AnalysisData> {
    let (_, groups) =
        read_groups(path).with_context(|| format!("Failed to read store: {}", path.display()))?;
    let data = flatten(groups.iter().map(|(_, group)| group), selection);
    info!(groups = groups.len(), samples = data.len(), %selection, "flattened store");
    Ok(data)
}
