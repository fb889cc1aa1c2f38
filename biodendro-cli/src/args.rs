use std::fmt::Display;

use clap::{Args, ValueEnum};
use serde::Serialize;

use biodendro::dendrogram::Orientation;
use biodendro::{DistanceMetric, SampleColumn};

pub(crate) fn non_negative_float(s: &str) -> Result<f64, String> {
    let value = s.parse::<f64>().map_err(|e| e.to_string())?;
    if value.is_nan() {
        Err(format!("`{s}` is not a number"))
    } else if value < 0.0 {
        Err(format!("`{s}` is less than zero"))
    } else {
        Ok(value)
    }
}

fn non_negative_float_f32(s: &str) -> Result<f32, String> {
    non_negative_float(s).map(|v| v as f32)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ArgDistanceMetric {
    #[default]
    /// The fraction of disagreeing bins among the bins either sample has
    Jaccard,
    /// The disagreeing bins over the total bins present in both samples
    #[value(alias = "bray-curtis")]
    BrayCurtis,
}

impl From<ArgDistanceMetric> for DistanceMetric {
    fn from(value: ArgDistanceMetric) -> Self {
        match value {
            ArgDistanceMetric::Jaccard => DistanceMetric::Jaccard,
            ArgDistanceMetric::BrayCurtis => DistanceMetric::BrayCurtis,
        }
    }
}

impl Display for ArgDistanceMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", DistanceMetric::from(*self))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgSampleColumn {
    /// One row per component
    Component,
    /// One row per matched spectrum
    Spectrum,
}

impl From<ArgSampleColumn> for SampleColumn {
    fn from(value: ArgSampleColumn) -> Self {
        match value {
            ArgSampleColumn::Component => SampleColumn::Component,
            ArgSampleColumn::Spectrum => SampleColumn::Spectrum,
        }
    }
}

impl Display for ArgSampleColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(SampleColumn::from(*self).name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArgOrientation {
    Top,
    Bottom,
    Left,
    Right,
}

impl From<ArgOrientation> for Orientation {
    fn from(value: ArgOrientation) -> Self {
        match value {
            ArgOrientation::Top => Orientation::Top,
            ArgOrientation::Bottom => Orientation::Bottom,
            ArgOrientation::Left => Orientation::Left,
            ArgOrientation::Right => Orientation::Right,
        }
    }
}

impl Display for ArgOrientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", Orientation::from(*self))
    }
}

/// Command line overrides for the pipeline parameters.
///
/// Only the options actually given are serialized, so that they take precedence
/// over configuration files without clobbering them with defaults.
#[derive(Debug, Clone, Default, Args, Serialize)]
pub struct ParamArgs {
    /// The precursor m/z tolerance, in Daltons, when matching components to spectra [default: 0.002]
    #[arg(long = "mz-tol", value_parser = non_negative_float)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mz_tolerance: Option<f64>,

    /// The retention time tolerance, in seconds, when matching components to spectra [default: 5]
    #[arg(long = "rt-tol", value_parser = non_negative_float)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retention_tolerance: Option<f64>,

    /// The smallest m/z gap between neighboring fragments that starts a new bin [default: 0.0008]
    #[arg(short = 'b', long = "bin-threshold", value_parser = non_negative_float)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bin_threshold: Option<f64>,

    /// Bin fragments by their neutral loss from the precursor instead of their m/z
    #[arg(short = 'n', long = "neutral")]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub neutral_loss: bool,

    /// The distance metric between bin presence profiles [default: jaccard]
    #[arg(short = 'd', long = "cluster-method")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub clustering_method: Option<ArgDistanceMetric>,

    /// The linkage distance to cut the cluster tree at [default: 0.6]
    #[arg(short = 'c', long = "cutoff", value_parser = non_negative_float)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cutoff: Option<f64>,

    /// Scale fragment intensities to each spectrum's most intense fragment
    #[arg(long = "scaling")]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub scaling: bool,

    /// Drop fragments less intense than `--eps`
    #[arg(long = "filtering")]
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub filtering: bool,

    /// The intensity below which fragments are dropped when filtering [default: 0.01]
    #[arg(long = "eps", value_parser = non_negative_float_f32)]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eps: Option<f32>,

    /// Which identifier keys the rows of the presence matrix [default: component]
    #[arg(long = "sample-column")]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sample_column: Option<ArgSampleColumn>,
}
