//! Every tunable option of the matching, binning and clustering pipeline
use mzpeaks::Tolerance;

use crate::distance::DistanceMetric;
use crate::resolve::SampleColumn;
use crate::spectrum::Spectrum;

pub const DEFAULT_MZ_TOLERANCE: f64 = 0.002;
pub const DEFAULT_RETENTION_TOLERANCE: f64 = 5.0;
pub const DEFAULT_BIN_THRESHOLD: f64 = 8e-4;
pub const DEFAULT_CUTOFF: f64 = 0.6;
pub const DEFAULT_EPS: f32 = 0.01;

#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default, deny_unknown_fields)
)]
pub struct PipelineParams {
    /// The precursor m/z window, in Daltons, for matching a component to a spectrum
    pub mz_tolerance: f64,
    /// The retention time window, in seconds, for matching a component to a spectrum
    pub retention_tolerance: f64,
    /// The smallest gap between consecutive fragment m/z values that starts a new bin
    pub bin_threshold: f64,
    /// Express fragments as their loss from the precursor m/z
    pub neutral_loss: bool,
    pub clustering_method: DistanceMetric,
    /// The linkage distance at which the tree is cut into clusters
    pub cutoff: f64,
    /// Scale fragment intensities relative to each spectrum's most intense fragment
    pub scaling: bool,
    /// Remove fragments with intensities below `eps`
    pub filtering: bool,
    pub eps: f32,
    pub sample_column: SampleColumn,
}

impl Default for PipelineParams {
    fn default() -> Self {
        Self {
            mz_tolerance: DEFAULT_MZ_TOLERANCE,
            retention_tolerance: DEFAULT_RETENTION_TOLERANCE,
            bin_threshold: DEFAULT_BIN_THRESHOLD,
            neutral_loss: false,
            clustering_method: DistanceMetric::Jaccard,
            cutoff: DEFAULT_CUTOFF,
            scaling: false,
            filtering: false,
            eps: DEFAULT_EPS,
            sample_column: SampleColumn::Component,
        }
    }
}

impl PipelineParams {
    pub fn mz_tolerance(&self) -> Tolerance {
        Tolerance::Da(self.mz_tolerance)
    }

    /// Apply the configured intensity scaling and filtering to `spectrum`.
    /// Scaling happens first, so `eps` is relative when both are enabled.
    pub fn preprocess(&self, spectrum: Spectrum) -> Spectrum {
        let spectrum = if self.scaling {
            spectrum.scaled()
        } else {
            spectrum
        };
        if self.filtering {
            spectrum.filtered(self.eps)
        } else {
            spectrum
        }
    }
}
