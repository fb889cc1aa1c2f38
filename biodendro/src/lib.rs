//! Cluster the MSMS fragmentation profiles of target components.
//!
//! Components are matched to their closest trigger spectrum in a [`SpectrumIndex`],
//! the matched fragments are grouped into m/z bins, and the resulting presence
//! matrix is clustered into a [`Tree`] whose [`dendrogram`] can be drawn.
pub mod binning;
pub mod dendrogram;
pub mod distance;
pub mod index;
pub mod io;
pub mod linkage;
pub mod matrix;
pub mod params;
pub mod resolve;
pub mod spectrum;
pub mod tree;

pub use distance::DistanceMetric;
pub use index::SpectrumIndex;
pub use linkage::{ClusterAssignment, ClusteringError, LinkageTree};
pub use matrix::OneHotMatrix;
pub use params::PipelineParams;
pub use resolve::{resolve, MatchSummary, MatchedRow, SampleColumn};
pub use spectrum::{Component, Ion, Spectrum};
pub use tree::{ClusterSummary, Tree};
