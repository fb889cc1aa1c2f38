/*! The clustering of matched fragment rows, end to end.

A [`Tree`] owns everything derived from one set of [`MatchedRow`]s: the bin label of
each row, the presence matrix, the merge tree and the flat clusters at the current
cutoff.
*/
use tracing::{debug, info};

use crate::binning::assign_bins;
use crate::dendrogram::{extract, DendrogramGeometry, Orientation};
use crate::distance::DistanceMetric;
use crate::linkage::{ClusterAssignment, ClusteringError, LinkageTree};
use crate::matrix::OneHotMatrix;
use crate::params::PipelineParams;
use crate::resolve::{MatchedRow, SampleColumn};

/// The members of one flat cluster and their presence profile
#[derive(Debug, Clone, PartialEq)]
pub struct ClusterSummary {
    pub cluster: usize,
    /// The member rows of the presence matrix, without bins absent from all of them
    pub table: OneHotMatrix,
    /// The fraction of members with each bin of `table`
    pub frequencies: Vec<f64>,
}

impl ClusterSummary {
    pub fn size(&self) -> usize {
        self.table.n_rows()
    }

    /// The name this cluster's output files use
    pub fn file_stem(&self) -> String {
        format!("cluster_{}_{}", self.cluster, self.size())
    }
}

#[derive(Debug, Clone)]
pub struct Tree {
    rows: Vec<MatchedRow>,
    bins: Vec<String>,
    onehot: OneHotMatrix,
    linkage: LinkageTree,
    clusters: ClusterAssignment,
    metric: DistanceMetric,
    sample_column: SampleColumn,
    bin_threshold: f64,
    cutoff: f64,
}

impl Tree {
    /// Bin `rows`, build the presence matrix, cluster it and cut at `params.cutoff`
    pub fn fit(mut rows: Vec<MatchedRow>, params: &PipelineParams) -> Result<Self, ClusteringError> {
        rows.sort_by(|a, b| a.mz.total_cmp(&b.mz));
        let mzs: Vec<f64> = rows.iter().map(|r| r.mz).collect();
        let bins = assign_bins(&mzs, params.bin_threshold);

        let onehot = OneHotMatrix::from_matched_rows(&rows, &bins, params.sample_column)
            .exclude_false_columns();
        info!(
            "Built a presence matrix of {} samples by {} bins",
            onehot.n_rows(),
            onehot.n_columns()
        );

        let linkage = LinkageTree::fit(&onehot, params.clustering_method)?;
        debug!("Built a cluster tree with {} merges", linkage.steps().len());

        let mut this = Self {
            rows,
            bins,
            onehot,
            linkage,
            clusters: ClusterAssignment::default(),
            metric: params.clustering_method,
            sample_column: params.sample_column,
            bin_threshold: params.bin_threshold,
            cutoff: params.cutoff,
        };
        this.cut(params.cutoff);
        Ok(this)
    }

    /// Recompute the flat clusters at a new cutoff distance
    pub fn cut(&mut self, cutoff: f64) -> &ClusterAssignment {
        let clusters = self.linkage.cut(cutoff);
        self.clusters = ClusterAssignment::new(self.onehot.row_labels().to_vec(), clusters);
        self.cutoff = cutoff;
        info!(
            "Cutting the tree at {cutoff} gave {} clusters",
            self.clusters.n_clusters()
        );
        &self.clusters
    }

    pub fn rows(&self) -> &[MatchedRow] {
        &self.rows
    }

    /// The bin label of each entry of [`Tree::rows`]
    pub fn bins(&self) -> &[String] {
        &self.bins
    }

    pub fn onehot(&self) -> &OneHotMatrix {
        &self.onehot
    }

    pub fn linkage(&self) -> &LinkageTree {
        &self.linkage
    }

    pub fn clusters(&self) -> &ClusterAssignment {
        &self.clusters
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn sample_column(&self) -> SampleColumn {
        self.sample_column
    }

    pub fn bin_threshold(&self) -> f64 {
        self.bin_threshold
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    /// The presence matrix with each row's cluster id
    pub fn cluster_table(&self) -> impl Iterator<Item = (usize, &str, &[bool])> + '_ {
        self.onehot
            .iter_rows()
            .zip(self.clusters.clusters().iter().copied())
            .map(|((label, row), cluster)| (cluster, label, row))
    }

    /// The presence matrix of the members of `cluster`, or `None` if it has no members
    pub fn cluster_members(&self, cluster: usize) -> Option<OneHotMatrix> {
        let members = self.clusters.members(cluster);
        if members.is_empty() {
            return None;
        }
        Some(self.onehot.select_rows(&members).exclude_false_columns())
    }

    /// The bins present in `cluster` and the fraction of its members having each
    pub fn bin_frequencies(&self, cluster: usize) -> Option<(Vec<String>, Vec<f64>)> {
        self.cluster_members(cluster)
            .map(|table| (table.column_labels().to_vec(), table.column_frequencies()))
    }

    pub fn summarize(&self, cluster: usize) -> Option<ClusterSummary> {
        self.cluster_members(cluster).map(|table| {
            let frequencies = table.column_frequencies();
            ClusterSummary {
                cluster,
                table,
                frequencies,
            }
        })
    }

    /// A [`ClusterSummary`] for every cluster, in ascending id order
    pub fn summaries(&self) -> Vec<ClusterSummary> {
        self.clusters
            .cluster_ids()
            .into_iter()
            .filter_map(|cluster| self.summarize(cluster))
            .collect()
    }

    /// The drawable tree, colored below the current cutoff
    pub fn dendrogram(&self, orientation: Orientation) -> DendrogramGeometry {
        extract(
            &self.linkage,
            self.onehot.row_labels(),
            orientation,
            self.cutoff,
        )
    }
}
