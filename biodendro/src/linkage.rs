/*! Complete-linkage agglomerative clustering and distance-based tree cutting.

The merge tree follows the usual linkage-matrix conventions: leaves are numbered
`0..n`, and the sub-cluster created by merge step `k` is numbered `n + k`.
*/
use std::collections::HashMap;

use thiserror::Error;
use tracing::trace;

use crate::distance::{CondensedDistanceMatrix, DistanceMetric};
use crate::matrix::OneHotMatrix;

/// An error raised when the input cannot support a clustering
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClusteringError {
    #[error("At least two samples are required to build a cluster tree, but only {0} were found")]
    TooFewSamples(usize),
    #[error("The presence matrix of {0} samples has no bins to cluster on")]
    NoFeatures(usize),
}

/// One agglomeration step
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MergeStep {
    /// The smaller of the two merged cluster ids
    pub left: usize,
    /// The larger of the two merged cluster ids
    pub right: usize,
    /// The inter-cluster distance at which the merge happened
    pub distance: f64,
    /// The number of leaves below this merge
    pub size: usize,
}

impl MergeStep {
    pub fn new(left: usize, right: usize, distance: f64, size: usize) -> Self {
        Self {
            left,
            right,
            distance,
            size,
        }
    }
}

/// Tracks sub-cluster ids while relabelling a merge sequence
struct LinkageUnionFind {
    parent: Vec<usize>,
    size: Vec<usize>,
    next_label: usize,
}

impl LinkageUnionFind {
    fn new(n: usize) -> Self {
        Self {
            parent: (0..(2 * n - 1)).collect(),
            size: vec![1; 2 * n - 1],
            next_label: n,
        }
    }

    fn merge(&mut self, x: usize, y: usize) -> usize {
        self.parent[x] = self.next_label;
        self.parent[y] = self.next_label;
        let size = self.size[x] + self.size[y];
        self.size[self.next_label] = size;
        self.next_label += 1;
        size
    }

    fn find(&mut self, mut x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }
        while self.parent[x] != root {
            let next = self.parent[x];
            self.parent[x] = root;
            x = next;
        }
        root
    }
}

/// A binary merge tree over `n_leaves` samples
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LinkageTree {
    n_leaves: usize,
    steps: Vec<MergeStep>,
}

impl LinkageTree {
    pub fn new(n_leaves: usize, steps: Vec<MergeStep>) -> Self {
        Self { n_leaves, steps }
    }

    /// Cluster the rows of `matrix` under `metric` with complete linkage
    pub fn fit(matrix: &OneHotMatrix, metric: DistanceMetric) -> Result<Self, ClusteringError> {
        if matrix.n_rows() < 2 {
            return Err(ClusteringError::TooFewSamples(matrix.n_rows()));
        }
        if matrix.n_columns() == 0 {
            return Err(ClusteringError::NoFeatures(matrix.n_rows()));
        }
        let distances = CondensedDistanceMatrix::from_matrix(matrix, metric);
        Self::complete(&distances)
    }

    /// Build a complete-linkage tree with the nearest-neighbor chain algorithm.
    ///
    /// The inter-cluster distance is the largest pairwise distance between members.
    /// Merges are returned ordered by distance, ties kept in discovery order.
    pub fn complete(distances: &CondensedDistanceMatrix) -> Result<Self, ClusteringError> {
        let n = distances.len();
        if n < 2 {
            return Err(ClusteringError::TooFewSamples(n));
        }

        let mut dists = distances.values().to_vec();
        let index = |i: usize, j: usize| distances.condensed_index(i, j);
        let mut size = vec![1usize; n];
        let mut chain: Vec<usize> = Vec::with_capacity(n);
        let mut steps = Vec::with_capacity(n - 1);

        for _ in 0..(n - 1) {
            if chain.is_empty() {
                if let Some(first) = size.iter().position(|s| *s > 0) {
                    chain.push(first);
                }
            }

            let (x, y, current_min) = loop {
                let x = chain[chain.len() - 1];
                // Prefer the previous chain element to avoid cycling between ties
                let (mut y, mut current_min) = if chain.len() > 1 {
                    let prev = chain[chain.len() - 2];
                    (Some(prev), dists[index(x, prev)])
                } else {
                    (None, f64::INFINITY)
                };
                for i in 0..n {
                    if size[i] == 0 || i == x {
                        continue;
                    }
                    let dist = dists[index(x, i)];
                    if dist < current_min {
                        current_min = dist;
                        y = Some(i);
                    }
                }
                let y = y.unwrap_or_else(|| {
                    (0..n)
                        .find(|i| size[*i] > 0 && *i != x)
                        .unwrap_or(x)
                });
                if chain.len() > 1 && y == chain[chain.len() - 2] {
                    break (x, y, current_min);
                }
                chain.push(y);
            };
            chain.truncate(chain.len() - 2);

            let (x, y) = if x > y { (y, x) } else { (x, y) };
            let (nx, ny) = (size[x], size[y]);
            trace!("Merging {x} and {y} at {current_min}");
            steps.push(MergeStep::new(x, y, current_min, nx + ny));
            size[x] = 0;
            size[y] = nx + ny;

            for i in 0..n {
                if size[i] == 0 || i == y {
                    continue;
                }
                let ix = index(i, x);
                let iy = index(i, y);
                dists[iy] = dists[ix].max(dists[iy]);
            }
        }

        steps.sort_by(|a, b| a.distance.total_cmp(&b.distance));

        let mut uf = LinkageUnionFind::new(n);
        for step in steps.iter_mut() {
            let x_root = uf.find(step.left);
            let y_root = uf.find(step.right);
            let (left, right) = if x_root < y_root {
                (x_root, y_root)
            } else {
                (y_root, x_root)
            };
            step.left = left;
            step.right = right;
            step.size = uf.merge(x_root, y_root);
        }

        Ok(Self::new(n, steps))
    }

    pub fn n_leaves(&self) -> usize {
        self.n_leaves
    }

    pub fn steps(&self) -> &[MergeStep] {
        &self.steps
    }

    /// The node created by the final merge, or the lone leaf. `None` for an
    /// empty tree.
    pub fn root(&self) -> Option<usize> {
        (2 * self.n_leaves).checked_sub(2)
    }

    pub fn is_leaf(&self, node: usize) -> bool {
        node < self.n_leaves
    }

    /// The merge that created `node`, if it is not a leaf
    pub fn step(&self, node: usize) -> Option<&MergeStep> {
        node.checked_sub(self.n_leaves)
            .and_then(|k| self.steps.get(k))
    }

    /// The largest merge distance at or below each internal node
    pub fn max_distances(&self) -> Vec<f64> {
        let n = self.n_leaves;
        let mut max_dists = Vec::with_capacity(self.steps.len());
        // Children are always created before their parents
        for step in self.steps.iter() {
            let mut value = step.distance;
            for child in [step.left, step.right] {
                if child >= n {
                    value = value.max(max_dists[child - n]);
                }
            }
            max_dists.push(value);
        }
        max_dists
    }

    /// Assign each leaf a flat cluster id, numbered from 1, such that leaves whose
    /// lowest common merge lies above `threshold` land in different clusters.
    pub fn cut(&self, threshold: f64) -> Vec<usize> {
        let n = self.n_leaves;
        let mut assignment = vec![0usize; n];
        if self.steps.is_empty() {
            if n == 1 {
                assignment[0] = 1;
            }
            return assignment;
        }

        let Some(root) = self.root() else {
            return assignment;
        };
        let max_dists = self.max_distances();
        let mut visited = vec![false; 2 * n - 1];
        let mut stack = vec![root];
        let mut leader: Option<usize> = None;
        let mut n_cluster = 0;

        while let Some(&node) = stack.last() {
            let k = node - n;
            let step = self.steps[k];
            if leader.is_none() && max_dists[k] <= threshold {
                leader = Some(k);
                n_cluster += 1;
            }
            if step.left >= n && !visited[step.left] {
                visited[step.left] = true;
                stack.push(step.left);
                continue;
            }
            if step.right >= n && !visited[step.right] {
                visited[step.right] = true;
                stack.push(step.right);
                continue;
            }
            for child in [step.left, step.right] {
                if child < n {
                    if leader.is_none() {
                        n_cluster += 1;
                    }
                    assignment[child] = n_cluster;
                }
            }
            if leader == Some(k) {
                leader = None;
            }
            stack.pop();
        }
        assignment
    }
}

/// The flat cluster id of every sample, after cutting a [`LinkageTree`]
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClusterAssignment {
    labels: Vec<String>,
    clusters: Vec<usize>,
}

impl ClusterAssignment {
    /// # Panics
    /// If `labels` and `clusters` differ in length
    pub fn new(labels: Vec<String>, clusters: Vec<usize>) -> Self {
        assert_eq!(labels.len(), clusters.len());
        Self { labels, clusters }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn clusters(&self) -> &[usize] {
        &self.clusters
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> + '_ {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.clusters.iter().copied())
    }

    pub fn cluster_of(&self, label: &str) -> Option<usize> {
        self.labels
            .iter()
            .position(|l| l == label)
            .map(|i| self.clusters[i])
    }

    /// Index every label to its cluster id, for repeated lookups
    pub fn by_label(&self) -> HashMap<&str, usize> {
        self.labels
            .iter()
            .map(String::as_str)
            .zip(self.clusters.iter().copied())
            .collect()
    }

    /// The distinct cluster ids in ascending order
    pub fn cluster_ids(&self) -> Vec<usize> {
        let mut ids = self.clusters.clone();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn n_clusters(&self) -> usize {
        self.cluster_ids().len()
    }

    /// The sample indices belonging to `cluster`
    pub fn members(&self, cluster: usize) -> Vec<usize> {
        self.clusters
            .iter()
            .enumerate()
            .filter(|(_, c)| **c == cluster)
            .map(|(i, _)| i)
            .collect()
    }

    pub fn sizes(&self) -> HashMap<usize, usize> {
        let mut sizes = HashMap::new();
        for c in self.clusters.iter() {
            *sizes.entry(*c).or_default() += 1;
        }
        sizes
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn four_rows() -> OneHotMatrix {
        // a and b are identical, c and d are both distinct from everything
        OneHotMatrix::pivot([
            ("a", "x"),
            ("a", "y"),
            ("b", "x"),
            ("b", "y"),
            ("c", "y"),
            ("c", "z"),
            ("d", "w"),
        ])
    }

    #[test]
    fn test_complete_linkage() {
        let tree = LinkageTree::fit(&four_rows(), DistanceMetric::Jaccard).unwrap();
        assert_eq!(tree.n_leaves(), 4);
        let steps = tree.steps();
        assert_eq!(steps.len(), 3);
        assert_eq!(steps[0], MergeStep::new(0, 1, 0.0, 2));
        // c joins a/b at max(d(a,c), d(b,c)) = 2/3
        assert_eq!(steps[1].left, 2);
        assert_eq!(steps[1].right, 4);
        assert!((steps[1].distance - 2.0 / 3.0).abs() < 1e-12);
        assert_eq!(steps[1].size, 3);
        assert_eq!(steps[2], MergeStep::new(3, 5, 1.0, 4));
        assert_eq!(tree.root(), Some(6));
        assert_eq!(tree.step(6).map(|s| s.size), Some(4));
        assert!(tree.step(2).is_none());
    }

    #[test]
    fn test_known_distances() {
        // Five points where the chain discovers merges out of distance order
        let dists = vec![
            1.0, 4.0, 9.0, 7.0, // 0
            3.0, 8.0, 6.0, // 1
            5.0, 5.0, // 2
            2.0, // 3
        ];
        let dm = CondensedDistanceMatrix::new(5, dists);
        let tree = LinkageTree::complete(&dm).unwrap();
        let flat: Vec<(usize, usize, f64, usize)> = tree
            .steps()
            .iter()
            .map(|s| (s.left, s.right, s.distance, s.size))
            .collect();
        assert_eq!(
            flat,
            vec![(0, 1, 1.0, 2), (3, 4, 2.0, 2), (2, 5, 4.0, 3), (6, 7, 9.0, 5)]
        );
        assert_eq!(tree.max_distances(), [1.0, 2.0, 4.0, 9.0]);
        assert_eq!(tree.cut(0.5), [3, 4, 5, 1, 2]);
        assert_eq!(tree.cut(3.0), [2, 2, 3, 1, 1]);
        assert_eq!(tree.cut(4.0), [2, 2, 2, 1, 1]);
        assert_eq!(tree.cut(10.0), [1, 1, 1, 1, 1]);
    }

    #[test]
    fn test_cut_round_trip() {
        let tree = LinkageTree::fit(&four_rows(), DistanceMetric::Jaccard).unwrap();
        let high = tree.cut(1.0);
        assert!(high.iter().all(|c| *c == 1));

        let low = tree.cut(0.0);
        assert_eq!(low[0], low[1]);
        let mut distinct = low.clone();
        distinct.sort_unstable();
        distinct.dedup();
        assert_eq!(distinct.len(), 3);
    }

    #[test]
    fn test_degenerate_inputs() {
        let one = OneHotMatrix::pivot([("a", "x")]);
        assert_eq!(
            LinkageTree::fit(&one, DistanceMetric::Jaccard),
            Err(ClusteringError::TooFewSamples(1))
        );
        let no_columns = OneHotMatrix::new(vec!["a".into(), "b".into()], vec![], vec![]);
        assert_eq!(
            LinkageTree::fit(&no_columns, DistanceMetric::BrayCurtis),
            Err(ClusteringError::NoFeatures(2))
        );
    }

    #[test]
    fn test_empty_tree() {
        let empty = LinkageTree::new(0, vec![]);
        assert_eq!(empty.root(), None);
        assert!(empty.cut(1.0).is_empty());

        let single = LinkageTree::new(1, vec![]);
        assert_eq!(single.root(), Some(0));
        assert_eq!(single.cut(1.0), [1]);
    }

    #[test]
    fn test_assignment() {
        let assignment = ClusterAssignment::new(
            vec!["a".into(), "b".into(), "c".into()],
            vec![2, 1, 2],
        );
        assert_eq!(assignment.cluster_of("c"), Some(2));
        assert_eq!(assignment.cluster_of("z"), None);
        let by_label = assignment.by_label();
        assert_eq!(by_label.len(), 3);
        assert_eq!(by_label["b"], 1);
        assert_eq!(assignment.cluster_ids(), [1, 2]);
        assert_eq!(assignment.members(2), [0, 2]);
        assert_eq!(assignment.sizes()[&2], 2);
        assert_eq!(assignment.n_clusters(), 2);
    }
}
