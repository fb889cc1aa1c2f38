/*! Pairwise dissimilarity between boolean presence profiles */
use std::fmt::Display;
use std::str::FromStr;

#[cfg(feature = "parallelism")]
use rayon::prelude::*;

use crate::matrix::OneHotMatrix;

pub type DistanceFn = fn(&[bool], &[bool]) -> f64;

/// The proportion of positions that disagree among the positions where at least one
/// profile is present. Two empty profiles are at distance zero.
pub fn jaccard(u: &[bool], v: &[bool]) -> f64 {
    let (mut differ, mut either) = (0usize, 0usize);
    for (a, b) in u.iter().zip(v) {
        differ += (a ^ b) as usize;
        either += (a | b) as usize;
    }
    if either == 0 {
        0.0
    } else {
        differ as f64 / either as f64
    }
}

/// `sum(|u - v|) / sum(|u + v|)`, which for boolean profiles is the number of
/// disagreements over the total number of presences. Two empty profiles are at
/// distance zero.
pub fn bray_curtis(u: &[bool], v: &[bool]) -> f64 {
    let (mut differ, mut total) = (0usize, 0usize);
    for (a, b) in u.iter().zip(v) {
        differ += (a ^ b) as usize;
        total += *a as usize + *b as usize;
    }
    if total == 0 {
        0.0
    } else {
        differ as f64 / total as f64
    }
}

/// The dissimilarity measures available for clustering
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum DistanceMetric {
    #[default]
    Jaccard,
    BrayCurtis,
}

impl DistanceMetric {
    pub const fn function(&self) -> DistanceFn {
        match self {
            Self::Jaccard => jaccard,
            Self::BrayCurtis => bray_curtis,
        }
    }

    pub fn distance(&self, u: &[bool], v: &[bool]) -> f64 {
        (self.function())(u, v)
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Jaccard => "jaccard",
            Self::BrayCurtis => "braycurtis",
        }
    }
}

impl Display for DistanceMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for DistanceMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jaccard" => Ok(Self::Jaccard),
            "braycurtis" | "bray-curtis" => Ok(Self::BrayCurtis),
            _ => Err(format!("Unknown distance metric {s:?}")),
        }
    }
}

/// The upper triangle of a symmetric distance matrix with a zero diagonal, stored
/// row by row.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CondensedDistanceMatrix {
    n: usize,
    values: Vec<f64>,
}

impl CondensedDistanceMatrix {
    /// # Panics
    /// If `values` does not hold `n * (n - 1) / 2` entries
    pub fn new(n: usize, values: Vec<f64>) -> Self {
        assert_eq!(values.len(), n * n.saturating_sub(1) / 2);
        Self { n, values }
    }

    /// Compute all pairwise distances between the rows of `matrix`
    pub fn from_matrix(matrix: &OneHotMatrix, metric: DistanceMetric) -> Self {
        let n = matrix.n_rows();
        let func = metric.function();
        let row_distances = |i: usize| -> Vec<f64> {
            let u = matrix.row(i);
            ((i + 1)..n).map(|j| func(u, matrix.row(j))).collect()
        };

        #[cfg(feature = "parallelism")]
        let blocks: Vec<Vec<f64>> = (0..n).into_par_iter().map(row_distances).collect();
        #[cfg(not(feature = "parallelism"))]
        let blocks: Vec<Vec<f64>> = (0..n).map(row_distances).collect();

        Self::new(n, blocks.concat())
    }

    pub fn len(&self) -> usize {
        self.n
    }

    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    #[inline]
    pub fn condensed_index(&self, i: usize, j: usize) -> usize {
        let (i, j) = if i < j { (i, j) } else { (j, i) };
        self.n * i - (i * (i + 1)) / 2 + (j - i - 1)
    }

    pub fn get(&self, i: usize, j: usize) -> f64 {
        if i == j {
            0.0
        } else {
            self.values[self.condensed_index(i, j)]
        }
    }
}
