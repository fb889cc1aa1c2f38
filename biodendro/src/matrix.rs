/*! A boolean presence/absence matrix of samples by bins */
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Index;

use crate::resolve::{MatchedRow, SampleColumn};

/// A dense, row-major boolean matrix with labelled rows and columns.
///
/// Rows and columns are kept in lexicographic label order. Callers should address
/// rows by label rather than rely on input order.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct OneHotMatrix {
    rows: Vec<String>,
    columns: Vec<String>,
    data: Vec<bool>,
}

impl OneHotMatrix {
    /// Build a matrix from explicit labels and row-major cells.
    ///
    /// # Panics
    /// If `data` does not hold exactly `rows.len() * columns.len()` cells
    pub fn new(rows: Vec<String>, columns: Vec<String>, data: Vec<bool>) -> Self {
        assert_eq!(
            rows.len() * columns.len(),
            data.len(),
            "The cell count must equal rows x columns"
        );
        Self {
            rows,
            columns,
            data,
        }
    }

    /// Spread `(sample, bin)` pairs into a presence matrix. Repeated pairs collapse
    /// into a single `true` cell.
    pub fn pivot<'a, I: IntoIterator<Item = (&'a str, &'a str)>>(pairs: I) -> Self {
        let pairs: Vec<(&str, &str)> = pairs.into_iter().collect();
        let row_labels: BTreeSet<&str> = pairs.iter().map(|(r, _)| *r).collect();
        let column_labels: BTreeSet<&str> = pairs.iter().map(|(_, c)| *c).collect();

        let row_index: BTreeMap<&str, usize> = row_labels
            .iter()
            .enumerate()
            .map(|(i, label)| (*label, i))
            .collect();
        let column_index: BTreeMap<&str, usize> = column_labels
            .iter()
            .enumerate()
            .map(|(i, label)| (*label, i))
            .collect();

        let n_columns = column_labels.len();
        let mut data = vec![false; row_labels.len() * n_columns];
        for (row, column) in pairs.iter() {
            data[row_index[row] * n_columns + column_index[column]] = true;
        }

        Self::new(
            row_labels.into_iter().map(String::from).collect(),
            column_labels.into_iter().map(String::from).collect(),
            data,
        )
    }

    /// Pivot matched rows against their bin labels, keyed by `sample_column`
    pub fn from_matched_rows(
        rows: &[MatchedRow],
        bins: &[String],
        sample_column: SampleColumn,
    ) -> Self {
        Self::pivot(
            rows.iter()
                .zip(bins.iter())
                .map(|(row, bin)| (sample_column.select(row), bin.as_str())),
        )
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.columns.is_empty()
    }

    pub fn row_labels(&self) -> &[String] {
        &self.rows
    }

    pub fn column_labels(&self) -> &[String] {
        &self.columns
    }

    pub fn row(&self, index: usize) -> &[bool] {
        let n = self.n_columns();
        &self.data[index * n..(index + 1) * n]
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = (&str, &[bool])> + '_ {
        self.rows
            .iter()
            .enumerate()
            .map(|(i, label)| (label.as_str(), self.row(i)))
    }

    pub fn find_row(&self, label: &str) -> Option<usize> {
        self.rows.binary_search_by(|r| r.as_str().cmp(label)).ok()
    }

    pub fn get(&self, row: usize, column: usize) -> Option<bool> {
        if row < self.n_rows() && column < self.n_columns() {
            Some(self.data[row * self.n_columns() + column])
        } else {
            None
        }
    }

    /// A new matrix holding only the rows at `indices`, in that order
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        let rows = indices.iter().map(|i| self.rows[*i].clone()).collect();
        let data = indices
            .iter()
            .flat_map(|i| self.row(*i).iter().copied())
            .collect();
        Self::new(rows, self.columns.clone(), data)
    }

    /// How many rows are `true` in each column
    pub fn column_counts(&self) -> Vec<usize> {
        let mut counts = vec![0; self.n_columns()];
        for i in 0..self.n_rows() {
            for (count, present) in counts.iter_mut().zip(self.row(i)) {
                *count += *present as usize;
            }
        }
        counts
    }

    /// The fraction of rows that are `true` in each column
    pub fn column_frequencies(&self) -> Vec<f64> {
        let n = self.n_rows();
        self.column_counts()
            .into_iter()
            .map(|c| if n > 0 { c as f64 / n as f64 } else { 0.0 })
            .collect()
    }

    /// A new matrix without the columns that are `false` in every row
    pub fn exclude_false_columns(&self) -> Self {
        let keep: Vec<usize> = self
            .column_counts()
            .into_iter()
            .enumerate()
            .filter(|(_, c)| *c > 0)
            .map(|(j, _)| j)
            .collect();
        let columns = keep.iter().map(|j| self.columns[*j].clone()).collect();
        let data = (0..self.n_rows())
            .flat_map(|i| {
                let row = self.row(i);
                keep.iter().map(move |j| row[*j])
            })
            .collect();
        Self::new(self.rows.clone(), columns, data)
    }
}

impl Index<(usize, usize)> for OneHotMatrix {
    type Output = bool;

    fn index(&self, (row, column): (usize, usize)) -> &Self::Output {
        &self.data[row * self.n_columns() + column]
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_pivot() {
        let samples = ["1", "2", "3", "4"];
        let bins = ["a", "a", "b", "c"];
        let mat = OneHotMatrix::pivot(samples.iter().copied().zip(bins.iter().copied()));
        assert_eq!(mat.column_labels(), ["a", "b", "c"]);
        assert_eq!(mat.row_labels(), ["1", "2", "3", "4"]);
        assert_eq!(mat.row(0), [true, false, false]);
        assert_eq!(mat.row(1), [true, false, false]);
        assert_eq!(mat.row(2), [false, true, false]);
        assert_eq!(mat.row(3), [false, false, true]);
    }

    #[test]
    fn test_pivot_collapses_duplicates() {
        let pairs = [("s2", "x"), ("s1", "x"), ("s1", "x"), ("s1", "y")];
        let mat = OneHotMatrix::pivot(pairs);
        assert_eq!(mat.row_labels(), ["s1", "s2"]);
        assert_eq!(mat.find_row("s2"), Some(1));
        assert_eq!(mat.find_row("s3"), None);
        assert!(mat[(0, 0)] && mat[(0, 1)]);
        assert_eq!(mat.get(1, 1), Some(false));
        assert_eq!(mat.get(2, 0), None);
        assert_eq!(mat.column_counts(), [2, 1]);
    }

    #[test]
    fn test_from_matched_rows() {
        let rows = vec![
            MatchedRow::new("c1".into(), "s1".into(), 10.0),
            MatchedRow::new("c2".into(), "s1".into(), 10.0),
            MatchedRow::new("c1".into(), "s1".into(), 20.0),
        ];
        let bins = vec!["b10".to_string(), "b10".to_string(), "b20".to_string()];
        let by_component = OneHotMatrix::from_matched_rows(&rows, &bins, SampleColumn::Component);
        assert_eq!(by_component.n_rows(), 2);
        assert_eq!(by_component.row(1), [true, false]);

        let by_spectrum = OneHotMatrix::from_matched_rows(&rows, &bins, SampleColumn::Spectrum);
        assert_eq!(by_spectrum.n_rows(), 1);
        assert_eq!(by_spectrum.row(0), [true, true]);
    }

    #[test]
    fn test_subsets() {
        let mat = OneHotMatrix::pivot([("a", "x"), ("b", "y"), ("c", "y"), ("c", "z")]);
        let sub = mat.select_rows(&[1, 2]);
        assert_eq!(sub.row_labels(), ["b", "c"]);
        assert_eq!(sub.column_frequencies(), [0.0, 1.0, 0.5]);

        let trimmed = sub.exclude_false_columns();
        assert_eq!(trimmed.column_labels(), ["y", "z"]);
        assert_eq!(trimmed.row(0), [true, false]);
        assert_eq!(trimmed.row(1), [true, true]);
    }
}
