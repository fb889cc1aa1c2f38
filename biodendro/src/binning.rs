/*! Gap-based one-dimensional binning of sorted fragment m/z values.

A new bin starts wherever two consecutive values differ by at least the bin
threshold. Each bin is named for the mean, minimum and maximum of its members.
*/
use std::ops::Range;

use itertools::Itertools;

/// Round to four decimal places, ties to even, the way the bin names expect
fn round4(value: f64) -> f64 {
    (value * 1e4).round_ties_even() / 1e4
}

/// The `mean_min_max` name of a bin, each value rounded to four decimals.
///
/// `values` must not be empty.
pub fn bin_name(values: &[f64]) -> String {
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            (lo.min(*v), hi.max(*v))
        });
    format!("{:.4}_{:.4}_{:.4}", round4(mean), round4(min), round4(max))
}

/// The index of the first value in each bin of `sorted_values`. The first index is
/// always a bin start. A gap exactly equal to `threshold` starts a new bin.
pub fn bin_starts(sorted_values: &[f64], threshold: f64) -> Vec<usize> {
    if sorted_values.is_empty() {
        return Vec::new();
    }
    let mut starts = vec![0];
    starts.extend(
        sorted_values
            .iter()
            .tuple_windows()
            .positions(|(prev, next)| next - prev >= threshold)
            .map(|i| i + 1),
    );
    starts
}

/// The half-open index ranges covered by each bin
pub fn bin_ranges(starts: &[usize], len: usize) -> Vec<Range<usize>> {
    starts
        .iter()
        .copied()
        .chain(Some(len))
        .tuple_windows()
        .map(|(start, end)| start..end)
        .collect()
}

/// Name every value in `sorted_values` after the bin it falls in
pub fn bin_labels(sorted_values: &[f64], starts: &[usize]) -> Vec<String> {
    let mut labels = Vec::with_capacity(sorted_values.len());
    for range in bin_ranges(starts, sorted_values.len()) {
        let name = bin_name(&sorted_values[range.clone()]);
        labels.extend(std::iter::repeat(name).take(range.len()));
    }
    labels
}

/// Compute bin starts and labels in one step
pub fn assign_bins(sorted_values: &[f64], threshold: f64) -> Vec<String> {
    let starts = bin_starts(sorted_values, threshold);
    bin_labels(sorted_values, &starts)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_bin_name() {
        assert_eq!(bin_name(&[3.0, 3.0, 3.0]), "3.0000_3.0000_3.0000");
        assert_eq!(
            bin_name(&[1.234, 2.345678, 3.456789]),
            "2.3455_1.2340_3.4568"
        );
        assert_eq!(bin_name(&[0.5]), "0.5000_0.5000_0.5000");
    }

    #[test]
    fn test_bin_starts() {
        assert_eq!(bin_starts(&[1.0, 3.0, 5.0, 7.0], 1.5), [0, 1, 2, 3]);
        assert_eq!(bin_starts(&[1.0, 3.0, 4.0, 7.0], 1.5), [0, 1, 3]);
        assert_eq!(bin_starts(&[1.0, 3.0, 4.5, 5.0], 1.5), [0, 1, 2]);
        assert_eq!(bin_starts(&[1.0, 3.0, 4.4999, 5.0], 1.5), [0, 1]);
        assert_eq!(bin_starts(&[2.0], 1.5), [0]);
        assert!(bin_starts(&[], 1.5).is_empty());
    }

    #[test]
    fn test_bin_labels() {
        let values = [1.0, 1.0004, 3.0, 5.0, 5.0006];
        let starts = bin_starts(&values, 8e-4);
        assert_eq!(starts, [0, 2, 3]);
        assert_eq!(bin_ranges(&starts, values.len()), [0..2, 2..3, 3..5]);
        let labels = bin_labels(&values, &starts);
        assert_eq!(
            labels,
            [
                "1.0002_1.0000_1.0004",
                "1.0002_1.0000_1.0004",
                "3.0000_3.0000_3.0000",
                "5.0003_5.0000_5.0006",
                "5.0003_5.0000_5.0006",
            ]
        );
        assert_eq!(assign_bins(&values, 8e-4), labels);
        assert!(assign_bins(&[], 8e-4).is_empty());
    }
}
