/*! A precursor m/z sorted collection of trigger spectra supporting windowed lookup */
use std::ops::{Index, Range};

use mzpeaks::{CoordinateLike, Tolerance, MZ};

use crate::spectrum::Spectrum;

/// Trigger spectra sorted by precursor m/z, with a parallel array of precursor
/// m/z values to binary search over. Both are built together and never mutated
/// afterwards.
#[derive(Debug, Default, Clone)]
pub struct SpectrumIndex {
    spectra: Vec<Spectrum>,
    mzs: Vec<f64>,
}

impl SpectrumIndex {
    pub fn new(mut spectra: Vec<Spectrum>) -> Self {
        spectra.sort_by(|a, b| {
            CoordinateLike::<MZ>::coordinate(&a.precursor)
                .total_cmp(&CoordinateLike::<MZ>::coordinate(&b.precursor))
        });
        let mzs = spectra.iter().map(|s| s.precursor_mz()).collect();
        Self { spectra, mzs }
    }

    pub fn len(&self) -> usize {
        self.spectra.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spectra.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Spectrum> {
        self.spectra.iter()
    }

    /// The index range of spectra whose precursor m/z lies in `[low, high)`
    pub fn between(&self, low: f64, high: f64) -> Range<usize> {
        let start = self.mzs.partition_point(|mz| *mz < low);
        let end = start
            + self.mzs[start..]
                .iter()
                .take_while(|mz| **mz < high)
                .count();
        start..end
    }

    /// Find the spectrum whose precursor lies within `mz_tolerance` of `mz` and whose
    /// retention time lies strictly within `retention_tolerance` of `retention`,
    /// preferring the smallest retention time difference.
    ///
    /// The m/z error plays no part in choosing between candidates. When two candidates
    /// are equally close in time, the one with the lower precursor m/z wins.
    pub fn closest(
        &self,
        mz: f64,
        retention: f64,
        mz_tolerance: Tolerance,
        retention_tolerance: f64,
    ) -> Option<&Spectrum> {
        let (low, high) = mz_tolerance.bounds(mz);
        let mut best: Option<(&Spectrum, f64)> = None;
        for spectrum in &self.spectra[self.between(low, high)] {
            let delta = (spectrum.retention - retention).abs();
            if delta >= retention_tolerance {
                continue;
            }
            match best {
                Some((_, best_delta)) if best_delta <= delta => {}
                _ => best = Some((spectrum, delta)),
            }
        }
        best.map(|(spectrum, _)| spectrum)
    }
}

impl Index<usize> for SpectrumIndex {
    type Output = Spectrum;

    fn index(&self, index: usize) -> &Self::Output {
        &self.spectra[index]
    }
}

impl FromIterator<Spectrum> for SpectrumIndex {
    fn from_iter<T: IntoIterator<Item = Spectrum>>(iter: T) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl From<Vec<Spectrum>> for SpectrumIndex {
    fn from(value: Vec<Spectrum>) -> Self {
        Self::new(value)
    }
}
