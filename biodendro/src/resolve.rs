/*! Match each target component to its best supporting trigger spectrum and flatten
the matched fragments into long-form rows */
use std::ops::{Add, AddAssign};

use mzpeaks::Tolerance;
use tracing::debug;

use crate::index::SpectrumIndex;
use crate::spectrum::Component;

/// One fragment ion of the spectrum matched to a component
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MatchedRow {
    /// The component's identifier line
    pub component: String,
    /// The matched spectrum's [`Spectrum::key`](crate::spectrum::Spectrum::key)
    pub spectrum: String,
    /// The fragment m/z, or its neutral loss from the precursor
    pub mz: f64,
}

impl MatchedRow {
    pub fn new(component: String, spectrum: String, mz: f64) -> Self {
        Self {
            component,
            spectrum,
            mz,
        }
    }
}

/// Which identifier keys a sample in the presence matrix
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SampleColumn {
    #[default]
    Component,
    Spectrum,
}

impl SampleColumn {
    pub fn select<'a>(&self, row: &'a MatchedRow) -> &'a str {
        match self {
            Self::Component => &row.component,
            Self::Spectrum => &row.spectrum,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Component => "component",
            Self::Spectrum => "spectrum",
        }
    }
}

/// Counts of what happened while resolving components
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct MatchSummary {
    pub components: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub rows: usize,
}

impl Add for MatchSummary {
    type Output = MatchSummary;

    fn add(self, rhs: Self) -> Self::Output {
        let mut dup = self;
        dup += rhs;
        dup
    }
}

impl AddAssign for MatchSummary {
    fn add_assign(&mut self, rhs: Self) {
        self.components += rhs.components;
        self.matched += rhs.matched;
        self.unmatched += rhs.unmatched;
        self.rows += rhs.rows;
    }
}

pub fn neutral_loss(fragment_mz: f64, precursor_mz: f64) -> f64 {
    let delta = fragment_mz - precursor_mz;
    (delta * 1e5).round() / 1e5
}

/// Resolve every component against `index`, emitting one row per fragment ion of
/// its closest spectrum. Components without a spectrum inside both tolerance windows
/// contribute nothing.
///
/// The rows are stably sorted by ascending m/z.
pub fn resolve(
    components: &[Component],
    index: &SpectrumIndex,
    mz_tolerance: Tolerance,
    retention_tolerance: f64,
    use_neutral_loss: bool,
) -> (Vec<MatchedRow>, MatchSummary) {
    let mut rows = Vec::new();
    let mut summary = MatchSummary::default();
    for component in components {
        summary.components += 1;
        let Some(best) = index.closest(
            component.precursor_mz,
            component.retention,
            mz_tolerance,
            retention_tolerance,
        ) else {
            debug!("No spectrum matched component {component}");
            summary.unmatched += 1;
            continue;
        };
        summary.matched += 1;
        let key = best.key();
        let precursor_mz = best.precursor_mz();
        rows.extend(best.ions.iter().map(|ion| {
            let mz = if use_neutral_loss {
                neutral_loss(ion.mz, precursor_mz)
            } else {
                ion.mz
            };
            MatchedRow::new(component.label.clone(), key.clone(), mz)
        }));
    }
    rows.sort_by(|a, b| a.mz.total_cmp(&b.mz));
    summary.rows = rows.len();
    (rows, summary)
}
