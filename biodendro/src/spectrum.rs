/*! The peak-list data model: fragment ions, trigger spectra and target components */
use std::fmt::Display;

use mzpeaks::{CoordinateLike, IntensityMeasurement, MZ};

/// A single observed ion, either a fragment or a precursor. Intensity is optional
/// in peak-list files.
#[derive(Debug, Default, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Ion {
    pub mz: f64,
    pub intensity: Option<f32>,
}

impl Ion {
    pub fn new(mz: f64, intensity: Option<f32>) -> Self {
        Self { mz, intensity }
    }
}

impl CoordinateLike<MZ> for Ion {
    fn coordinate(&self) -> f64 {
        self.mz
    }
}

impl IntensityMeasurement for Ion {
    fn intensity(&self) -> f32 {
        self.intensity.unwrap_or_default()
    }
}

/// Format a float the way the spectrum keys expect: the shortest round-trip
/// representation, always carrying a fractional part.
pub fn format_float(value: f64) -> String {
    let text = value.to_string();
    if value.is_finite() && !text.contains('.') {
        format!("{text}.0")
    } else {
        text
    }
}

fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(i) if name[..i].chars().any(|c| c != '.') => &name[..i],
        _ => name,
    }
}

/// Reduce a raw MGF title like `File: "C:\data\run_01.raw"; SpectrumID: "2"`
/// to the bare file stem of its second space-separated token (`run_01`).
///
/// Titles with fewer than two tokens are returned unchanged.
pub fn shorten_title(title: &str) -> &str {
    match title.split(' ').nth(1) {
        Some(token) => {
            let file_name = token.rsplit(|c| c == '\\' || c == '/').next().unwrap_or(token);
            strip_extension(file_name)
        }
        None => title,
    }
}

/// A trigger spectrum read from a peak-list file
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Spectrum {
    /// The raw `TITLE` of the block
    pub title: String,
    /// The retention time in seconds
    pub retention: f64,
    /// The selected precursor ion
    pub precursor: Ion,
    pub charge: Option<String>,
    /// The fragment ions, in file order
    pub ions: Vec<Ion>,
}

impl Spectrum {
    pub fn new(
        title: String,
        retention: f64,
        precursor: Ion,
        charge: Option<String>,
        ions: Vec<Ion>,
    ) -> Self {
        Self {
            title,
            retention,
            precursor,
            charge,
            ions,
        }
    }

    pub fn precursor_mz(&self) -> f64 {
        self.precursor.coordinate()
    }

    pub fn short_title(&self) -> &str {
        shorten_title(&self.title)
    }

    /// The identifier used for this spectrum in matched rows,
    /// `{short_title}_{precursor m/z}_{retention}`
    pub fn key(&self) -> String {
        format!(
            "{}_{}_{}",
            self.short_title(),
            format_float(self.precursor.mz),
            format_float(self.retention)
        )
    }

    pub fn base_peak_intensity(&self) -> Option<f32> {
        self.ions
            .iter()
            .filter(|ion| ion.intensity.is_some())
            .map(|ion| ion.intensity())
            .reduce(f32::max)
    }

    /// Divide every fragment intensity by the most intense fragment's
    pub fn scaled(mut self) -> Self {
        if let Some(base) = self.base_peak_intensity().filter(|base| *base > 0.0) {
            for ion in self.ions.iter_mut() {
                if let Some(intensity) = ion.intensity.as_mut() {
                    *intensity /= base;
                }
            }
        }
        self
    }

    /// Drop every fragment with an intensity below `eps`. Fragments without an
    /// intensity are kept.
    pub fn filtered(mut self, eps: f32) -> Self {
        self.ions
            .retain(|ion| ion.intensity.map_or(true, |intensity| intensity >= eps));
        self
    }
}

impl Display for Spectrum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Spectrum({}, pepmass={}, retention={}, {} ions)",
            self.title,
            self.precursor.mz,
            self.retention,
            self.ions.len()
        )
    }
}

/// A target component to be matched against the trigger spectra
#[derive(Debug, Default, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Component {
    pub precursor_mz: f64,
    /// The retention time in seconds
    pub retention: f64,
    /// The identifier line this component was read from
    pub label: String,
}

impl Component {
    pub fn new(precursor_mz: f64, retention: f64, label: String) -> Self {
        Self {
            precursor_mz,
            retention,
            label,
        }
    }
}

impl Display for Component {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_shorten_title() {
        let title = r#"File: "\Mac\Home\Desktop\TEMP\QE_2017_001814.raw"; SpectrumID: "2"; scans: "2""#;
        assert_eq!(shorten_title(title), "QE_2017_001814");

        let title = "File: /data/runs/sample.a.mzML SpectrumID: 4";
        assert_eq!(shorten_title(title), "sample.a");

        assert_eq!(shorten_title("scan=986 profile data"), "profile");
        assert_eq!(shorten_title("untitled"), "untitled");
        assert_eq!(shorten_title("x .hidden"), ".hidden");
    }

    #[test]
    fn test_key() {
        let spec = Spectrum::new(
            "File: run_01.raw; x".into(),
            0.0,
            Ion::new(102.03323, Some(3.0)),
            None,
            Vec::new(),
        );
        assert_eq!(spec.key(), "run_01_102.03323_0.0");
        assert_eq!(format_float(297.916), "297.916");
        assert_eq!(format_float(120.0), "120.0");
    }

    #[test]
    fn test_scale_and_filter() {
        let spec = Spectrum::new(
            "".into(),
            10.0,
            Ion::new(300.0, None),
            Some("1+".into()),
            vec![
                Ion::new(50.0, Some(200.0)),
                Ion::new(60.0, Some(1.0)),
                Ion::new(70.0, None),
                Ion::new(80.0, Some(50.0)),
            ],
        );
        assert_eq!(spec.base_peak_intensity(), Some(200.0));

        let spec = spec.scaled();
        assert_eq!(spec.ions[0].intensity, Some(1.0));
        assert_eq!(spec.ions[3].intensity, Some(0.25));

        let spec = spec.filtered(0.01);
        let mzs: Vec<f64> = spec.ions.iter().map(|i| i.mz).collect();
        assert_eq!(mzs, vec![50.0, 70.0, 80.0]);
    }

    #[test]
    fn test_scale_without_intensities() {
        let spec = Spectrum::new(
            "".into(),
            10.0,
            Ion::new(300.0, None),
            None,
            vec![Ion::new(50.0, None)],
        );
        let scaled = spec.clone().scaled();
        assert_eq!(scaled, spec);
    }
}
