use std::io::prelude::*;

use tracing::trace;

use super::ParseError;
use crate::spectrum::{Ion, Spectrum};

/// Split an ion line into its m/z and optional intensity. Any tokens after the
/// intensity are ignored.
fn parse_ion(text: &str) -> Option<Ion> {
    let mut tokens = text.split_whitespace();
    let mz = tokens.next()?.parse::<f64>().ok()?;
    let intensity = match tokens.next() {
        Some(token) => Some(token.parse::<f32>().ok()?),
        None => None,
    };
    Some(Ion::new(mz, intensity))
}

fn split_kv<'a>(line: &'a str, key: &str) -> Option<&'a str> {
    line.strip_prefix(key)?.strip_prefix('=').map(str::trim)
}

#[derive(Debug, Default)]
struct BlockBuilder {
    start: usize,
    title: Option<String>,
    retention: Option<f64>,
    precursor: Option<Ion>,
    charge: Option<String>,
    ions: Vec<Ion>,
}

impl BlockBuilder {
    fn new(start: usize) -> Self {
        Self {
            start,
            ..Default::default()
        }
    }

    fn consume_line(&mut self, line: &str, line_number: usize) -> Result<(), ParseError> {
        if let Some(value) = split_kv(line, "TITLE") {
            self.title = Some(value.to_string());
        } else if let Some(value) = split_kv(line, "PEPMASS") {
            self.precursor = Some(parse_ion(value).ok_or_else(|| ParseError::InvalidField {
                line: line_number,
                field: "PEPMASS",
                text: value.to_string(),
            })?);
        } else if let Some(value) = split_kv(line, "RTINSECONDS") {
            self.retention = Some(value.parse::<f64>().map_err(|_| ParseError::InvalidField {
                line: line_number,
                field: "RTINSECONDS",
                text: value.to_string(),
            })?);
        } else if let Some(value) = split_kv(line, "CHARGE") {
            self.charge = Some(value.to_string());
        } else if line.contains('=') {
            trace!("Skipping unhandled parameter line {line_number}: {line}");
        } else {
            let ion = parse_ion(line).ok_or_else(|| ParseError::InvalidIon {
                line: line_number,
                text: line.to_string(),
            })?;
            self.ions.push(ion);
        }
        Ok(())
    }

    fn build(self) -> Result<Spectrum, ParseError> {
        let precursor = self.precursor.ok_or(ParseError::MissingField {
            line: self.start,
            field: "PEPMASS",
        })?;
        let retention = self.retention.ok_or(ParseError::MissingField {
            line: self.start,
            field: "RTINSECONDS",
        })?;
        Ok(Spectrum::new(
            self.title.unwrap_or_default(),
            retention,
            precursor,
            self.charge,
            self.ions,
        ))
    }
}

/// Read [`Spectrum`] records from `BEGIN IONS`/`END IONS` blocks of an MGF stream.
///
/// Lines outside of a block are ignored, as are `key=value` lines other than
/// `TITLE`, `PEPMASS`, `RTINSECONDS` and `CHARGE`. Every other non-blank line
/// inside a block must be an ion line.
pub struct MGFReader<R: BufRead> {
    handle: R,
    line_number: usize,
    buffer: String,
    failed: bool,
}

impl<R: BufRead> MGFReader<R> {
    pub fn new(handle: R) -> Self {
        Self {
            handle,
            line_number: 0,
            buffer: String::new(),
            failed: false,
        }
    }

    /// Read the next complete block, or `None` once the stream is exhausted
    pub fn read_next(&mut self) -> Result<Option<Spectrum>, ParseError> {
        let mut block: Option<BlockBuilder> = None;
        loop {
            self.buffer.clear();
            if self.handle.read_line(&mut self.buffer)? == 0 {
                return match block {
                    Some(block) => Err(ParseError::UnterminatedBlock { line: block.start }),
                    None => Ok(None),
                };
            }
            self.line_number += 1;
            let line = self.buffer.trim();

            if line.starts_with("END") {
                match block.take() {
                    Some(block) => return block.build().map(Some),
                    None => continue,
                }
            } else if line.starts_with("BEGIN") {
                if let Some(block) = block {
                    return Err(ParseError::UnterminatedBlock { line: block.start });
                }
                block = Some(BlockBuilder::new(self.line_number));
            } else if let Some(block) = block.as_mut() {
                if !line.is_empty() {
                    block.consume_line(line, self.line_number)?;
                }
            }
        }
    }
}

impl<R: BufRead> Iterator for MGFReader<R> {
    type Item = Result<Spectrum, ParseError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }
        let result = self.read_next().transpose();
        if matches!(result, Some(Err(_))) {
            self.failed = true;
        }
        result
    }
}

#[cfg(test)]
mod test {
    use std::io;

    use super::*;

    const TWO_BLOCKS: &str = r#"MASS=Monoisotopic
BEGIN IONS
TITLE=File: "\Mac\Home\Desktop\TEMP\QE_2017_001814.raw"; SpectrumID: "2"; scans: "2"
PEPMASS=102.03323 33553618.00000
CHARGE=2+
RTINSECONDS=0
SCANS=2
56.96532 908954
58.06568 37828.7
60.04488 38341.2
END IONS

BEGIN IONS
TITLE=scan=986 profile data
RTINSECONDS=297.916
PEPMASS=758.571517944336 12066.720502853394
CHARGE=1+
37.05708507 1.0
38.08264425 1.0
42.1891818 1.0 40
END IONS
"#;

    fn read_all(text: &str) -> Result<Vec<Spectrum>, ParseError> {
        MGFReader::new(io::Cursor::new(text)).collect()
    }

    #[test]
    fn test_parse_ion() {
        assert_eq!(parse_ion("6.66 5.11"), Some(Ion::new(6.66, Some(5.11))));
        assert_eq!(parse_ion("2.22"), Some(Ion::new(2.22, None)));
        assert_eq!(parse_ion("2.22 3 40"), Some(Ion::new(2.22, Some(3.0))));
        assert_eq!(parse_ion("abc 1"), None);
        assert_eq!(parse_ion("1.0 abc"), None);
    }

    #[test]
    fn test_split_kv() {
        assert_eq!(
            split_kv("TITLE=This; is=some text", "TITLE"),
            Some("This; is=some text")
        );
        assert_eq!(split_kv("TITLES=x", "TITLE"), None);
    }

    #[test]
    fn test_read_blocks() {
        let spectra = read_all(TWO_BLOCKS).unwrap();
        assert_eq!(spectra.len(), 2);

        let first = &spectra[0];
        assert_eq!(first.short_title(), "QE_2017_001814");
        assert_eq!(first.retention, 0.0);
        assert_eq!(first.precursor, Ion::new(102.03323, Some(33553618.0)));
        assert_eq!(first.charge.as_deref(), Some("2+"));
        assert_eq!(first.ions.len(), 3);
        assert_eq!(first.ions[1], Ion::new(58.06568, Some(37828.7)));

        let second = &spectra[1];
        assert_eq!(second.title, "scan=986 profile data");
        assert_eq!(second.retention, 297.916);
        assert_eq!(second.precursor.mz, 758.571517944336);
        assert_eq!(second.ions[2], Ion::new(42.1891818, Some(1.0)));
    }

    #[test]
    fn test_stray_lines_outside_blocks() {
        let text = "END IONS\n1.0 2.0\nBEGIN IONS\nPEPMASS=10\nRTINSECONDS=5\nEND IONS\n";
        let spectra = read_all(text).unwrap();
        assert_eq!(spectra.len(), 1);
        assert_eq!(spectra[0].title, "");
        assert!(spectra[0].ions.is_empty());
    }

    #[test]
    fn test_errors() {
        let err = read_all("BEGIN IONS\nPEPMASS=10\nRTINSECONDS=5\n1.0 x\nEND IONS\n").unwrap_err();
        assert!(matches!(err, ParseError::InvalidIon { line: 4, .. }), "{err}");

        let err = read_all("BEGIN IONS\nRTINSECONDS=5\nEND IONS\n").unwrap_err();
        assert!(matches!(
            err,
            ParseError::MissingField {
                line: 1,
                field: "PEPMASS"
            }
        ));

        let err = read_all("BEGIN IONS\nPEPMASS=10\nRTINSECONDS=5\n").unwrap_err();
        assert!(matches!(err, ParseError::UnterminatedBlock { line: 1 }));

        let err = read_all("BEGIN IONS\nPEPMASS=10\nBEGIN IONS\n").unwrap_err();
        assert!(matches!(err, ParseError::UnterminatedBlock { line: 1 }));

        let err = read_all("BEGIN IONS\nPEPMASS=10\nRTINSECONDS=five\nEND IONS\n").unwrap_err();
        assert!(matches!(
            err,
            ParseError::InvalidField {
                field: "RTINSECONDS",
                ..
            }
        ));
    }
}
