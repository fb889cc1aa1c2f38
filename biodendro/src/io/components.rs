use std::io::prelude::*;

use super::ParseError;
use crate::spectrum::Component;

const HEADER_MARKER: &str = "Components";

/// Parse a component identifier like `C12_pos_QE_m/z102.0332_RT0.52`. The fourth
/// `_`-separated field carries the m/z and the fifth the retention time in minutes.
pub fn parse_component(label: &str, line_number: usize) -> Result<Component, ParseError> {
    let invalid = |reason| ParseError::InvalidComponent {
        line: line_number,
        text: label.to_string(),
        reason,
    };

    let fields: Vec<&str> = label.split('_').collect();
    if fields.len() < 5 {
        return Err(invalid("expected at least five '_'-separated fields"));
    }
    let mz: f64 = fields[3]
        .trim_start_matches(['m', '/', 'z'])
        .trim()
        .parse()
        .map_err(|_| invalid("the fourth field is not an m/z value"))?;
    let retention_minutes: f64 = fields[4]
        .trim_start_matches(['R', 'T'])
        .trim()
        .parse()
        .map_err(|_| invalid("the fifth field is not a retention time"))?;

    // Whole seconds, truncated toward zero
    let retention = (retention_minutes * 60.0).trunc();
    Ok(Component::new(mz, retention, label.to_string()))
}

/// Read one [`Component`] per line, skipping blank lines and any header line
/// containing `Components`
pub struct ComponentReader<R: BufRead> {
    handle: R,
    line_number: usize,
    buffer: String,
    failed: bool,
}

impl<R: BufRead> ComponentReader<R> {
    pub fn new(handle: R) -> Self {
        Self {
            handle,
            line_number: 0,
            buffer: String::new(),
            failed: false,
        }
    }

    pub fn read_next(&mut self) -> Result<Option<Component>, ParseError> {
        loop {
            self.buffer.clear();
            if self.handle.read_line(&mut self.buffer)? == 0 {
                return Ok(None);
            }
            self.line_number += 1;
            let label = self.buffer.trim_end_matches(&['\r', '\n'][..]);
            if label.trim().is_empty() || label.contains(HEADER_MARKER) {
                continue;
            }
            return parse_component(label, self.line_number).map(Some);
        }
    }
}

impl<R: BufRead> Iterator for ComponentReader<R> {
    type Item = Result<Component, ParseError>;

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

    #[test]
    fn test_parse_component() {
        let comp = parse_component("C12_pos_QE_m/z102.0332_RT0.52", 1).unwrap();
        assert_eq!(comp.precursor_mz, 102.0332);
        assert_eq!(comp.retention, 31.0);
        assert_eq!(comp.label, "C12_pos_QE_m/z102.0332_RT0.52");

        let comp = parse_component("a_b_c_m/z758.5715_RT4.9653_extra_fields", 1).unwrap();
        assert_eq!(comp.retention, 297.0);
    }

    #[test]
    fn test_parse_component_errors() {
        let err = parse_component("a_b_c_m/z100.0", 7).unwrap_err();
        assert!(matches!(err, ParseError::InvalidComponent { line: 7, .. }));

        let err = parse_component("a_b_c_mass_RT1.0", 2).unwrap_err();
        assert!(matches!(err, ParseError::InvalidComponent { line: 2, .. }));

        let err = parse_component("a_b_c_m/z100.0_time", 3).unwrap_err();
        assert!(matches!(err, ParseError::InvalidComponent { line: 3, .. }));
    }

    #[test]
    fn test_reader_skips_headers() {
        let text = "Components\r\nC1_pos_QE_m/z102.0332_RT0.01\r\n\r\nC2_pos_QE_m/z758.5715_RT4.9653\n";
        let comps: Vec<Component> = ComponentReader::new(io::Cursor::new(text))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(comps.len(), 2);
        assert_eq!(comps[0].label, "C1_pos_QE_m/z102.0332_RT0.01");
        assert_eq!(comps[0].retention, 0.0);
        assert_eq!(comps[1].precursor_mz, 758.5715);
    }
}
