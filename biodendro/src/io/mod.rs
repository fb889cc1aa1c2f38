/*! Readers for the peak-list and component-list text formats */
use std::fs;
use std::io::{self, prelude::*};
use std::path::Path;

use flate2::bufread::MultiGzDecoder;
use thiserror::Error;

mod components;
mod mgf;

pub use components::ComponentReader;
pub use mgf::MGFReader;

use crate::spectrum::{Component, Spectrum};

/// An error raised while reading a peak-list or component-list file. Parsing
/// never recovers from these mid-stream.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Line {line}: could not parse an ion from {text:?}")]
    InvalidIon { line: usize, text: String },
    #[error("Line {line}: invalid {field} value {text:?}")]
    InvalidField {
        line: usize,
        field: &'static str,
        text: String,
    },
    #[error("The block starting on line {line} is missing the required {field} field")]
    MissingField { line: usize, field: &'static str },
    #[error("The block starting on line {line} is not terminated by an END line")]
    UnterminatedBlock { line: usize },
    #[error("Line {line}: malformed component {text:?}, {reason}")]
    InvalidComponent {
        line: usize,
        text: String,
        reason: &'static str,
    },
    #[error("An IO error occurred while reading: {0}")]
    IOError(
        #[source]
        #[from]
        io::Error,
    ),
}

/// Open a file for buffered reading, transparently decompressing it when the
/// path ends with `.gz`
pub fn open_path<P: AsRef<Path>>(path: P) -> io::Result<Box<dyn BufRead + Send>> {
    let path = path.as_ref();
    let handle = io::BufReader::new(fs::File::open(path)?);
    if path.extension().is_some_and(|ext| ext == "gz") {
        Ok(Box::new(io::BufReader::new(MultiGzDecoder::new(handle))))
    } else {
        Ok(Box::new(handle))
    }
}

/// Read every spectrum from an MGF file
pub fn read_mgf<P: AsRef<Path>>(path: P) -> Result<Vec<Spectrum>, ParseError> {
    MGFReader::new(open_path(path)?).collect()
}

/// Read every component from a component-list file
pub fn read_components<P: AsRef<Path>>(path: P) -> Result<Vec<Component>, ParseError> {
    ComponentReader::new(open_path(path)?).collect()
}
